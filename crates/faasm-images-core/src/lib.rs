//! Faasm container image core
//!
//! 論理コンテナ名からビルドレシピ（Dockerfile + ビルド引数）への解決、
//! SGX バリアントの判定、バージョンに基づくイメージ保持ポリシーを提供します。
//! このクレートは I/O を行いません。

pub mod error;
pub mod plan;
pub mod variant;
pub mod version;

pub use error::{CoreError, Result};
pub use plan::{BuildPlan, image_tag, split_tag, validate_tag};
pub use variant::{
    ContainerVariant, FAASM_CONTAINERS, SGX_HW_SUFFIX, SGX_SIM_SUFFIX, SgxMode, VariantResolver,
};
pub use version::{RetentionDecision, VersionGate, VersionProvider};
