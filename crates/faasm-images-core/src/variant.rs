//! コンテナバリアントの解決
//!
//! 論理コンテナ名は閉じたレジストリ（名前 → Dockerfile）のキーでなければなりません。
//! SGX モードは名前のサフィックスから導出されます。

use crate::error::{CoreError, Result};
use std::fmt;
use std::path::PathBuf;

pub const SGX_HW_SUFFIX: &str = "-sgx";
pub const SGX_SIM_SUFFIX: &str = "-sgx-sim";

/// Faasm のコンテナ一覧（順序は build-all の実行順）
pub const FAASM_CONTAINERS: &[(&str, &str)] = &[
    ("redis", "redis.dockerfile"),
    ("minio", "minio.dockerfile"),
    ("cpp-root", "cpp-root.dockerfile"),
    ("base", "base.dockerfile"),
    ("base-sgx", "base-sgx.dockerfile"),
    ("base-sgx-sim", "base-sgx.dockerfile"),
    ("upload", "upload.dockerfile"),
    ("worker", "worker.dockerfile"),
    ("worker-sgx", "worker.dockerfile"),
    ("worker-sgx-sim", "worker.dockerfile"),
    ("cli", "cli.dockerfile"),
    ("cli-sgx", "cli.dockerfile"),
    ("cli-sgx-sim", "cli.dockerfile"),
    ("sgx-aesmd", "sgx-aesmd.dockerfile"),
];

/// SGX のビルドモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SgxMode {
    Disabled,
    Hardware,
    Simulation,
}

impl SgxMode {
    /// コンテナ名からモードと親サフィックスを判定
    ///
    /// `-sgx-sim` は `-sgx` を含むため、長いサフィックスから順に確認する。
    pub fn classify(name: &str) -> (SgxMode, Option<&'static str>) {
        if name.ends_with(SGX_SIM_SUFFIX) {
            (SgxMode::Simulation, Some(SGX_SIM_SUFFIX))
        } else if name.ends_with(SGX_HW_SUFFIX) {
            (SgxMode::Hardware, Some(SGX_HW_SUFFIX))
        } else {
            (SgxMode::Disabled, None)
        }
    }

    /// `FAASM_SGX_MODE` ビルド引数の値
    pub fn as_build_arg(&self) -> &'static str {
        match self {
            SgxMode::Disabled => "Disabled",
            SgxMode::Hardware => "Hardware",
            SgxMode::Simulation => "Simulation",
        }
    }
}

impl fmt::Display for SgxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_build_arg())
    }
}

/// ビルド可能なイメージ 1 つ分の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerVariant {
    pub name: String,
    pub dockerfile: PathBuf,
    pub sgx_mode: SgxMode,
    pub sgx_parent_suffix: Option<&'static str>,
}

impl ContainerVariant {
    fn new(name: &str, dockerfile: PathBuf) -> Self {
        let (sgx_mode, sgx_parent_suffix) = SgxMode::classify(name);
        Self {
            name: name.to_string(),
            dockerfile,
            sgx_mode,
            sgx_parent_suffix,
        }
    }
}

/// 閉じたコンテナレジストリに対する名前解決
#[derive(Debug, Clone)]
pub struct VariantResolver {
    entries: Vec<(String, PathBuf)>,
}

impl VariantResolver {
    pub fn faasm() -> Self {
        Self::from_entries(FAASM_CONTAINERS.iter().copied())
    }

    /// 任意のエントリからレジストリを構築（後勝ちで重複を排除）
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut resolved: Vec<(String, PathBuf)> = Vec::new();
        for (name, dockerfile) in entries {
            match resolved.iter_mut().find(|(n, _)| n == name) {
                Some(existing) => existing.1 = PathBuf::from(dockerfile),
                None => resolved.push((name.to_string(), PathBuf::from(dockerfile))),
            }
        }
        Self { entries: resolved }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn resolve(&self, name: &str) -> Result<ContainerVariant> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, dockerfile)| ContainerVariant::new(n, dockerfile.clone()))
            .ok_or_else(|| CoreError::UnknownVariant(name.to_string()))
    }

    /// 全ての名前を事前検証する
    ///
    /// 最初に見つかった不正な名前でエラーを返す。
    pub fn validate_all<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            if !self.contains(name) {
                tracing::error!("Could not find dockerfile for container: {}", name);
                return Err(CoreError::UnknownVariant(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn variants(&self) -> impl Iterator<Item = ContainerVariant> + '_ {
        self.entries
            .iter()
            .map(|(n, dockerfile)| ContainerVariant::new(n, dockerfile.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
