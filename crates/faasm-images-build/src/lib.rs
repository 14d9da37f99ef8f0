//! Faasm container image lifecycle
//!
//! ビルドプランの実行（docker build / push / pull）、ローカルイメージの掃除、
//! Azure Container Registry の保持スイープを提供します。

pub mod acr;
pub mod command;
pub mod docker;
pub mod engine;
pub mod error;
pub mod orchestrator;

pub use acr::AcrRegistry;
pub use command::{CommandOutput, CommandSpec};
pub use docker::DockerEngine;
pub use engine::{ContainerEngine, LocalImage, RegistryClient};
pub use error::{LifecycleError, Result};
pub use orchestrator::{LifecycleOrchestrator, PruneReport, SweepReport};
