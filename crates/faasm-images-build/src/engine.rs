//! External collaborators used by the orchestrator

use crate::error::Result;
use async_trait::async_trait;
use faasm_images_core::BuildPlan;

/// An image known to the local engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub id: String,
    pub tags: Vec<String>,
}

/// Local container engine (build, push, pull, list, remove)
///
/// Every method returns `CommandFailed` when the underlying call exits non-zero.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn build(&self, plan: &BuildPlan, no_cache: bool) -> Result<()>;

    async fn push(&self, tag: &str) -> Result<()>;

    async fn pull(&self, tag: &str) -> Result<()>;

    /// IDs of untagged images
    async fn list_dangling_images(&self) -> Result<Vec<String>>;

    async fn list_images(&self) -> Result<Vec<LocalImage>>;

    async fn remove_image(&self, id_or_tag: &str, force: bool) -> Result<()>;
}

/// Remote registry holding the pushed tags
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn list_tags(&self, container: &str) -> Result<Vec<String>>;

    async fn image_exists(&self, container: &str, tag: &str) -> Result<bool>;

    async fn delete_image(&self, container: &str, tag: &str) -> Result<()>;
}
