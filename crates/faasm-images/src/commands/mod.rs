pub mod images;
pub mod list;
pub mod prune;

use faasm_images_build::{AcrRegistry, DockerEngine, LifecycleOrchestrator};
use faasm_images_config::VersionFile;

pub type Orchestrator = LifecycleOrchestrator<DockerEngine, AcrRegistry, VersionFile>;
