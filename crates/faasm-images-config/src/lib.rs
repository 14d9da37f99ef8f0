pub mod error;

pub use error::*;

use faasm_images_core::{CoreError, VersionProvider};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_REGISTRY: &str = "faasm.azurecr.io";
pub const DEFAULT_ACR_NAME: &str = "faasm";
pub const DEFAULT_DOCKER_DIR: &str = "docker";

pub const VERSION_FILE: &str = "VERSION";
pub const PROJECT_CONFIG_FILE: &str = "faasm-images.yaml";

pub const ROOT_ENV: &str = "FAASM_IMAGES_ROOT";
pub const REGISTRY_ENV: &str = "FAASM_IMAGES_REGISTRY";
pub const ACR_NAME_ENV: &str = "FAASM_IMAGES_ACR_NAME";

/// 起動時に一度だけ構築される不変の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// ビルドコンテキスト兼 VERSION ファイルの置き場所
    pub project_root: PathBuf,
    /// イメージタグのプレフィックス（例: faasm.azurecr.io）
    pub registry: String,
    /// `az acr` に渡すレジストリ名
    pub acr_name: String,
    /// Dockerfile を置くディレクトリ（project_root からの相対）
    pub docker_dir: PathBuf,
}

/// 設定ファイルの内容（全キー省略可能）
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    registry: Option<String>,
    acr_name: Option<String>,
    docker_dir: Option<PathBuf>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Some(Self::default()));
        }

        let config = serde_yaml::from_str(&content).map_err(|source| ConfigError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config file: {}", path.display());
        Ok(Some(config))
    }

    /// `other` の値を優先してマージ
    fn merge(self, other: Self) -> Self {
        Self {
            registry: other.registry.or(self.registry),
            acr_name: other.acr_name.or(self.acr_name),
            docker_dir: other.docker_dir.or(self.docker_dir),
        }
    }
}

impl Settings {
    /// 設定をロード
    ///
    /// 優先順位（後勝ち）:
    /// 1. デフォルト値
    /// 2. ~/.config/faasm-images/config.yaml
    /// 3. {project_root}/faasm-images.yaml
    /// 4. 環境変数 FAASM_IMAGES_REGISTRY / FAASM_IMAGES_ACR_NAME
    pub fn load(root_override: Option<&Path>) -> Result<Self> {
        let global = global_config_path();
        Self::load_with(root_override, global.as_deref())
    }

    pub fn load_with(root_override: Option<&Path>, global_config: Option<&Path>) -> Result<Self> {
        let project_root = resolve_project_root(root_override)?;

        let mut file_config = FileConfig::default();
        if let Some(path) = global_config
            && let Some(global) = FileConfig::load(path)?
        {
            file_config = file_config.merge(global);
        }
        if let Some(project) = FileConfig::load(&project_root.join(PROJECT_CONFIG_FILE))? {
            file_config = file_config.merge(project);
        }

        let registry = env_non_empty(REGISTRY_ENV)
            .or(file_config.registry)
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        let acr_name = env_non_empty(ACR_NAME_ENV)
            .or(file_config.acr_name)
            .unwrap_or_else(|| DEFAULT_ACR_NAME.to_string());
        let docker_dir = file_config
            .docker_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCKER_DIR));

        Ok(Self {
            project_root,
            registry: registry.trim_end_matches('/').to_string(),
            acr_name,
            docker_dir,
        })
    }

    pub fn version_file(&self) -> VersionFile {
        VersionFile::new(self.project_root.join(VERSION_FILE))
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// ~/.config/faasm-images/config.yaml
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("faasm-images").join("config.yaml"))
}

/// プロジェクトルートを決定
///
/// 1. 明示的な指定（--root）
/// 2. 環境変数 FAASM_IMAGES_ROOT
/// 3. カレントディレクトリから上位に向かって VERSION ファイルを探す
pub fn resolve_project_root(root_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = root_override {
        return explicit_root(root.to_path_buf());
    }

    if let Some(root) = env_non_empty(ROOT_ENV) {
        return explicit_root(PathBuf::from(root));
    }

    find_project_root(&std::env::current_dir()?)
}

fn explicit_root(root: PathBuf) -> Result<PathBuf> {
    if root.join(VERSION_FILE).is_file() {
        Ok(root)
    } else {
        Err(ConfigError::VersionFileNotFound(root.join(VERSION_FILE)))
    }
}

pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(VERSION_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::ProjectRootNotFound(start.to_path_buf()))
}

/// VERSION ファイルからプロジェクトバージョンを読む
#[derive(Debug, Clone)]
pub struct VersionFile {
    path: PathBuf,
}

impl VersionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn read(&self) -> Result<String> {
        if !self.path.is_file() {
            return Err(ConfigError::VersionFileNotFound(self.path.clone()));
        }

        let version = std::fs::read_to_string(&self.path)?.trim().to_string();
        if version.is_empty() {
            return Err(ConfigError::EmptyVersion(self.path.clone()));
        }
        Ok(version)
    }
}

impl VersionProvider for VersionFile {
    fn current_version(&self) -> faasm_images_core::Result<String> {
        self.read()
            .map_err(|e| CoreError::VersionUnavailable(e.to_string()))
    }
}
