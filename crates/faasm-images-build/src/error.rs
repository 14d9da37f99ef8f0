use faasm_images_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{operation} failed for {target} (exit code {code:?}): {stderr}")]
    CommandFailed {
        operation: String,
        target: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Unexpected registry response: {0}")]
    RegistryResponse(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LifecycleError {
    pub(crate) fn failed(
        operation: impl Into<String>,
        target: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        LifecycleError::CommandFailed {
            operation: operation.into(),
            target: target.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::Core(e) => e.user_message(),
            LifecycleError::CommandFailed {
                operation, target, ..
            } if operation.starts_with("docker push") || operation.starts_with("docker pull") => {
                format!(
                    "{}\n\
                     \n\
                     解決方法:\n\
                     1. `docker login` または `az acr login` でレジストリにログインしてください\n\
                     2. タグ {} が存在するか確認してください",
                    self, target
                )
            }
            LifecycleError::DockerConnection(_) => {
                format!(
                    "{}\n\
                     \n\
                     解決方法:\n\
                     • Dockerが起動しているか確認してください\n\
                     • docker ps コマンドが正常に動作するか確認してください",
                    self
                )
            }
            LifecycleError::CommandSpawn { program, .. } => {
                format!(
                    "{}\n\
                     \n\
                     {} がインストールされ、PATH に含まれているか確認してください。",
                    self, program
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
