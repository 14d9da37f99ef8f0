use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid container: {0}")]
    UnknownVariant(String),

    #[error("Invalid image tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Could not parse version: {value}")]
    VersionParse { value: String },

    #[error("Version provider failed: {0}")]
    VersionUnavailable(String),
}

impl CoreError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            CoreError::UnknownVariant(name) => {
                format!(
                    "コンテナ '{}' の Dockerfile が見つかりません\n\
                     \n\
                     `faasm-images list` で利用可能なコンテナを確認してください。",
                    name
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
