use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "プロジェクトルートが見つかりません（{0} から上位に VERSION ファイルがありません）。\n\
        --root オプションまたは FAASM_IMAGES_ROOT 環境変数で指定できます"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("VERSION ファイルが見つかりません: {0}")]
    VersionFileNotFound(PathBuf),

    #[error("VERSION ファイルが空です: {0}")]
    EmptyVersion(PathBuf),

    #[error("設定ファイルの解析に失敗しました: {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
