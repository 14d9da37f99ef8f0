use crate::error::{CoreError, Result};
use crate::variant::{ContainerVariant, SgxMode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ARG_VERSION: &str = "FAASM_VERSION";
pub const ARG_SGX_MODE: &str = "FAASM_SGX_MODE";
pub const ARG_SGX_PARENT_SUFFIX: &str = "FAASM_SGX_PARENT_SUFFIX";

/// 1 回のビルド呼び出しに必要な情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub container: String,
    pub dockerfile: PathBuf,
    pub tag: String,
    pub build_args: BTreeMap<String, String>,
}

impl BuildPlan {
    /// バリアントと現在のバージョンからビルドプランを作成
    ///
    /// `docker_dir` はプロジェクトルートからの相対パス（通常は `docker`）
    pub fn new(
        variant: &ContainerVariant,
        registry: &str,
        version: &str,
        docker_dir: &Path,
    ) -> Result<Self> {
        validate_tag(version)?;

        let mut build_args = BTreeMap::new();
        build_args.insert(ARG_VERSION.to_string(), version.to_string());
        build_args.insert(
            ARG_SGX_MODE.to_string(),
            variant.sgx_mode.as_build_arg().to_string(),
        );
        if variant.sgx_mode != SgxMode::Disabled
            && let Some(suffix) = variant.sgx_parent_suffix
        {
            build_args.insert(ARG_SGX_PARENT_SUFFIX.to_string(), suffix.to_string());
        }

        Ok(Self {
            container: variant.name.clone(),
            dockerfile: docker_dir.join(&variant.dockerfile),
            tag: image_tag(registry, &variant.name, version),
            build_args,
        })
    }
}

/// `{registry}/{name}:{version}` 形式のタグ
pub fn image_tag(registry: &str, name: &str, version: &str) -> String {
    format!("{}/{}:{}", registry, name, version)
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(CoreError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(CoreError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(CoreError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(CoreError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// イメージ参照からタグ部分を取り出す
///
/// レジストリのポート番号（`localhost:5000/app`）はタグとして扱わない。
pub fn split_tag(image: &str) -> Option<(&str, &str)> {
    let pos = image.rfind(':')?;
    let (repo, tag) = (&image[..pos], &image[pos + 1..]);
    if tag.contains('/') {
        return None;
    }
    Some((repo, tag))
}
