//! Azure Container Registry client
//!
//! Wraps the `az acr repository` commands. Authentication is expected to be
//! set up beforehand (`az login` / `az acr login`).

use crate::command::{CommandOutput, CommandSpec};
use crate::engine::RegistryClient;
use crate::error::{LifecycleError, Result};
use async_trait::async_trait;

/// az CLI wrapper for one registry
pub struct AcrRegistry {
    name: String,
}

impl AcrRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn repository(&self, subcommand: &str) -> CommandSpec {
        CommandSpec::new("az")
            .args(["acr", "repository", subcommand, "--name"])
            .arg(self.name.as_str())
    }

    pub fn show_tags_command(&self, container: &str) -> CommandSpec {
        self.repository("show-tags")
            .arg("--repository")
            .arg(container)
            .args(["--output", "json"])
    }

    pub fn show_command(&self, container: &str, tag: &str) -> CommandSpec {
        self.repository("show")
            .arg("--image")
            .arg(format!("{}:{}", container, tag))
    }

    pub fn delete_command(&self, container: &str, tag: &str) -> CommandSpec {
        self.repository("delete")
            .arg("--image")
            .arg(format!("{}:{}", container, tag))
            .arg("--yes")
    }
}

/// `show-tags` の JSON 出力を解析
///
/// リポジトリ自体が存在しない場合は空のリストとして扱う。
pub fn parse_tags(output: &CommandOutput, container: &str) -> Result<Vec<String>> {
    if !output.success() {
        if is_not_found(&output.stderr) {
            tracing::debug!("Repository {} not found in registry", container);
            return Ok(Vec::new());
        }
        return Err(LifecycleError::failed(
            "az acr repository show-tags",
            container,
            output.code,
            output.stderr.trim(),
        ));
    }

    let stdout = output.stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(stdout)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(tag) => Ok(tag),
                other => Err(LifecycleError::RegistryResponse(format!(
                    "expected tag string for {}, got {}",
                    container, other
                ))),
            })
            .collect(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(LifecycleError::RegistryResponse(format!(
            "expected tag list for {}, got {}",
            container, other
        ))),
    }
}

/// `show` の結果からイメージの有無を判定
///
/// 存在しないと分かる場合だけ `false`。認証やネットワークの失敗はエラーにする。
pub fn parse_exists(output: &CommandOutput, target: &str) -> Result<bool> {
    if output.success() {
        return Ok(true);
    }
    if is_not_found(&output.stderr) {
        return Ok(false);
    }
    Err(LifecycleError::failed(
        "az acr repository show",
        target,
        output.code,
        output.stderr.trim(),
    ))
}

fn is_not_found(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("not found")
        || lower.contains("name_unknown")
        || lower.contains("manifest_unknown")
}

#[async_trait]
impl RegistryClient for AcrRegistry {
    async fn list_tags(&self, container: &str) -> Result<Vec<String>> {
        let output = self.show_tags_command(container).run_captured().await?;
        parse_tags(&output, container)
    }

    async fn image_exists(&self, container: &str, tag: &str) -> Result<bool> {
        let output = self.show_command(container, tag).run_captured().await?;
        parse_exists(&output, &format!("{}:{}", container, tag))
    }

    async fn delete_image(&self, container: &str, tag: &str) -> Result<()> {
        let target = format!("{}:{}", container, tag);
        self.delete_command(container, tag)
            .run_captured()
            .await?
            .check("az acr repository delete", &target)?;
        Ok(())
    }
}
