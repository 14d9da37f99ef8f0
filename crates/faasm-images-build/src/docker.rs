//! Docker を使ったコンテナエンジン
//!
//! build / push / pull は docker CLI（BuildKit 有効）で実行し、出力をそのまま端末に流す。
//! イメージの一覧と削除は Docker API (bollard) を使う。

use crate::command::CommandSpec;
use crate::engine::{ContainerEngine, LocalImage};
use crate::error::{LifecycleError, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{ListImagesOptionsBuilder, RemoveImageOptionsBuilder};
use faasm_images_core::BuildPlan;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct DockerEngine {
    docker: Docker,
    project_root: PathBuf,
}

impl DockerEngine {
    pub fn new(docker: Docker, project_root: PathBuf) -> Self {
        Self {
            docker,
            project_root,
        }
    }

    /// ローカルの Docker デーモンに接続し、疎通を確認する
    pub async fn connect(project_root: PathBuf) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        docker.ping().await?;
        Ok(Self::new(docker, project_root))
    }

    /// 疎通確認を行わずに接続設定だけを作る（Docker を使わないコマンド向け）
    pub fn local(project_root: PathBuf) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::new(docker, project_root))
    }

    async fn run_streamed(&self, spec: CommandSpec, operation: &str, target: &str) -> Result<()> {
        tracing::info!("{}", spec);
        let code = spec.run_streamed().await?;
        if code == Some(0) {
            Ok(())
        } else {
            Err(LifecycleError::failed(operation, target, code, ""))
        }
    }
}

/// `docker build` コマンドを組み立てる
///
/// ビルド引数とレイヤーキャッシュの挙動を揃えるため BuildKit を有効にする。
pub fn build_command(plan: &BuildPlan, no_cache: bool, project_root: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new("docker")
        .env("DOCKER_BUILDKIT", "1")
        .current_dir(project_root)
        .arg("build")
        .arg_if(no_cache, "--no-cache")
        .arg("-t")
        .arg(plan.tag.as_str());

    for (key, value) in &plan.build_args {
        spec = spec.arg("--build-arg").arg(format!("{}={}", key, value));
    }

    spec.arg("-f").arg(plan.dockerfile.as_os_str()).arg(".")
}

fn tag_command(subcommand: &str, tag: &str, project_root: &Path) -> CommandSpec {
    CommandSpec::new("docker")
        .current_dir(project_root)
        .arg(subcommand)
        .arg(tag)
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn build(&self, plan: &BuildPlan, no_cache: bool) -> Result<()> {
        let spec = build_command(plan, no_cache, &self.project_root);
        self.run_streamed(spec, "docker build", &plan.tag).await
    }

    async fn push(&self, tag: &str) -> Result<()> {
        let spec = tag_command("push", tag, &self.project_root);
        self.run_streamed(spec, "docker push", tag).await
    }

    async fn pull(&self, tag: &str) -> Result<()> {
        let spec = tag_command("pull", tag, &self.project_root);
        self.run_streamed(spec, "docker pull", tag).await
    }

    async fn list_dangling_images(&self) -> Result<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("dangling", vec!["true"]);
        let options = ListImagesOptionsBuilder::default()
            .all(false)
            .filters(&filters)
            .build();

        let images = self.docker.list_images(Some(options)).await?;
        Ok(images.into_iter().map(|image| image.id).collect())
    }

    async fn list_images(&self) -> Result<Vec<LocalImage>> {
        let options = ListImagesOptionsBuilder::default().all(false).build();
        let images = self.docker.list_images(Some(options)).await?;

        Ok(images
            .into_iter()
            .map(|image| LocalImage {
                id: image.id,
                tags: image.repo_tags,
            })
            .collect())
    }

    async fn remove_image(&self, id_or_tag: &str, force: bool) -> Result<()> {
        let options = RemoveImageOptionsBuilder::default().force(force).build();

        match self
            .docker
            .remove_image(id_or_tag, Some(options), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            }) => Err(LifecycleError::failed(
                "docker rmi",
                id_or_tag,
                Some(i32::from(status_code)),
                message,
            )),
            Err(e) => Err(LifecycleError::DockerConnection(e)),
        }
    }
}
