//! ビルド・プッシュ・プル・削除の実行順序を管理する
//!
//! 名前を受け取る操作は、外部呼び出しの前に必ず全ての名前を検証する。
//! 各コンテナは入力順に 1 つずつ処理される。

use crate::engine::{ContainerEngine, RegistryClient};
use crate::error::Result;
use faasm_images_core::{
    BuildPlan, VariantResolver, VersionGate, VersionProvider, image_tag, split_tag, validate_tag,
};
use std::path::PathBuf;

/// ローカルイメージ削除の結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<String>,
    /// (イメージ, エラー内容)
    pub failed: Vec<(String, String)>,
}

/// レジストリ保持スイープの結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// 現在のバージョンが未公開のためスキップしたコンテナ
    pub skipped_containers: Vec<String>,
    pub deleted: Vec<String>,
    /// 削除直前に既に存在しなかったタグ
    pub already_gone: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct LifecycleOrchestrator<E, R, V> {
    resolver: VariantResolver,
    registry_host: String,
    docker_dir: PathBuf,
    engine: E,
    registry: R,
    versions: V,
}

impl<E, R, V> LifecycleOrchestrator<E, R, V>
where
    E: ContainerEngine,
    R: RegistryClient,
    V: VersionProvider,
{
    pub fn new(
        resolver: VariantResolver,
        registry_host: impl Into<String>,
        docker_dir: impl Into<PathBuf>,
        engine: E,
        registry: R,
        versions: V,
    ) -> Self {
        Self {
            resolver,
            registry_host: registry_host.into(),
            docker_dir: docker_dir.into(),
            engine,
            registry,
            versions,
        }
    }

    pub fn resolver(&self) -> &VariantResolver {
        &self.resolver
    }

    fn current_version(&self) -> Result<String> {
        let version = self.versions.current_version()?;
        tracing::debug!("Current project version: {}", version);
        Ok(version)
    }

    /// 入力順にビルドし、必要ならプッシュする
    ///
    /// 失敗した時点で残りのコンテナは処理しない。
    pub async fn build<S: AsRef<str>>(
        &self,
        names: &[S],
        no_cache: bool,
        push: bool,
    ) -> Result<Vec<BuildPlan>> {
        self.resolver.validate_all(names)?;
        let version = self.current_version()?;
        validate_tag(&version)?;

        let mut plans = Vec::with_capacity(names.len());
        for name in names {
            let variant = self.resolver.resolve(name.as_ref())?;
            let plan = BuildPlan::new(&variant, &self.registry_host, &version, &self.docker_dir)?;

            tracing::info!(
                "Building {} ({}, SGX {})",
                plan.tag,
                plan.dockerfile.display(),
                variant.sgx_mode
            );
            self.engine.build(&plan, no_cache).await?;

            if push {
                tracing::info!("Pushing {}", plan.tag);
                self.engine.push(&plan.tag).await?;
            }
            plans.push(plan);
        }

        Ok(plans)
    }

    /// 登録済みの全コンテナをビルド
    pub async fn build_all(&self, no_cache: bool, push: bool) -> Result<Vec<BuildPlan>> {
        let names: Vec<String> = self.resolver.names().map(String::from).collect();
        self.build(&names, no_cache, push).await
    }

    fn current_tags<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        self.resolver.validate_all(names)?;
        let version = self.current_version()?;
        validate_tag(&version)?;

        Ok(names
            .iter()
            .map(|name| image_tag(&self.registry_host, name.as_ref(), &version))
            .collect())
    }

    pub async fn push<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        let tags = self.current_tags(names)?;
        for tag in &tags {
            tracing::info!("Pushing {}", tag);
            self.engine.push(tag).await?;
        }
        Ok(tags)
    }

    pub async fn pull<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        let tags = self.current_tags(names)?;
        for tag in &tags {
            tracing::info!("Pulling {}", tag);
            self.engine.pull(tag).await?;
        }
        Ok(tags)
    }

    /// タグのない（dangling）イメージを削除
    ///
    /// 個々の削除失敗は記録して次のイメージに進む。
    pub async fn purge_local_dangling(&self) -> Result<PruneReport> {
        let mut report = PruneReport::default();

        for id in self.engine.list_dangling_images().await? {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }

            tracing::info!("Removing {}", id);
            match self.engine.remove_image(id, true).await {
                Ok(()) => report.removed.push(id.to_string()),
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", id, e);
                    report.failed.push((id.to_string(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// レジストリから古いタグを削除
    pub async fn purge_registry(&self) -> Result<SweepReport> {
        let current = self.current_version()?;
        let mut report = SweepReport::default();

        for container in self.resolver.names() {
            let tags = self.registry.list_tags(container).await?;

            // 最新バージョンでタグ付けされていないコンテナは滅多に再ビルドされないので触らない
            if !tags.iter().any(|t| VersionGate::is_current(t, &current)) {
                tracing::info!(
                    "Skipping {}: version {} has not been pushed",
                    container,
                    current
                );
                report.skipped_containers.push(container.to_string());
                continue;
            }

            for tag in VersionGate::sweep_candidates(&tags, &current) {
                let target = format!("{}:{}", container, tag);
                tracing::info!("Removing {}", target);

                // 同じハッシュを持つ別タグの削除で既に消えている場合がある
                match self.registry.image_exists(container, &tag).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::info!("Skipping {} as already deleted", target);
                        report.already_gone.push(target);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to look up {}: {}", target, e);
                        report.failed.push((target, e.to_string()));
                        continue;
                    }
                }

                match self.registry.delete_image(container, &tag).await {
                    Ok(()) => report.deleted.push(target),
                    Err(e) => {
                        tracing::warn!("Failed to delete {}: {}", target, e);
                        report.failed.push((target, e.to_string()));
                    }
                }
            }
        }

        Ok(report)
    }

    /// 現在のバージョンより古いローカルイメージを削除
    pub async fn delete_old_local(&self) -> Result<PruneReport> {
        let current = self.current_version()?;
        let prefix = format!("{}/", self.registry_host);
        let mut report = PruneReport::default();

        for image in self.engine.list_images().await? {
            for tag in &image.tags {
                if !tag.starts_with(&prefix) {
                    continue;
                }
                let Some((_, version)) = split_tag(tag) else {
                    continue;
                };

                if VersionGate::is_older(version, &current) {
                    tracing::info!("Removing old image: {}", tag);
                    self.engine.remove_image(tag, true).await?;
                    report.removed.push(tag.clone());
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalImage;
    use crate::error::LifecycleError;
    use async_trait::async_trait;
    use faasm_images_core::CoreError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Build(String, bool),
        Push(String),
        Pull(String),
        Remove(String),
    }

    #[derive(Default)]
    struct FakeEngine {
        calls: Mutex<Vec<Call>>,
        failing: HashSet<String>,
        dangling: Vec<String>,
        images: Vec<LocalImage>,
    }

    impl FakeEngine {
        fn failing(mut self, target: &str) -> Self {
            self.failing.insert(target.to_string());
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call, target: &str, operation: &str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.failing.contains(target) {
                Err(LifecycleError::failed(operation, target, Some(1), "boom"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        async fn build(&self, plan: &BuildPlan, no_cache: bool) -> Result<()> {
            self.record(
                Call::Build(plan.tag.clone(), no_cache),
                &plan.tag,
                "docker build",
            )
        }

        async fn push(&self, tag: &str) -> Result<()> {
            self.record(Call::Push(tag.to_string()), tag, "docker push")
        }

        async fn pull(&self, tag: &str) -> Result<()> {
            self.record(Call::Pull(tag.to_string()), tag, "docker pull")
        }

        async fn list_dangling_images(&self) -> Result<Vec<String>> {
            Ok(self.dangling.clone())
        }

        async fn list_images(&self) -> Result<Vec<LocalImage>> {
            Ok(self.images.clone())
        }

        async fn remove_image(&self, id_or_tag: &str, _force: bool) -> Result<()> {
            self.record(Call::Remove(id_or_tag.to_string()), id_or_tag, "docker rmi")
        }
    }

    /// タグ一覧と、実際に存在するエントリを別々に持つレジストリ
    #[derive(Default)]
    struct FakeRegistry {
        tags: HashMap<String, Vec<String>>,
        present: Mutex<HashSet<String>>,
        failing_deletes: HashSet<String>,
        failing_lookups: HashSet<String>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeRegistry {
        fn with_tags(mut self, container: &str, tags: &[&str]) -> Self {
            let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
            {
                let mut present = self.present.lock().unwrap();
                for tag in &tags {
                    present.insert(format!("{}:{}", container, tag));
                }
            }
            self.tags.insert(container.to_string(), tags);
            self
        }

        /// 別タグの削除で消えたエントリを模擬する
        fn already_removed(self, target: &str) -> Self {
            self.present.lock().unwrap().remove(target);
            self
        }

        fn failing_delete(mut self, target: &str) -> Self {
            self.failing_deletes.insert(target.to_string());
            self
        }

        fn failing_lookup(mut self, target: &str) -> Self {
            self.failing_lookups.insert(target.to_string());
            self
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn list_tags(&self, container: &str) -> Result<Vec<String>> {
            Ok(self.tags.get(container).cloned().unwrap_or_default())
        }

        async fn image_exists(&self, container: &str, tag: &str) -> Result<bool> {
            let target = format!("{}:{}", container, tag);
            if self.failing_lookups.contains(&target) {
                return Err(LifecycleError::failed(
                    "az acr repository show",
                    target,
                    Some(1),
                    "Please run 'az login' to setup account.",
                ));
            }
            Ok(self.present.lock().unwrap().contains(&target))
        }

        async fn delete_image(&self, container: &str, tag: &str) -> Result<()> {
            let target = format!("{}:{}", container, tag);
            if self.failing_deletes.contains(&target) {
                return Err(LifecycleError::failed(
                    "az acr repository delete",
                    target,
                    Some(1),
                    "denied",
                ));
            }
            self.present.lock().unwrap().remove(&target);
            self.deleted.lock().unwrap().push(target);
            Ok(())
        }
    }

    const REGISTRY: &str = "faasm.azurecr.io";

    fn orchestrator(
        engine: FakeEngine,
        registry: FakeRegistry,
        version: &'static str,
    ) -> LifecycleOrchestrator<FakeEngine, FakeRegistry, &'static str> {
        LifecycleOrchestrator::new(
            VariantResolver::faasm(),
            REGISTRY,
            "docker",
            engine,
            registry,
            version,
        )
    }

    fn small_orchestrator(
        registry: FakeRegistry,
        version: &'static str,
    ) -> LifecycleOrchestrator<FakeEngine, FakeRegistry, &'static str> {
        LifecycleOrchestrator::new(
            VariantResolver::from_entries([
                ("worker", "worker.dockerfile"),
                ("cli", "cli.dockerfile"),
            ]),
            REGISTRY,
            "docker",
            FakeEngine::default(),
            registry,
            version,
        )
    }

    fn tag(name: &str, version: &str) -> String {
        format!("{}/{}:{}", REGISTRY, name, version)
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_before_any_call() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        let err = orch
            .build(&["worker", "worker-gpu", "cli"], false, true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Core(CoreError::UnknownVariant(ref name)) if name == "worker-gpu"
        ));
        assert!(orch.engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_twice_same_tag() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        let first = orch.build(&["worker"], false, false).await.unwrap();
        let second = orch.build(&["worker"], false, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].tag, tag("worker", "0.9.5"));
        assert_eq!(
            orch.engine.calls(),
            vec![
                Call::Build(tag("worker", "0.9.5"), false),
                Call::Build(tag("worker", "0.9.5"), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_with_push_in_input_order() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        let plans = orch.build(&["cli-sgx", "worker"], true, true).await.unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(
            plans[0].build_args.get("FAASM_SGX_PARENT_SUFFIX").map(String::as_str),
            Some("-sgx")
        );
        assert_eq!(
            orch.engine.calls(),
            vec![
                Call::Build(tag("cli-sgx", "0.9.5"), true),
                Call::Push(tag("cli-sgx", "0.9.5")),
                Call::Build(tag("worker", "0.9.5"), true),
                Call::Push(tag("worker", "0.9.5")),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_failure_aborts_remaining() {
        let engine = FakeEngine::default().failing(&tag("worker", "0.9.5"));
        let orch = orchestrator(engine, FakeRegistry::default(), "0.9.5");

        let err = orch
            .build(&["worker", "cli"], false, true)
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::CommandFailed { .. }));
        assert_eq!(
            orch.engine.calls(),
            vec![Call::Build(tag("worker", "0.9.5"), false)]
        );
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_version() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9 dev");

        let err = orch.build(&["worker"], false, false).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Core(CoreError::InvalidTag { .. })
        ));
        assert!(orch.engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_all_uses_registry_order() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        let plans = orch.build_all(false, false).await.unwrap();
        let built: Vec<&str> = plans.iter().map(|p| p.container.as_str()).collect();
        let registered: Vec<&str> = orch.resolver().names().collect();

        assert_eq!(built, registered);
        assert_eq!(orch.engine.calls().len(), registered.len());
    }

    #[tokio::test]
    async fn test_push_and_pull() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        let pushed = orch.push(&["worker", "cli-sgx-sim"]).await.unwrap();
        let pulled = orch.pull(&["worker"]).await.unwrap();

        assert_eq!(
            pushed,
            vec![tag("worker", "0.9.5"), tag("cli-sgx-sim", "0.9.5")]
        );
        assert_eq!(pulled, vec![tag("worker", "0.9.5")]);
        assert_eq!(
            orch.engine.calls(),
            vec![
                Call::Push(tag("worker", "0.9.5")),
                Call::Push(tag("cli-sgx-sim", "0.9.5")),
                Call::Pull(tag("worker", "0.9.5")),
            ]
        );
    }

    #[tokio::test]
    async fn test_pull_unknown_makes_no_calls() {
        let orch = orchestrator(FakeEngine::default(), FakeRegistry::default(), "0.9.5");

        assert!(orch.pull(&["worker", "nope"]).await.is_err());
        assert!(orch.engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_purge_dangling_continues_after_failure() {
        let engine = FakeEngine {
            dangling: vec![
                "sha256:aaa".to_string(),
                "sha256:bbb".to_string(),
                " ".to_string(),
                "sha256:ccc".to_string(),
            ],
            ..Default::default()
        }
        .failing("sha256:bbb");
        let orch = orchestrator(engine, FakeRegistry::default(), "0.9.5");

        let report = orch.purge_local_dangling().await.unwrap();

        assert_eq!(report.removed, vec!["sha256:aaa", "sha256:ccc"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "sha256:bbb");
        assert_eq!(orch.engine.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_purge_registry_deletes_old_tags() {
        let registry = FakeRegistry::default()
            .with_tags("worker", &["0.1.0", "0.2.0", "0.3.0"])
            .with_tags("cli", &["0.1.0", "0.2.0"]);
        let orch = small_orchestrator(registry, "0.3.0");

        let report = orch.purge_registry().await.unwrap();

        assert_eq!(report.deleted, vec!["worker:0.1.0", "worker:0.2.0"]);
        assert_eq!(report.skipped_containers, vec!["cli"]);
        assert!(report.failed.is_empty());
        assert_eq!(orch.registry.deleted(), vec!["worker:0.1.0", "worker:0.2.0"]);
    }

    #[tokio::test]
    async fn test_purge_registry_skips_when_current_unpublished() {
        let registry = FakeRegistry::default().with_tags("worker", &["0.1.0", "0.2.0", "0.3.0"]);
        let orch = small_orchestrator(registry, "0.4.0");

        let report = orch.purge_registry().await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.skipped_containers, vec!["worker", "cli"]);
        assert!(orch.registry.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_purge_registry_already_deleted_tag() {
        let registry = FakeRegistry::default()
            .with_tags("worker", &["0.1.0", "0.2.0", "0.3.0"])
            .already_removed("worker:0.1.0");
        let orch = small_orchestrator(registry, "0.3.0");

        let report = orch.purge_registry().await.unwrap();

        assert_eq!(report.already_gone, vec!["worker:0.1.0"]);
        assert_eq!(report.deleted, vec!["worker:0.2.0"]);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_purge_registry_delete_failure_isolated() {
        let registry = FakeRegistry::default()
            .with_tags("worker", &["0.1.0", "0.2.0", "0.3.0"])
            .with_tags("cli", &["0.2.0", "0.3.0"])
            .failing_delete("worker:0.1.0");
        let orch = small_orchestrator(registry, "0.3.0");

        let report = orch.purge_registry().await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "worker:0.1.0");
        assert_eq!(report.deleted, vec!["worker:0.2.0", "cli:0.2.0"]);
    }

    #[tokio::test]
    async fn test_purge_registry_lookup_failure_isolated() {
        let registry = FakeRegistry::default()
            .with_tags("worker", &["0.1.0", "0.2.0", "0.3.0"])
            .with_tags("cli", &["0.2.0", "0.3.0"])
            .failing_lookup("worker:0.1.0");
        let orch = small_orchestrator(registry, "0.3.0");

        let report = orch.purge_registry().await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "worker:0.1.0");
        assert!(report.already_gone.is_empty());
        assert_eq!(report.deleted, vec!["worker:0.2.0", "cli:0.2.0"]);
        assert!(!orch.registry.deleted().contains(&"worker:0.1.0".to_string()));
    }

    #[tokio::test]
    async fn test_purge_registry_keeps_non_version_tags() {
        let registry = FakeRegistry::default().with_tags("worker", &["latest", "0.2.0", "0.3.0"]);
        let orch = small_orchestrator(registry, "0.3.0");

        let report = orch.purge_registry().await.unwrap();

        assert_eq!(report.deleted, vec!["worker:0.2.0"]);
    }

    #[tokio::test]
    async fn test_delete_old_semantic_comparison() {
        let engine = FakeEngine {
            images: vec![
                LocalImage {
                    id: "sha256:old".to_string(),
                    tags: vec![tag("worker", "0.9.0"), tag("cli", "0.9.0")],
                },
                LocalImage {
                    id: "sha256:current".to_string(),
                    tags: vec![tag("worker", "0.10.0")],
                },
                LocalImage {
                    id: "sha256:other".to_string(),
                    tags: vec![
                        "docker.io/library/redis:0.1.0".to_string(),
                        tag("worker", "latest"),
                        "<none>:<none>".to_string(),
                    ],
                },
            ],
            ..Default::default()
        };
        let orch = orchestrator(engine, FakeRegistry::default(), "0.10.0");

        let report = orch.delete_old_local().await.unwrap();

        assert_eq!(
            report.removed,
            vec![tag("worker", "0.9.0"), tag("cli", "0.9.0")]
        );
        assert_eq!(
            orch.engine.calls(),
            vec![
                Call::Remove(tag("worker", "0.9.0")),
                Call::Remove(tag("cli", "0.9.0")),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_old_removal_failure_is_fatal() {
        let engine = FakeEngine {
            images: vec![LocalImage {
                id: "sha256:old".to_string(),
                tags: vec![tag("worker", "0.8.0"), tag("cli", "0.8.0")],
            }],
            ..Default::default()
        }
        .failing(&tag("worker", "0.8.0"));
        let orch = orchestrator(engine, FakeRegistry::default(), "0.9.0");

        assert!(orch.delete_old_local().await.is_err());
        assert_eq!(
            orch.engine.calls(),
            vec![Call::Remove(tag("worker", "0.8.0"))]
        );
    }
}
