mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use faasm_images_build::{AcrRegistry, DockerEngine, LifecycleError, LifecycleOrchestrator};
use faasm_images_config::{ConfigError, Settings};
use faasm_images_core::{CoreError, VariantResolver};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faasm-images")]
#[command(about = "Faasm のコンテナイメージをビルド・プッシュ・掃除する", long_about = None)]
struct Cli {
    /// プロジェクトルート（VERSION ファイルのあるディレクトリ）
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 指定したコンテナイメージをビルド
    Build {
        /// コンテナ名（複数指定可）
        #[arg(short = 'c', long = "container", required = true)]
        containers: Vec<String>,
        /// キャッシュを使用しない
        #[arg(long = "no-cache", alias = "nocache")]
        no_cache: bool,
        /// ビルド後にレジストリにプッシュ
        #[arg(long)]
        push: bool,
    },
    /// 全てのコンテナイメージをビルド
    BuildAll {
        /// キャッシュを使用しない
        #[arg(long = "no-cache", alias = "nocache")]
        no_cache: bool,
        /// ビルド後にレジストリにプッシュ
        #[arg(long)]
        push: bool,
    },
    /// コンテナイメージをプッシュ
    Push {
        /// コンテナ名（複数指定可）
        #[arg(short = 'c', long = "container", required = true)]
        containers: Vec<String>,
    },
    /// コンテナイメージをプル
    Pull {
        /// コンテナ名（複数指定可）
        #[arg(short = 'c', long = "container", required = true)]
        containers: Vec<String>,
    },
    /// タグのない（dangling）ローカルイメージを削除
    Purge,
    /// レジストリから古いバージョンのタグを削除
    PurgeAcr,
    /// 現在のバージョンより古いローカルイメージを削除
    DeleteOld,
    /// ビルド可能なコンテナの一覧を表示
    List,
    /// バージョン情報を表示
    Version,
}

impl Commands {
    fn containers(&self) -> Option<&[String]> {
        match self {
            Commands::Build { containers, .. }
            | Commands::Push { containers }
            | Commands::Pull { containers } => Some(containers.as_slice()),
            _ => None,
        }
    }

    fn needs_docker_daemon(&self) -> bool {
        !matches!(self, Commands::PurgeAcr)
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!();
        eprintln!("{} {}", "✗".red().bold(), describe(&e));
        std::process::exit(1);
    }
}

fn describe(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<LifecycleError>() {
        e.user_message()
    } else if let Some(e) = error.downcast_ref::<CoreError>() {
        e.user_message()
    } else if let Some(e) = error.downcast_ref::<ConfigError>() {
        e.to_string()
    } else {
        format!("{:#}", error)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let resolver = VariantResolver::faasm();

    // 設定ファイル不要のコマンド
    match cli.command {
        Commands::List => {
            commands::list::handle(&resolver);
            return Ok(());
        }
        Commands::Version => {
            commands::list::handle_version(cli.root.as_deref());
            return Ok(());
        }
        _ => {}
    }

    let settings = Settings::load(cli.root.as_deref())?;

    // Docker に接続する前に名前を検証する
    if let Some(containers) = cli.command.containers() {
        resolver.validate_all(containers)?;
    }

    let engine = if cli.command.needs_docker_daemon() {
        println!("{}", "Dockerに接続中...".blue());
        DockerEngine::connect(settings.project_root.clone()).await?
    } else {
        DockerEngine::local(settings.project_root.clone())?
    };

    let orchestrator = LifecycleOrchestrator::new(
        resolver,
        settings.registry.clone(),
        settings.docker_dir.clone(),
        engine,
        AcrRegistry::new(settings.acr_name.clone()),
        settings.version_file(),
    );

    match cli.command {
        Commands::Build {
            containers,
            no_cache,
            push,
        } => {
            commands::images::handle_build(&orchestrator, &containers, no_cache, push).await?;
        }
        Commands::BuildAll { no_cache, push } => {
            commands::images::handle_build_all(&orchestrator, no_cache, push).await?;
        }
        Commands::Push { containers } => {
            commands::images::handle_push(&orchestrator, &containers).await?;
        }
        Commands::Pull { containers } => {
            commands::images::handle_pull(&orchestrator, &containers).await?;
        }
        Commands::Purge => {
            commands::prune::handle_purge(&orchestrator).await?;
        }
        Commands::PurgeAcr => {
            commands::prune::handle_purge_acr(&orchestrator, &settings.acr_name).await?;
        }
        Commands::DeleteOld => {
            commands::prune::handle_delete_old(&orchestrator).await?;
        }
        Commands::List | Commands::Version => {
            unreachable!("List and Version are handled before config loading");
        }
    }

    Ok(())
}
