//! faasm-images build / build-all / push / pull コマンドハンドラ

use super::Orchestrator;
use colored::Colorize;
use faasm_images_core::BuildPlan;

pub async fn handle_build(
    orchestrator: &Orchestrator,
    containers: &[String],
    no_cache: bool,
    push: bool,
) -> anyhow::Result<()> {
    println!("{}", "Dockerイメージをビルド中...".green());
    println!();
    println!(
        "{}",
        format!("ビルド対象コンテナ ({} 個):", containers.len()).bold()
    );
    for name in containers {
        println!("  • {}", name.cyan());
    }
    println!();

    let plans = orchestrator.build(containers, no_cache, push).await?;
    print_summary(&plans, push);
    Ok(())
}

pub async fn handle_build_all(
    orchestrator: &Orchestrator,
    no_cache: bool,
    push: bool,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!(
            "全てのコンテナ ({} 個) をビルド中...",
            orchestrator.resolver().len()
        )
        .green()
    );
    println!();

    let plans = orchestrator.build_all(no_cache, push).await?;
    print_summary(&plans, push);
    Ok(())
}

fn print_summary(plans: &[BuildPlan], push: bool) {
    println!();
    if push {
        println!(
            "{}",
            "✓ すべてのイメージがビルド＆プッシュされました！"
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            "✓ すべてのイメージがビルドされました！".green().bold()
        );
    }

    println!();
    println!("{}", "結果サマリー:".bold());
    for plan in plans {
        println!("  {} {}: {}", "✓".green(), plan.container, plan.tag.cyan());
    }
}

pub async fn handle_push(orchestrator: &Orchestrator, containers: &[String]) -> anyhow::Result<()> {
    println!("{}", "📤 イメージをプッシュ中...".blue().bold());

    let tags = orchestrator.push(containers).await?;

    println!();
    for tag in &tags {
        println!("  {} {}", "✓".green(), tag.cyan());
    }
    Ok(())
}

pub async fn handle_pull(orchestrator: &Orchestrator, containers: &[String]) -> anyhow::Result<()> {
    println!("{}", "↓ イメージをプル中...".blue().bold());

    let tags = orchestrator.pull(containers).await?;

    println!();
    for tag in &tags {
        println!("  {} {}", "✓".green(), tag.cyan());
    }
    Ok(())
}
