//! faasm-images purge / purge-acr / delete-old コマンドハンドラ

use super::Orchestrator;
use colored::Colorize;
use faasm_images_build::PruneReport;

pub async fn handle_purge(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    println!("{}", "タグのないイメージを削除中...".yellow());

    let report = orchestrator.purge_local_dangling().await?;
    print_prune_report(&report, "削除対象のイメージはありません");

    if !report.failed.is_empty() {
        anyhow::bail!("{} 個のイメージを削除できませんでした", report.failed.len());
    }
    Ok(())
}

pub async fn handle_delete_old(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    println!("{}", "古いバージョンのイメージを削除中...".yellow());

    let report = orchestrator.delete_old_local().await?;
    print_prune_report(&report, "古いイメージはありません");
    Ok(())
}

pub async fn handle_purge_acr(orchestrator: &Orchestrator, acr_name: &str) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "レジストリから古いタグを削除中:".yellow(),
        acr_name.cyan()
    );

    let report = orchestrator.purge_registry().await?;

    println!();
    for target in &report.deleted {
        println!("  {} {}", "✓".green(), target);
    }
    for target in &report.already_gone {
        println!("  {} {} (削除済み)", "-".dimmed(), target.dimmed());
    }
    for container in &report.skipped_containers {
        println!(
            "  {} {} (現在のバージョンが未プッシュのためスキップ)",
            "ℹ".blue(),
            container
        );
    }
    for (target, error) in &report.failed {
        eprintln!("  {} {}: {}", "✗".red().bold(), target, error);
    }

    println!();
    println!(
        "{} 削除 {} / 削除済み {} / 失敗 {}",
        "結果:".bold(),
        report.deleted.len(),
        report.already_gone.len(),
        report.failed.len()
    );

    if !report.failed.is_empty() {
        anyhow::bail!("{} 個のタグを削除できませんでした", report.failed.len());
    }
    Ok(())
}

fn print_prune_report(report: &PruneReport, empty_message: &str) {
    println!();
    if report.removed.is_empty() && report.failed.is_empty() {
        println!("  {}", empty_message.dimmed());
        return;
    }

    for image in &report.removed {
        println!("  {} {}", "✓".green(), image);
    }
    for (image, error) in &report.failed {
        eprintln!("  {} {}: {}", "✗".red().bold(), image, error);
    }
}
