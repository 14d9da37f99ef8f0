//! faasm-images list / version コマンドハンドラ

use colored::Colorize;
use faasm_images_config::Settings;
use faasm_images_core::{SgxMode, VariantResolver};
use std::path::Path;

/// faasm-images list — ビルド可能なコンテナの一覧
pub fn handle(resolver: &VariantResolver) {
    println!("{}", "Containers:".bold());
    for variant in resolver.variants() {
        let mode = match variant.sgx_mode {
            SgxMode::Disabled => variant.sgx_mode.to_string().dimmed(),
            SgxMode::Hardware => variant.sgx_mode.to_string().yellow(),
            SgxMode::Simulation => variant.sgx_mode.to_string().cyan(),
        };
        println!(
            "  {:<16} {:<24} {}",
            variant.name.green(),
            variant.dockerfile.display().to_string().dimmed(),
            mode
        );
    }
}

/// faasm-images version — ツールとプロジェクトのバージョン
pub fn handle_version(root: Option<&Path>) {
    println!("faasm-images {}", env!("CARGO_PKG_VERSION"));

    match Settings::load(root).and_then(|settings| settings.version_file().read()) {
        Ok(version) => println!("faasm {}", version.cyan()),
        Err(e) => tracing::debug!("Project version unavailable: {}", e),
    }
}
