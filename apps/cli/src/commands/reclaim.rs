use ai_optimizer_common::{AppConfig, Result};
use ai_optimizer_scanner::CleanupEngine;

use super::{file_system, reclaim_roots};

pub async fn reclaim(config: &AppConfig, overrides: &[String]) -> Result<()> {
    let roots = reclaim_roots(config, overrides);
    for root in &roots {
        log::info!("reclaim root: {}", root.display());
    }
    let engine = CleanupEngine::new(file_system(config), Vec::new());
    let summary = engine.reclaim_empty_dirs(roots).await?;
    println!(
        "Removed {} empty directories ({} errors)",
        summary.removed_dirs, summary.errors
    );
    Ok(())
}
