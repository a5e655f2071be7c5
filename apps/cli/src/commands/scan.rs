use ai_optimizer_common::{AppConfig, OptimizerError, Result};
use ai_optimizer_scanner::CleanupEngine;

use super::{file_system, knowledge_base};

pub async fn scan(config: &AppConfig) -> Result<()> {
    let kb = knowledge_base(config)?;
    let engine = CleanupEngine::new(file_system(config), kb.cleanup_rules);
    let report = engine.find_junk().await;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| OptimizerError::Config(format!("cannot serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}
