use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_optimizer_common::{AppConfig, Result};
use ai_optimizer_engine::HttpReasoningClient;
use ai_optimizer_executor::ProgressCb;
use ai_optimizer_pipeline::{BackgroundTaskRegistry, PipelineOrchestrator, SessionOutcome};

use super::permission::warn_if_not_elevated;
use super::{file_system, knowledge_base, reclaim_roots, system_facade};

pub async fn run_session(config: &AppConfig) -> Result<()> {
    warn_if_not_elevated();
    let kb = knowledge_base(config)?;
    let reasoning = Arc::new(HttpReasoningClient::new(&config.reasoning)?);
    let background = Arc::new(BackgroundTaskRegistry::new());

    let orchestrator = PipelineOrchestrator::new(
        system_facade(config),
        reasoning,
        kb,
        file_system(config),
        Arc::clone(&background),
    )
    .with_component_ttl(Duration::from_secs(config.component_cache_ttl_secs))
    .with_reclaim_roots(reclaim_roots(config, &[]));

    // Ctrl-C 只设置标志，编排器在阶段边界处检查
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping after the current stage");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let progress: ProgressCb = Arc::new(|percent: u8, message: &str| {
        eprintln!("[{:>3}%] {}", percent, message);
    });
    let is_cancelled = move || cancel.load(Ordering::SeqCst);
    let outcome = orchestrator.run(Some(progress), &is_cancelled).await;
    listener.abort();

    let drained = background.drain_all().await;
    for failure in &drained.failures {
        log::warn!("background task '{}' failed: {}", failure.name, failure.error);
    }

    match outcome? {
        SessionOutcome::Completed(report) => println!("{}", report),
        SessionOutcome::Cancelled => eprintln!("Optimization cancelled."),
    }
    Ok(())
}
