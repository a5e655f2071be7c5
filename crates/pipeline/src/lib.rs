pub mod progress;
pub mod background;
pub mod profiler;
pub mod session;
pub mod orchestrator;

pub use progress::ProgressReporter;
pub use background::{BackgroundTaskRegistry, DrainReport, TaskFailure};
pub use profiler::collect_system_profile;
pub use session::OptimizationSession;
pub use orchestrator::{PipelineOrchestrator, SessionOutcome};
