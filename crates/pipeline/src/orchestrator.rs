//! 会话编排：按阶段串联画像、扫描、规划、执行与报告
//!
//! 每个阶段开始前检查取消标志；还原点失败时在任何修改之前中止。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ai_optimizer_common::{
    default_reclaim_roots, home_dir, OptimizerError, Result, DEFAULT_COMPONENT_CACHE_TTL_SECS,
};
use ai_optimizer_domain::{
    JunkReport, KnowledgeBase, Plan, SessionSummary, SystemSnapshot, UserProfiles,
};
use ai_optimizer_engine::{request_plan, ReasoningService, SessionReflection};
use ai_optimizer_executor::{ActionExecutor, ComponentCache, ProgressCb, SystemFacade};
use ai_optimizer_scanner::{CleanupEngine, FileSystem};

use crate::background::BackgroundTaskRegistry;
use crate::profiler::collect_system_profile;
use crate::progress::ProgressReporter;
use crate::session::OptimizationSession;

const RESTORE_POINT_DESCRIPTION: &str = "ai-optimizer session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(String),
    Cancelled,
}

pub struct PipelineOrchestrator {
    facade: Arc<dyn SystemFacade>,
    reasoning: Arc<dyn ReasoningService>,
    knowledge: Arc<KnowledgeBase>,
    fs: Arc<dyn FileSystem>,
    cleanup: CleanupEngine,
    executor: ActionExecutor,
    components: ComponentCache,
    background: Arc<BackgroundTaskRegistry>,
    reclaim_roots: Vec<PathBuf>,
    home: Option<PathBuf>,
}

fn cancelled_before(cancelled: &(dyn Fn() -> bool + Send + Sync), stage: &str) -> bool {
    if cancelled() {
        log::warn!("session cancelled before {}", stage);
        true
    } else {
        false
    }
}

fn stage_failed(stage: &'static str) -> impl FnOnce(OptimizerError) -> OptimizerError {
    move |e| {
        log::error!("stage '{}' failed: {}", stage, e);
        e
    }
}

impl PipelineOrchestrator {
    pub fn new(
        facade: Arc<dyn SystemFacade>,
        reasoning: Arc<dyn ReasoningService>,
        knowledge: KnowledgeBase,
        fs: Arc<dyn FileSystem>,
        background: Arc<BackgroundTaskRegistry>,
    ) -> Self {
        let cleanup = CleanupEngine::new(Arc::clone(&fs), knowledge.cleanup_rules.clone());
        Self {
            executor: ActionExecutor::new(Arc::clone(&facade)),
            facade,
            reasoning,
            knowledge: Arc::new(knowledge),
            fs,
            cleanup,
            components: ComponentCache::new(Duration::from_secs(DEFAULT_COMPONENT_CACHE_TTL_SECS)),
            background,
            reclaim_roots: default_reclaim_roots(),
            home: home_dir(),
        }
    }

    pub fn with_component_ttl(mut self, ttl: Duration) -> Self {
        self.components = ComponentCache::new(ttl);
        self
    }

    pub fn with_reclaim_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.reclaim_roots = roots;
        self
    }

    /// 文件系统标记相对于该目录查找；`None` 时跳过标记扫描
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn component_cache(&self) -> &ComponentCache {
        &self.components
    }

    pub async fn run(
        &self,
        progress: Option<ProgressCb>,
        cancelled: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<SessionOutcome> {
        let mut session = OptimizationSession::new();
        let outcome = self.run_session(&mut session, progress, cancelled).await;
        log::debug!("session ended at stage '{}'", session.stage());
        outcome
    }

    /// 与 [`run`](Self::run) 相同，但由调用方持有会话以便查看中间结果
    pub async fn run_session(
        &self,
        session: &mut OptimizationSession,
        progress: Option<ProgressCb>,
        cancelled: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<SessionOutcome> {
        let reporter = ProgressReporter::new(progress);

        // 1. 还原点
        if cancelled_before(cancelled, "restore point") {
            return Ok(SessionOutcome::Cancelled);
        }
        reporter.report(5, "Creating restore point");
        self.facade
            .create_restore_point(RESTORE_POINT_DESCRIPTION)
            .await
            .map_err(|e| match e {
                OptimizerError::RestorePoint(msg) => OptimizerError::RestorePoint(msg),
                other => OptimizerError::RestorePoint(other.to_string()),
            })
            .map_err(stage_failed("restore point"))?;
        reporter.report(10, "Restore point created");

        // 2. 画像
        if cancelled_before(cancelled, "profiling") {
            return Ok(SessionOutcome::Cancelled);
        }
        reporter.report(15, "Profiling the system");
        let profiler_config = &self.knowledge.user_profiler_config;
        let system_profile = collect_system_profile(
            self.facade.as_ref(),
            Arc::clone(&self.fs),
            profiler_config,
            self.home.clone(),
        )
        .await;
        let labels = self
            .reasoning
            .determine_profile(&system_profile, profiler_config)
            .await
            .map_err(stage_failed("profiling"))?;
        session.profiles = UserProfiles::new(labels);
        session.system_profile = Some(system_profile);
        reporter.report(25, &format!("Profile detected: {}", session.profiles));

        // 3. 组件与垃圾文件
        if cancelled_before(cancelled, "component scan") {
            return Ok(SessionOutcome::Cancelled);
        }
        reporter.report(30, "Collecting components and junk files");
        let (system_components, junk_files_report) = tokio::join!(
            self.components.get_or_scan(self.facade.as_ref()),
            self.cleanup.find_junk()
        );
        let snapshot = session.snapshot.insert(SystemSnapshot {
            system_components,
            junk_files_report,
        });

        // 4. 规划与校验
        if cancelled_before(cancelled, "planning") {
            return Ok(SessionOutcome::Cancelled);
        }
        reporter.report(55, "Building the optimization plan");
        let plan = request_plan(
            self.reasoning.as_ref(),
            &self.knowledge,
            snapshot,
            &session.profiles,
        )
        .await
        .map_err(stage_failed("planning"))?;
        let plan = session.plan.insert(plan);

        // 5. 执行
        if cancelled_before(cancelled, "execution") {
            return Ok(SessionOutcome::Cancelled);
        }
        let summary = if plan.has_work() {
            reporter.report(70, "Applying the plan");
            self.apply(plan, &snapshot.junk_files_report, &reporter).await?
        } else {
            log::info!("plan has nothing to apply");
            reporter.report(85, "Nothing to apply");
            SessionSummary::default()
        };
        let summary = session.summary.insert(summary);

        // 6. 报告
        if cancelled_before(cancelled, "report") {
            return Ok(SessionOutcome::Cancelled);
        }
        reporter.report(95, "Assembling the report");
        let report = self
            .reasoning
            .generate_report(summary, plan, &session.profiles)
            .await
            .map_err(stage_failed("report"))?;

        // 7. 自我反思，不等待
        let reflection = SessionReflection {
            profiles: session.profiles.clone(),
            plan: plan.clone(),
            summary: summary.clone(),
        };
        let reasoning = Arc::clone(&self.reasoning);
        self.background.spawn("self-reflection", async move {
            let suggestions = reasoning.suggest_improvements(&reflection).await?;
            log::info!("improvement suggestions:\n{}", suggestions.trim());
            Ok(())
        });

        session.report = Some(report.clone());
        reporter.report(100, "Done");
        Ok(SessionOutcome::Completed(report))
    }

    async fn apply(
        &self,
        plan: &Plan,
        junk: &JunkReport,
        reporter: &Arc<ProgressReporter>,
    ) -> Result<SessionSummary> {
        let callback = reporter.callback();
        let (actions, cleanup) = tokio::join!(
            self.executor.execute(&plan.action_plan, Some(&callback)),
            self.cleanup.perform_cleanup(junk, &plan.cleanup_plan)
        );
        let mut cleanup = cleanup.map_err(stage_failed("cleanup"))?;
        // 组件状态已变化
        if !actions.completed.is_empty() {
            self.components.invalidate().await;
        }

        reporter.report(90, "Removing empty directories");
        let reclaimed = self
            .cleanup
            .reclaim_empty_dirs(self.reclaim_roots.clone())
            .await
            .map_err(stage_failed("empty directory reclamation"))?;
        cleanup.merge(&reclaimed);

        Ok(SessionSummary { actions, cleanup })
    }
}
