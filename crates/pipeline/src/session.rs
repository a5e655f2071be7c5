use ai_optimizer_domain::{Plan, SessionSummary, SystemProfile, SystemSnapshot, UserProfiles};

/// 一次优化运行的全部中间结果，随阶段推进逐步填充
#[derive(Debug, Clone, Default)]
pub struct OptimizationSession {
    pub system_profile: Option<SystemProfile>,
    pub profiles: UserProfiles,
    pub snapshot: Option<SystemSnapshot>,
    pub plan: Option<Plan>,
    pub summary: Option<SessionSummary>,
    pub report: Option<String>,
}

impl OptimizationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已完成到哪个阶段，用于日志
    pub fn stage(&self) -> &'static str {
        if self.report.is_some() {
            "reported"
        } else if self.summary.is_some() {
            "applied"
        } else if self.plan.is_some() {
            "planned"
        } else if self.snapshot.is_some() {
            "scanned"
        } else if self.system_profile.is_some() {
            "profiled"
        } else {
            "started"
        }
    }
}
