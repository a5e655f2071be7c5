use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ai_optimizer_common::Result;
use ai_optimizer_domain::{
    KnowledgeBase, Plan, ProfilerConfig, SessionSummary, SystemProfile, SystemSnapshot,
    UserProfiles,
};

use crate::validator::PlanValidator;

/// 会话结束后交给推理服务做自我反思的材料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReflection {
    pub profiles: UserProfiles,
    pub plan: Plan,
    pub summary: SessionSummary,
}

/// 外部推理服务。
///
/// 返回的一切内容都不可信：计划必须经过 [`PlanValidator`]，画像标签会被
/// [`UserProfiles::new`] 规范化。编排器不会重试这些调用。
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// 根据系统画像推断用户画像标签；可能为空
    async fn determine_profile(
        &self,
        profile: &SystemProfile,
        config: &ProfilerConfig,
    ) -> Result<Vec<String>>;

    /// 生成原始计划（线格式 JSON），空计划是合法结果
    async fn generate_plan(
        &self,
        snapshot: &SystemSnapshot,
        profiles: &UserProfiles,
        rules: &KnowledgeBase,
    ) -> Result<serde_json::Value>;

    async fn generate_report(
        &self,
        summary: &SessionSummary,
        plan: &Plan,
        profiles: &UserProfiles,
    ) -> Result<String>;

    async fn suggest_improvements(&self, reflection: &SessionReflection) -> Result<String>;
}

/// 按画像过滤规则、请求计划并校验
pub async fn request_plan(
    service: &dyn ReasoningService,
    kb: &KnowledgeBase,
    snapshot: &SystemSnapshot,
    profiles: &UserProfiles,
) -> Result<Plan> {
    let relevant = kb.relevant_to(profiles.as_slice());
    log::debug!(
        "requesting plan with {} of {} optimization rules",
        relevant.optimization_rules.len(),
        kb.optimization_rules.len()
    );
    let raw = service.generate_plan(snapshot, profiles, &relevant).await?;
    PlanValidator::new(kb, profiles).validate(&raw)
}
