//! 发送给推理服务的提示词
//!
//! 所有提示词都要求模型只返回 JSON（报告除外），便于 [`crate::llm`] 提取。

use ai_optimizer_domain::{
    ExecutionSummary, KnowledgeBase, Plan, ProfilerConfig, SessionSummary, SystemProfile,
    SystemSnapshot, UserProfiles,
};
use serde::Serialize;
use serde_json::json;

use crate::planner::SessionReflection;

pub const SYSTEM_PROMPT: &str = "You are a careful operating-system optimization assistant. \
Never suggest touching components required for boot, security, networking or updates.";

/// 字节数格式化为人类可读字符串（1024 进制）
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// 用户画像识别
pub fn profile_prompt(profile: &SystemProfile, config: &ProfilerConfig) -> String {
    format!(
        "Classify the user of this machine into one or more profiles.\n\
         Known profiles and their indicator keywords:\n{}\n\n\
         Filesystem marker definitions:\n{}\n\n\
         Collected system profile:\n{}\n\n\
         Answer with JSON only: {{\"profiles\": [\"ProfileName\", ...]}}. \
         If nothing matches, answer {{\"profiles\": [\"HomeUser\"]}}.",
        pretty(&config.app_keywords),
        pretty(&config.filesystem_markers),
        pretty(profile),
    )
}

/// 生成优化计划；`rules` 应已按画像过滤
pub fn plan_prompt(
    snapshot: &SystemSnapshot,
    profiles: &UserProfiles,
    rules: &KnowledgeBase,
) -> String {
    let junk: serde_json::Map<String, serde_json::Value> = snapshot
        .junk_files_report
        .categories
        .iter()
        .map(|(id, f)| {
            (
                id.clone(),
                json!({
                    "size": format_bytes(f.size),
                    "count": f.count,
                    "description": f.description,
                }),
            )
        })
        .collect();
    format!(
        "Active user profiles: {}\n\n\
         Optimization rules (safety \"critical\" must never be touched):\n{}\n\n\
         Cleanup categories:\n{}\n\n\
         Installed services and packaged apps:\n{}\n\n\
         Junk files found:\n{}\n\n\
         Produce an optimization plan as JSON only, in this exact shape:\n\
         {{\"action_plan\": [{{\"type\": \"service\"|\"packaged_app\", \"id\": \"...\", \
         \"action\": \"disable\"|\"set_manual\"|\"stop\"|\"remove\", \
         \"package_full_name\": null, \"reason\": \"...\", \"user_explanation\": \"...\"}}], \
         \"cleanup_plan\": {{\"<category_id>\": {{\"clean\": true|false}}}}}}\n\
         Only use component ids that appear in the lists above. \
         An empty plan is a valid answer.",
        profiles,
        pretty(&rules.optimization_rules),
        pretty(&rules.cleanup_rules),
        pretty(&snapshot.system_components),
        pretty(&junk),
    )
}

fn actions_digest(actions: &ExecutionSummary) -> String {
    let mut lines = Vec::new();
    for item in &actions.completed {
        lines.push(format!("- done: {:?} {} ({})", item.action, item.id, item.display_label()));
    }
    for failed in &actions.failed {
        lines.push(format!(
            "- failed: {:?} {} ({})",
            failed.item.action, failed.item.id, failed.error
        ));
    }
    for skipped in &actions.skipped {
        lines.push(format!(
            "- skipped: {:?} {} ({})",
            skipped.item.action, skipped.item.id, skipped.reason
        ));
    }
    if lines.is_empty() {
        "- no component changes".to_string()
    } else {
        lines.join("\n")
    }
}

/// 最终报告（纯文本，面向用户）
pub fn report_prompt(summary: &SessionSummary, plan: &Plan, profiles: &UserProfiles) -> String {
    format!(
        "Write a short, friendly report for the user about the optimization that just ran.\n\
         User profiles: {}\n\
         Services disabled: {}\n\
         Apps removed: {}\n\
         Component changes:\n{}\n\
         Disk space freed: {} in {} files, {} empty folders removed, {} errors.\n\
         Planned cleanup categories: {}\n\
         Answer in plain text, no JSON.",
        profiles,
        summary.actions.disabled_services(),
        summary.actions.removed_apps(),
        actions_digest(&summary.actions),
        format_bytes(summary.cleanup.cleaned_size_bytes),
        summary.cleanup.deleted_files_count,
        summary.cleanup.removed_dirs,
        summary.cleanup.errors,
        plan.categories_to_clean().collect::<Vec<_>>().join(", "),
    )
}

/// 会话结束后的自我反思
pub fn improvement_prompt(reflection: &SessionReflection) -> String {
    format!(
        "Review this optimization session and suggest improvements to the rules \
         or the plan for next time.\n\
         Profiles: {}\n\
         Approved plan:\n{}\n\
         Outcome:\n{}\n\
         Answer with a short bulleted list.",
        reflection.profiles,
        pretty(&reflection.plan),
        pretty(&reflection.summary),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_optimizer_domain::{ActionItem, ActionKind, CategoryFindings, ComponentType};

    #[test]
    fn format_bytes_uses_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn plan_prompt_lists_junk_and_profiles() {
        let mut snapshot = SystemSnapshot::default();
        snapshot.junk_files_report.categories.insert(
            "pip_cache".to_string(),
            CategoryFindings {
                category_id: "pip_cache".to_string(),
                size: 2048,
                count: 3,
                ..CategoryFindings::default()
            },
        );
        let prompt = plan_prompt(
            &snapshot,
            &UserProfiles::new(["Developer"]),
            &KnowledgeBase::default(),
        );
        assert!(prompt.contains("Developer"));
        assert!(prompt.contains("pip_cache"));
        assert!(prompt.contains("2.00 KB"));
    }

    #[test]
    fn report_prompt_summarises_outcome() {
        let mut summary = SessionSummary::default();
        summary
            .actions
            .completed
            .push(ActionItem::new(ComponentType::Service, "Fax", ActionKind::Disable));
        summary.cleanup.cleaned_size_bytes = 1024 * 1024;
        let prompt = report_prompt(&summary, &Plan::default(), &UserProfiles::default());
        assert!(prompt.contains("Services disabled: 1"));
        assert!(prompt.contains("1.00 MB"));
        assert!(prompt.contains("done: Disable Fax"));
    }
}
