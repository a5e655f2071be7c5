//! 计划校验器：外部生成的计划与宿主上破坏性操作之间唯一的信任边界。
//!
//! 内容层面的问题从不报错，只剔除不安全的条目并记录原因；只有整体结构不符合
//! 线格式（不是含 `action_plan`/`cleanup_plan` 的对象）时返回
//! [`OptimizerError::MalformedPlan`]。

use std::collections::{BTreeMap, HashMap, HashSet};

use ai_optimizer_common::{OptimizerError, Result};
use ai_optimizer_domain::{
    ActionItem, CleanupDecision, KnowledgeBase, Plan, SafetyLevel, UserProfiles,
};
use serde_json::{Map, Value};

/// 一次校验所用的安全规则，由静态规则库与当前画像推导
#[derive(Debug, Clone)]
pub struct SafetyRuleSet {
    critical: HashSet<String>,
    profile_relevant: HashSet<String>,
    cleanup_safety: HashMap<String, SafetyLevel>,
    sensitive_profile_active: bool,
}

impl SafetyRuleSet {
    pub fn derive(kb: &KnowledgeBase, profiles: &UserProfiles) -> Self {
        let active = profiles.as_slice();
        let critical = kb
            .optimization_rules
            .iter()
            .filter(|r| r.is_critical())
            .map(|r| r.id.to_lowercase())
            .collect();
        let profile_relevant = kb
            .optimization_rules
            .iter()
            .filter(|r| r.is_relevant_to(active))
            .map(|r| r.id.to_lowercase())
            .collect();
        let cleanup_safety = kb
            .cleanup_rules
            .iter()
            .map(|r| (r.category_id.clone(), r.safety))
            .collect();
        let sensitive_profile_active = active.iter().any(|p| kb.sensitive_profiles.contains(p));
        Self {
            critical,
            profile_relevant,
            cleanup_safety,
            sensitive_profile_active,
        }
    }

    pub fn is_critical(&self, id: &str) -> bool {
        self.critical.contains(&id.to_lowercase())
    }

    pub fn is_profile_relevant(&self, id: &str) -> bool {
        self.profile_relevant.contains(&id.to_lowercase())
    }

    /// id 或包引用命中关键组件
    pub fn is_critical_item(&self, item: &ActionItem) -> bool {
        targets(item).any(|name| self.is_critical(name))
    }

    pub fn is_profile_relevant_item(&self, item: &ActionItem) -> bool {
        targets(item).any(|name| self.is_profile_relevant(name))
    }
}

/// 条目实际作用到的名称：id 本身，以及包引用中可能出现的组件名。
/// `Name_1.0_x64__hash` 取 `_` 之前的部分，`app/org.Name/x86_64/stable` 取每一段。
fn targets(item: &ActionItem) -> impl Iterator<Item = &str> {
    let package = item.package_ref.as_deref().into_iter().flat_map(|p| {
        let base = p.split('_').next().unwrap_or(p);
        std::iter::once(p).chain(std::iter::once(base)).chain(p.split('/'))
    });
    std::iter::once(item.id.as_str()).chain(package)
}

pub struct PlanValidator {
    rules: SafetyRuleSet,
    profiles: UserProfiles,
}

impl PlanValidator {
    pub fn new(kb: &KnowledgeBase, profiles: &UserProfiles) -> Self {
        Self {
            rules: SafetyRuleSet::derive(kb, profiles),
            profiles: profiles.clone(),
        }
    }

    pub fn rules(&self) -> &SafetyRuleSet {
        &self.rules
    }

    /// 把任意输入收敛为可安全执行的计划
    pub fn validate(&self, raw: &Value) -> Result<Plan> {
        let Some(obj) = raw.as_object() else {
            return Err(OptimizerError::MalformedPlan(format!(
                "plan must be an object, got {}",
                json_kind(raw)
            )));
        };
        let actions = match obj.get("action_plan") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(OptimizerError::MalformedPlan(format!(
                    "'action_plan' must be an array, got {}",
                    json_kind(other)
                )))
            }
            None => {
                return Err(OptimizerError::MalformedPlan(
                    "missing 'action_plan'".to_string(),
                ))
            }
        };
        let cleanup = match obj.get("cleanup_plan") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(OptimizerError::MalformedPlan(format!(
                    "'cleanup_plan' must be an object, got {}",
                    json_kind(other)
                )))
            }
            None => {
                return Err(OptimizerError::MalformedPlan(
                    "missing 'cleanup_plan'".to_string(),
                ))
            }
        };

        let plan = Plan {
            action_plan: self.validate_actions(actions),
            cleanup_plan: self.validate_cleanup(cleanup),
        };
        log::info!(
            "plan validated: {} actions approved, {} cleanup categories approved",
            plan.action_plan.len(),
            plan.categories_to_clean().count()
        );
        Ok(plan)
    }

    fn validate_actions(&self, actions: &[Value]) -> Vec<ActionItem> {
        let mut safe = Vec::with_capacity(actions.len());
        for raw in actions {
            let Some(item) = parse_action(raw) else {
                log::warn!("skipping malformed action: {}", raw);
                continue;
            };
            if self.rules.is_critical_item(&item) {
                log::warn!(
                    "REJECTED {:?} on critical component '{}'",
                    item.action,
                    item.id
                );
                continue;
            }
            if item.action.is_destructive() && self.rules.is_profile_relevant_item(&item) {
                log::warn!(
                    "REJECTED {:?} on '{}': relevant to profiles [{}]",
                    item.action,
                    item.id,
                    self.profiles
                );
                continue;
            }
            safe.push(item);
        }
        safe
    }

    fn validate_cleanup(&self, cleanup: &Map<String, Value>) -> BTreeMap<String, CleanupDecision> {
        let mut safe = BTreeMap::new();
        for (category_id, raw) in cleanup {
            let Some(clean) = raw.get("clean").and_then(Value::as_bool) else {
                log::warn!("skipping malformed cleanup decision for '{}': {}", category_id, raw);
                continue;
            };
            if !clean {
                safe.insert(category_id.clone(), CleanupDecision::KEEP);
                continue;
            }
            let Some(safety) = self.rules.cleanup_safety.get(category_id) else {
                log::warn!("REJECTED cleanup of unknown category '{}'", category_id);
                continue;
            };
            if *safety == SafetyLevel::Low && self.rules.sensitive_profile_active {
                log::warn!(
                    "REJECTED cleanup of low-safety category '{}' for profiles [{}]",
                    category_id,
                    self.profiles
                );
                safe.insert(category_id.clone(), CleanupDecision::KEEP);
            } else {
                safe.insert(category_id.clone(), CleanupDecision::CLEAN);
            }
        }
        safe
    }
}

fn parse_action(raw: &Value) -> Option<ActionItem> {
    let obj = raw.as_object()?;
    for key in ["type", "id", "action"] {
        if obj.get(key).map_or(true, Value::is_null) {
            return None;
        }
    }
    let mut item: ActionItem = serde_json::from_value(raw.clone()).ok()?;
    item.id = item.id.trim().to_string();
    item.package_ref = item
        .package_ref
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if !is_plain_name(&item.id) || !item.package_ref.as_deref().map_or(true, is_plain_name) {
        return None;
    }
    Some(item)
}

/// 组件名会被拼进宿主命令：不能为空，不能像命令行选项，不能含控制字符或引号
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '\'' | '"' | '`' | '\u{2018}'..='\u{201F}'))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_optimizer_domain::{ActionKind, CleanupCategory, ComponentType, OptimizationRule};
    use serde_json::json;

    fn kb() -> KnowledgeBase {
        let rule = |id: &str, safety, profiles: &[&str]| OptimizationRule {
            id: id.to_string(),
            component_type: None,
            safety,
            relevant_profiles: profiles.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
        };
        let cat = |id: &str, safety| CleanupCategory {
            category_id: id.to_string(),
            paths: vec![],
            age_threshold_days: None,
            safety,
            description: String::new(),
        };
        KnowledgeBase {
            optimization_rules: vec![
                rule("CriticalSvc", SafetyLevel::Critical, &[]),
                rule("docker", SafetyLevel::Medium, &["Developer"]),
                rule("XblGameSave", SafetyLevel::Medium, &["Gamer"]),
            ],
            cleanup_rules: vec![
                cat("pip_cache", SafetyLevel::Low),
                cat("temp_files", SafetyLevel::High),
            ],
            ..KnowledgeBase::default()
        }
    }

    fn validator(profiles: &[&str]) -> PlanValidator {
        PlanValidator::new(&kb(), &UserProfiles::new(profiles.iter().copied()))
    }

    #[test]
    fn structurally_invalid_plans_are_errors() {
        let v = validator(&["HomeUser"]);
        for raw in [
            json!([]),
            json!("plan"),
            json!({"action_plan": []}),
            json!({"cleanup_plan": {}}),
            json!({"action_plan": {}, "cleanup_plan": {}}),
            json!({"action_plan": [], "cleanup_plan": []}),
        ] {
            let err = v.validate(&raw).unwrap_err();
            assert!(matches!(err, OptimizerError::MalformedPlan(_)), "{raw}");
        }
    }

    #[test]
    fn critical_ids_are_rejected_case_insensitively() {
        let plan = validator(&["HomeUser"])
            .validate(&json!({
                "action_plan": [
                    {"type": "service", "id": "criticalsvc", "action": "stop"},
                    {"type": "service", "id": "CRITICALSVC", "action": "set_manual"},
                    {"type": "service", "id": "Fax", "action": "disable"}
                ],
                "cleanup_plan": {}
            }))
            .unwrap();
        let ids: Vec<_> = plan.action_plan.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["Fax"]);
    }

    #[test]
    fn profile_relevant_ids_only_block_destructive_actions() {
        let plan = validator(&["Developer"])
            .validate(&json!({
                "action_plan": [
                    {"type": "service", "id": "Docker", "action": "disable"},
                    {"type": "packaged_app", "id": "docker", "action": "remove"},
                    {"type": "service", "id": "docker", "action": "set_manual"},
                    {"type": "service", "id": "XblGameSave", "action": "disable"}
                ],
                "cleanup_plan": {}
            }))
            .unwrap();
        let kept: Vec<_> = plan.action_plan.iter().map(|a| (a.id.as_str(), a.action)).collect();
        assert_eq!(
            kept,
            vec![("docker", ActionKind::SetManual), ("XblGameSave", ActionKind::Disable)]
        );
    }

    #[test]
    fn incomplete_items_are_dropped_silently() {
        let plan = validator(&["HomeUser"])
            .validate(&json!({
                "action_plan": [
                    {"type": "service", "id": "Fax"},
                    {"id": "Fax", "action": "disable"},
                    {"type": "service", "action": "disable"},
                    {"type": "service", "id": null, "action": "disable"},
                    {"type": "driver", "id": "Fax", "action": "disable"},
                    {"type": "service", "id": "  ", "action": "disable"},
                    "not an object",
                    {"type": "uwp_app", "id": "Microsoft.BingNews", "action": "remove",
                     "package_full_name": "Microsoft.BingNews_4.2_x64"}
                ],
                "cleanup_plan": {}
            }))
            .unwrap();
        assert_eq!(plan.action_plan.len(), 1);
        assert_eq!(plan.action_plan[0].component_type, ComponentType::PackagedApp);
    }

    #[test]
    fn padded_ids_and_package_refs_cannot_hide_critical_components() {
        let plan = validator(&["Developer"])
            .validate(&json!({
                "action_plan": [
                    {"type": "service", "id": "  CriticalSvc ", "action": "stop"},
                    {"type": "packaged_app", "id": " criticalsvc\t", "action": "remove"},
                    {"type": "packaged_app", "id": "Harmless", "action": "remove",
                     "package_full_name": "CriticalSvc_1.0.0.0_x64__8wekyb3d8bbwe"},
                    {"type": "packaged_app", "id": "Harmless", "action": "remove",
                     "package_full_name": "app/CriticalSvc/x86_64/stable"},
                    {"type": "packaged_app", "id": "Harmless", "action": "remove",
                     "package_full_name": "app/Docker/x86_64/stable"},
                    {"type": "packaged_app", "id": " Candy ", "action": "remove",
                     "package_full_name": " King.Candy_1.0_x64 "}
                ],
                "cleanup_plan": {}
            }))
            .unwrap();
        assert_eq!(plan.action_plan.len(), 1);
        assert_eq!(plan.action_plan[0].id, "Candy");
        assert_eq!(plan.action_plan[0].package_ref.as_deref(), Some("King.Candy_1.0_x64"));
    }

    #[test]
    fn option_like_and_quoted_names_are_dropped() {
        let plan = validator(&["HomeUser"])
            .validate(&json!({
                "action_plan": [
                    {"type": "packaged_app", "id": "--all", "action": "remove"},
                    {"type": "service", "id": "x'; Remove-Item -Recurse $env:USERPROFILE; '",
                     "action": "stop"},
                    {"type": "service", "id": "x\u{2019}; calc; \u{2019}", "action": "stop"},
                    {"type": "service", "id": "Fax\nrm", "action": "stop"},
                    {"type": "packaged_app", "id": "Candy", "action": "remove",
                     "package_full_name": "-y"},
                    {"type": "service", "id": "Fax", "action": "stop"}
                ],
                "cleanup_plan": {}
            }))
            .unwrap();
        let ids: Vec<_> = plan.action_plan.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["Fax"]);
    }

    #[test]
    fn cleanup_decisions_follow_rules_and_profiles() {
        let raw = json!({
            "action_plan": [],
            "cleanup_plan": {
                "pip_cache": {"clean": true},
                "temp_files": {"clean": true},
                "unknown_stuff": {"clean": true},
                "unknown_but_kept": {"clean": false},
                "broken": {"wipe": true}
            }
        });

        let dev = validator(&["Developer"]).validate(&raw).unwrap();
        assert_eq!(dev.cleanup_plan["pip_cache"], CleanupDecision::KEEP);
        assert_eq!(dev.cleanup_plan["temp_files"], CleanupDecision::CLEAN);
        assert_eq!(dev.cleanup_plan["unknown_but_kept"], CleanupDecision::KEEP);
        assert!(!dev.cleanup_plan.contains_key("unknown_stuff"));
        assert!(!dev.cleanup_plan.contains_key("broken"));

        let home = validator(&["HomeUser"]).validate(&raw).unwrap();
        assert_eq!(home.cleanup_plan["pip_cache"], CleanupDecision::CLEAN);
    }

    #[test]
    fn validation_is_idempotent() {
        let v = validator(&["Developer", "Gamer"]);
        let raw = json!({
            "action_plan": [
                {"type": "service", "id": "CriticalSvc", "action": "disable"},
                {"type": "service", "id": "docker", "action": "disable"},
                {"type": "service", "id": "docker", "action": "stop", "reason": "idle"},
                {"type": "packaged_app", "id": "Solitaire", "action": "remove",
                 "user_explanation_ru": "game"},
                {"type": "service", "id": "XblGameSave", "action": "remove"}
            ],
            "cleanup_plan": {
                "pip_cache": {"clean": true},
                "temp_files": {"clean": true},
                "mystery": {"clean": true}
            }
        });
        let once = v.validate(&raw).unwrap();
        let twice = v.validate(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.action_plan.len(), 2);
    }

    #[test]
    fn output_never_contains_critical_ids() {
        let v = validator(&["HomeUser"]);
        let actions = ["disable", "set_manual", "stop", "remove"];
        let types = ["service", "packaged_app"];
        let ids = ["CriticalSvc", "criticalSVC", "Fax", "docker"];
        let mut items = Vec::new();
        for t in types {
            for a in actions {
                for id in ids {
                    items.push(json!({"type": t, "id": id, "action": a}));
                }
            }
        }
        let plan = v
            .validate(&json!({"action_plan": items, "cleanup_plan": {}}))
            .unwrap();
        assert!(!plan.action_plan.is_empty());
        assert!(plan.action_plan.iter().all(|a| !v.rules().is_critical(&a.id)));
    }
}
