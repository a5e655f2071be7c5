use std::path::Path;

use ai_optimizer_common::{AppConfig, OptimizerError, Result};
use ai_optimizer_domain::{KnowledgeBase, Plan, UserProfiles};
use ai_optimizer_engine::PlanValidator;

use super::knowledge_base;

pub fn validate_file(kb: &KnowledgeBase, plan: &Path, profiles: &[String]) -> Result<Plan> {
    let raw = std::fs::read_to_string(plan).map_err(|e| OptimizerError::from_io_at(e, plan))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| OptimizerError::MalformedPlan(format!("{}: {}", plan.display(), e)))?;
    PlanValidator::new(kb, &UserProfiles::new(profiles)).validate(&value)
}

pub fn validate(config: &AppConfig, plan: &Path, profiles: &[String]) -> Result<()> {
    let kb = knowledge_base(config)?;
    let validated = validate_file(&kb, plan, profiles)?;
    let json = serde_json::to_string_pretty(&validated)
        .map_err(|e| OptimizerError::Config(format!("cannot serialize plan: {}", e)))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_optimizer_domain::{CleanupCategory, CleanupDecision, SafetyLevel};

    #[test]
    fn validates_plan_file_for_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"action_plan": [{"type": "service", "id": "Fax", "action": "disable"}],
                "cleanup_plan": {"pip_cache": {"clean": true}}}"#,
        )
        .unwrap();
        let kb = KnowledgeBase {
            cleanup_rules: vec![CleanupCategory {
                category_id: "pip_cache".to_string(),
                paths: vec![],
                age_threshold_days: None,
                safety: SafetyLevel::Low,
                description: String::new(),
            }],
            ..KnowledgeBase::default()
        };

        let plan = validate_file(&kb, &path, &["Developer".to_string()]).unwrap();
        assert_eq!(plan.action_plan.len(), 1);
        assert_eq!(plan.cleanup_plan["pip_cache"], CleanupDecision::KEEP);
    }

    #[test]
    fn invalid_json_is_a_malformed_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "not json").unwrap();
        let err = validate_file(&KnowledgeBase::default(), &path, &[]).unwrap_err();
        assert!(matches!(err, OptimizerError::MalformedPlan(_)));
    }
}
