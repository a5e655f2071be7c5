use std::path::Path;

use ai_optimizer_common::{OptimizerError, Result};
use ai_optimizer_domain::KnowledgeBase;

/// 加载规则库（TOML）。规则库缺失或无法解析时无法安全运行，直接返回错误。
pub fn load_knowledge_base(path: &Path) -> Result<KnowledgeBase> {
    if !path.exists() {
        return Err(OptimizerError::Config(format!(
            "knowledge base not found: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path).map_err(|e| OptimizerError::from_io_at(e, path))?;
    let kb = parse_knowledge_base(&raw)
        .map_err(|e| OptimizerError::Config(format!("{}: {}", path.display(), e)))?;
    log::info!(
        "knowledge base loaded: {} optimization rules, {} cleanup rules",
        kb.optimization_rules.len(),
        kb.cleanup_rules.len()
    );
    Ok(kb)
}

pub fn parse_knowledge_base(raw: &str) -> std::result::Result<KnowledgeBase, String> {
    let kb: KnowledgeBase = toml::from_str(raw).map_err(|e| e.to_string())?;
    for rule in &kb.optimization_rules {
        if rule.id.trim().is_empty() {
            return Err("optimization rule with empty id".to_string());
        }
    }
    for rule in &kb.cleanup_rules {
        if rule.category_id.trim().is_empty() {
            return Err("cleanup rule with empty category_id".to_string());
        }
    }
    Ok(kb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_optimizer_domain::SafetyLevel;

    const SAMPLE: &str = r#"
sensitive_profiles = ["Developer"]

[[optimization_rules]]
id = "WinDefend"
type = "service"
safety = "critical"

[[optimization_rules]]
id = "docker"
safety = "medium"
relevant_profiles = ["Developer"]

[[cleanup_rules]]
category_id = "pip_cache"
paths = ["~/.cache/pip"]
safety = "low"

[[cleanup_rules]]
category_id = "old_logs"
paths = ["/var/log/app/*.log"]
age_days = 30
safety = "high"

[user_profiler_config.app_keywords]
Developer = ["vscode", "docker"]
"#;

    #[test]
    fn parses_rules_and_aliases() {
        let kb = parse_knowledge_base(SAMPLE).unwrap();
        assert_eq!(kb.optimization_rules.len(), 2);
        assert!(kb.optimization_rules[0].is_critical());
        assert_eq!(kb.cleanup_rule("old_logs").unwrap().age_threshold_days, Some(30));
        assert_eq!(kb.cleanup_rule("pip_cache").unwrap().safety, SafetyLevel::Low);
        assert_eq!(kb.user_profiler_config.app_keywords["Developer"].len(), 2);
        assert_eq!(kb.sensitive_profiles, vec!["Developer".to_string()]);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_knowledge_base(&dir.path().join("kb.toml")).unwrap_err();
        assert!(matches!(err, OptimizerError::Config(_)));
    }

    #[test]
    fn rejects_blank_ids() {
        let raw = "[[optimization_rules]]\nid = \"  \"\n";
        assert!(parse_knowledge_base(raw).is_err());
    }
}
