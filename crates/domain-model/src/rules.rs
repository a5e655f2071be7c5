use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::ComponentType;
use crate::risk::SafetyLevel;

/// 对服务/打包应用的静态规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRule {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default)]
    pub safety: SafetyLevel,
    /// 依赖该组件的用户画像
    #[serde(default)]
    pub relevant_profiles: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl OptimizationRule {
    pub fn is_critical(&self) -> bool {
        self.safety == SafetyLevel::Critical
    }

    pub fn is_relevant_to(&self, profiles: &[String]) -> bool {
        self.relevant_profiles.iter().any(|p| profiles.contains(p))
    }
}

/// 清理类别：决定扫描方式与是否允许自动删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCategory {
    pub category_id: String,
    /// 含通配符的路径按文件名掩码搜索，否则整体测量目录大小
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default, alias = "age_days")]
    pub age_threshold_days: Option<u32>,
    #[serde(default)]
    pub safety: SafetyLevel,
    #[serde(default)]
    pub description: String,
}

/// 用户画像探测配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// 画像 -> 已安装软件名称关键词
    #[serde(default)]
    pub app_keywords: BTreeMap<String, Vec<String>>,
    /// 画像 -> 相对于主目录的标志性目录
    #[serde(default)]
    pub filesystem_markers: BTreeMap<String, Vec<String>>,
}

fn default_sensitive_profiles() -> Vec<String> {
    ["Developer", "ContentCreator", "AudioEngineer"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// 规则库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub optimization_rules: Vec<OptimizationRule>,
    #[serde(default)]
    pub cleanup_rules: Vec<CleanupCategory>,
    #[serde(default)]
    pub user_profiler_config: ProfilerConfig,
    /// 依赖低安全等级缓存的画像，对这些画像禁止清理 Low 类别
    #[serde(default = "default_sensitive_profiles")]
    pub sensitive_profiles: Vec<String>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            optimization_rules: Vec::new(),
            cleanup_rules: Vec::new(),
            user_profiler_config: ProfilerConfig::default(),
            sensitive_profiles: default_sensitive_profiles(),
        }
    }
}

impl KnowledgeBase {
    pub fn cleanup_rule(&self, category_id: &str) -> Option<&CleanupCategory> {
        self.cleanup_rules
            .iter()
            .find(|r| r.category_id == category_id)
    }

    /// 发给推理服务的规则子集：关键规则、无画像偏好的规则，以及与当前画像相关的规则
    pub fn relevant_to(&self, profiles: &[String]) -> KnowledgeBase {
        let optimization_rules = self
            .optimization_rules
            .iter()
            .filter(|r| {
                r.is_critical() || r.relevant_profiles.is_empty() || r.is_relevant_to(profiles)
            })
            .cloned()
            .collect();
        KnowledgeBase {
            optimization_rules,
            cleanup_rules: self.cleanup_rules.clone(),
            user_profiler_config: ProfilerConfig::default(),
            sensitive_profiles: self.sensitive_profiles.clone(),
        }
    }
}
