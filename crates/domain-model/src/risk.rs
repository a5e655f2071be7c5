use serde::{Deserialize, Serialize};

/// 安全等级：规则与清理类别的风险评估
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for SafetyLevel {
    fn default() -> Self {
        SafetyLevel::Medium
    }
}
