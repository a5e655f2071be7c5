use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::ActionItem;

/// 单个清理类别的决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupDecision {
    pub clean: bool,
}

impl CleanupDecision {
    pub const KEEP: CleanupDecision = CleanupDecision { clean: false };
    pub const CLEAN: CleanupDecision = CleanupDecision { clean: true };
}

/// 优化计划：动作列表 + 各清理类别的决策
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub action_plan: Vec<ActionItem>,
    pub cleanup_plan: BTreeMap<String, CleanupDecision>,
}

impl Plan {
    /// 是否存在需要执行的内容
    pub fn has_work(&self) -> bool {
        !self.action_plan.is_empty() || self.cleanup_plan.values().any(|d| d.clean)
    }

    /// 被批准清理的类别 id
    pub fn categories_to_clean(&self) -> impl Iterator<Item = &str> {
        self.cleanup_plan
            .iter()
            .filter(|(_, d)| d.clean)
            .map(|(id, _)| id.as_str())
    }
}
