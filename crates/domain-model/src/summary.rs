use serde::{Deserialize, Serialize};

use crate::action::{ActionItem, ActionKind, ComponentType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAction {
    pub item: ActionItem,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAction {
    pub item: ActionItem,
    pub reason: String,
}

/// 动作执行汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub completed: Vec<ActionItem>,
    pub failed: Vec<FailedAction>,
    pub skipped: Vec<SkippedAction>,
}

impl ExecutionSummary {
    pub fn disabled_services(&self) -> usize {
        self.completed
            .iter()
            .filter(|i| {
                i.component_type == ComponentType::Service && i.action == ActionKind::Disable
            })
            .count()
    }

    pub fn removed_apps(&self) -> usize {
        self.completed
            .iter()
            .filter(|i| {
                i.component_type == ComponentType::PackagedApp && i.action == ActionKind::Remove
            })
            .count()
    }
}

/// 磁盘清理汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub cleaned_size_bytes: u64,
    pub deleted_files_count: u64,
    pub errors: u64,
    pub removed_dirs: u64,
}

impl CleanupSummary {
    pub fn merge(&mut self, other: &CleanupSummary) {
        self.cleaned_size_bytes += other.cleaned_size_bytes;
        self.deleted_files_count += other.deleted_files_count;
        self.errors += other.errors;
        self.removed_dirs += other.removed_dirs;
    }
}

/// 一次会话的最终汇总，交给报告生成器
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub actions: ExecutionSummary,
    pub cleanup: CleanupSummary,
}
