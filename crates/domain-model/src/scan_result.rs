use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 单个类别的扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFindings {
    pub category_id: String,
    pub size: u64,
    pub count: u64,
    /// 掩码搜索得到的单个文件，逐个删除
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_to_delete: Vec<String>,
    /// 整体测量的目录，只清空内容
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths_to_clean: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// 垃圾文件报告，只包含总大小非零的类别
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunkReport {
    pub categories: BTreeMap<String, CategoryFindings>,
}

impl JunkReport {
    pub fn total_size(&self) -> u64 {
        self.categories.values().map(|c| c.size).sum()
    }

    pub fn get(&self, category_id: &str) -> Option<&CategoryFindings> {
        self.categories.get(category_id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
