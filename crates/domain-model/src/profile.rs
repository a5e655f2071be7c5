use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::SystemComponents;
use crate::scan_result::JunkReport;

pub const DEFAULT_PROFILE: &str = "HomeUser";

/// 用于推断用户画像的系统概况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemProfile {
    pub hardware: serde_json::Value,
    pub installed_software: Vec<String>,
    /// 画像 -> 命中的标志性目录
    pub filesystem_markers: BTreeMap<String, Vec<String>>,
}

/// 发给推理服务生成计划的系统快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub system_components: SystemComponents,
    pub junk_files_report: JunkReport,
}

/// 有序、去重、非空的画像标签集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfiles(Vec<String>);

impl UserProfiles {
    /// 去掉空白与重复标签；结果为空时退回默认画像
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim().trim_matches('"').trim();
            if !label.is_empty() && !out.iter().any(|l| l == label) {
                out.push(label.to_string());
            }
        }
        if out.is_empty() {
            out.push(DEFAULT_PROFILE.to_string());
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }
}

impl Default for UserProfiles {
    fn default() -> Self {
        Self(vec![DEFAULT_PROFILE.to_string()])
    }
}

impl std::fmt::Display for UserProfiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_deduplicated_and_never_empty() {
        let p = UserProfiles::new(["Developer", " Developer ", "\"Gamer\"", ""]);
        assert_eq!(p.as_slice(), &["Developer".to_string(), "Gamer".to_string()]);

        let empty: [&str; 0] = [];
        assert_eq!(UserProfiles::new(empty), UserProfiles::default());
        assert!(UserProfiles::new(["  "]).contains(DEFAULT_PROFILE));
    }
}
