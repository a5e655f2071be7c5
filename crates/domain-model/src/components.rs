use serde::{Deserialize, Serialize};

/// 系统服务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mode: Option<String>,
}

impl Service {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            state: None,
            start_mode: None,
        }
    }
}

/// 打包应用（UWP / Flatpak 等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedApp {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_full_name: Option<String>,
}

/// 一次完整组件扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemComponents {
    pub services: Vec<Service>,
    pub packaged_apps: Vec<PackagedApp>,
}
