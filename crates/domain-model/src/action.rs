use serde::{Deserialize, Serialize};

/// 动作作用的组件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Service,
    #[serde(alias = "uwp_app")]
    PackagedApp,
}

/// 执行动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Disable,
    SetManual,
    Stop,
    Remove,
}

impl ActionKind {
    /// Disable/Remove 是破坏性动作，受画像相关性保护
    pub fn is_destructive(self) -> bool {
        matches!(self, ActionKind::Disable | ActionKind::Remove)
    }
}

/// 计划中的单个动作条目，校验后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub id: String,
    pub action: ActionKind,
    #[serde(
        rename = "package_full_name",
        alias = "package_ref",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub package_ref: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, alias = "user_explanation_ru")]
    pub user_explanation: String,
}

impl ActionItem {
    pub fn new(component_type: ComponentType, id: impl Into<String>, action: ActionKind) -> Self {
        Self {
            component_type,
            id: id.into(),
            action,
            package_ref: None,
            reason: String::new(),
            user_explanation: String::new(),
        }
    }

    pub fn with_package_ref(mut self, package_ref: impl Into<String>) -> Self {
        self.package_ref = Some(package_ref.into());
        self
    }

    /// 面向用户的描述，缺省时退回到 id
    pub fn display_label(&self) -> &str {
        if self.user_explanation.trim().is_empty() {
            &self.id
        } else {
            &self.user_explanation
        }
    }
}

/// 交给 OS 门面的具体操作。一个 ActionItem 至多翻译成一个 ComponentAction。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    DisableService { name: String },
    SetServiceManual { name: String },
    StopService { name: String },
    /// 按完整包名卸载
    RemovePackage { package: String },
    /// 没有包引用时按名称模糊匹配卸载
    RemovePackageByName { name: String },
}

impl ComponentAction {
    /// 把抽象动作翻译成门面操作；组合非法（如对打包应用执行 Disable）时返回 None
    pub fn from_item(item: &ActionItem) -> Option<Self> {
        let id = item.id.trim();
        match (item.component_type, item.action) {
            (_, _) if id.is_empty() => None,
            (ComponentType::Service, ActionKind::Disable) => {
                Some(ComponentAction::DisableService { name: id.to_string() })
            }
            (ComponentType::Service, ActionKind::SetManual) => {
                Some(ComponentAction::SetServiceManual { name: id.to_string() })
            }
            (ComponentType::Service, ActionKind::Stop) => {
                Some(ComponentAction::StopService { name: id.to_string() })
            }
            (ComponentType::PackagedApp, ActionKind::Remove) => match item
                .package_ref
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
            {
                Some(package) => Some(ComponentAction::RemovePackage {
                    package: package.to_string(),
                }),
                None => Some(ComponentAction::RemovePackageByName { name: id.to_string() }),
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_field_names() {
        let item: ActionItem = serde_json::from_value(serde_json::json!({
            "type": "uwp_app",
            "id": "Microsoft.BingNews",
            "action": "remove",
            "package_ref": "Microsoft.BingNews_1.0_x64",
            "user_explanation_ru": "news"
        }))
        .unwrap();
        assert_eq!(item.component_type, ComponentType::PackagedApp);
        assert_eq!(item.package_ref.as_deref(), Some("Microsoft.BingNews_1.0_x64"));
        assert_eq!(item.user_explanation, "news");
    }

    #[test]
    fn translation_rejects_invalid_combinations() {
        let item = ActionItem::new(ComponentType::PackagedApp, "App", ActionKind::Disable);
        assert_eq!(ComponentAction::from_item(&item), None);

        let item = ActionItem::new(ComponentType::Service, "   ", ActionKind::Stop);
        assert_eq!(ComponentAction::from_item(&item), None);
    }

    #[test]
    fn remove_without_package_ref_falls_back_to_name() {
        let item = ActionItem::new(ComponentType::PackagedApp, "Solitaire", ActionKind::Remove);
        assert_eq!(
            ComponentAction::from_item(&item),
            Some(ComponentAction::RemovePackageByName { name: "Solitaire".to_string() })
        );
        let item = item.with_package_ref("Solitaire_2.0");
        assert_eq!(
            ComponentAction::from_item(&item),
            Some(ComponentAction::RemovePackage { package: "Solitaire_2.0".to_string() })
        );
    }
}
