use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use ai_optimizer_domain::{
    ActionItem, ComponentAction, ComponentType, ExecutionSummary, FailedAction, SkippedAction,
};

use crate::facade::{ProgressCb, SystemFacade};

pub const ACTIONS_COMPLETE_PERCENT: u8 = 85;

/// 执行已校验的组件操作，单个条目的失败不影响其它条目
pub struct ActionExecutor {
    facade: Arc<dyn SystemFacade>,
}

enum Prepared {
    Run(ActionItem, Vec<String>),
    Skip(SkippedAction),
}

/// 执行前枚举一次的宿主现状（名称均为小写）；枚举失败为 `None`
#[derive(Default)]
struct Inventory {
    services: Option<HashSet<String>>,
    packaged_apps: Option<HashSet<String>>,
}

impl Inventory {
    async fn collect(facade: &dyn SystemFacade, plan: &[ActionItem]) -> Self {
        let wants = |t: ComponentType| plan.iter().any(|item| item.component_type == t);
        let mut inventory = Inventory::default();
        if wants(ComponentType::Service) {
            inventory.services = match facade.enumerate_services().await {
                Ok(services) => Some(services.into_iter().map(|s| s.name.to_lowercase()).collect()),
                Err(e) => {
                    log::warn!("cannot enumerate services, service actions will be skipped: {}", e);
                    None
                }
            };
        }
        if wants(ComponentType::PackagedApp) {
            inventory.packaged_apps = match facade.enumerate_packaged_apps().await {
                Ok(apps) => Some(
                    apps.into_iter()
                        .flat_map(|app| std::iter::once(app.id).chain(app.package_full_name))
                        .map(|name| name.to_lowercase())
                        .collect(),
                ),
                Err(e) => {
                    log::warn!("cannot enumerate packaged apps, removals will be skipped: {}", e);
                    None
                }
            };
        }
        inventory
    }

    /// 服务按 id 匹配；打包应用有包引用时按包引用匹配，否则按 id
    fn check(&self, item: &ActionItem) -> Result<(), String> {
        let (known, name, what) = match item.component_type {
            ComponentType::Service => (&self.services, item.id.as_str(), "service"),
            ComponentType::PackagedApp => (
                &self.packaged_apps,
                item.package_ref.as_deref().unwrap_or(item.id.as_str()),
                "packaged app",
            ),
        };
        match known {
            Some(names) if names.contains(&name.to_lowercase()) => Ok(()),
            Some(_) => Err(format!("{} not found", what)),
            None => Err(format!("{} list unavailable", what)),
        }
    }
}

impl ActionExecutor {
    pub fn new(facade: Arc<dyn SystemFacade>) -> Self {
        Self { facade }
    }

    fn prepare(&self, item: &ActionItem, inventory: &Inventory) -> Prepared {
        let skip = |reason: String| {
            log::info!("skipping {:?} on '{}': {}", item.action, item.id, reason);
            Prepared::Skip(SkippedAction {
                item: item.clone(),
                reason,
            })
        };

        let Some(action) = ComponentAction::from_item(item) else {
            return skip(format!(
                "{:?} is not supported for {:?}",
                item.action, item.component_type
            ));
        };
        if let Err(reason) = inventory.check(item) {
            return skip(reason);
        }
        match self.facade.command_for(&action) {
            Some(argv) if !argv.is_empty() => Prepared::Run(item.clone(), argv),
            _ => skip(format!("no command available for {:?}", action)),
        }
    }

    /// 宿主现状在每次调用开始时枚举一次，同一计划内的条目共用
    pub async fn execute(
        &self,
        plan: &[ActionItem],
        progress: Option<&ProgressCb>,
    ) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        if plan.is_empty() {
            log::info!("no component actions to apply");
            report(progress, "No component changes needed");
            return summary;
        }

        let inventory = Inventory::collect(self.facade.as_ref(), plan).await;
        let mut runs = Vec::new();
        for item in plan {
            match self.prepare(item, &inventory) {
                Prepared::Run(item, argv) => runs.push((item, argv)),
                Prepared::Skip(skipped) => summary.skipped.push(skipped),
            }
        }

        let outcomes = join_all(runs.into_iter().map(|(item, argv)| {
            let facade = Arc::clone(&self.facade);
            async move {
                log::debug!("running {:?}", argv);
                let outcome = facade.run_command(&argv).await;
                (item, outcome)
            }
        }))
        .await;

        for (item, outcome) in outcomes {
            match outcome {
                Ok(output) if output.success() => {
                    log::info!("{:?} {} succeeded", item.action, item.id);
                    summary.completed.push(item);
                }
                Ok(output) => {
                    let error = output.error_text();
                    log::warn!("{:?} {} failed: {}", item.action, item.id, error);
                    summary.failed.push(FailedAction { item, error });
                }
                Err(e) => {
                    log::error!("{:?} {} failed: {}", item.action, item.id, e);
                    summary.failed.push(FailedAction {
                        item,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "actions complete: {} completed, {} failed, {} skipped",
            summary.completed.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        report(progress, "Component changes applied");
        summary
    }
}

fn report(progress: Option<&ProgressCb>, message: &str) {
    if let Some(cb) = progress {
        cb(ACTIONS_COMPLETE_PERCENT, message);
    }
}
