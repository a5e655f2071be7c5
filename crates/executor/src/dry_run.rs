use std::sync::Arc;

use async_trait::async_trait;

use ai_optimizer_common::Result;
use ai_optimizer_domain::{ComponentAction, PackagedApp, Service};

use crate::facade::{CommandOutput, SystemFacade};

/// 演练模式：只读调用透传，还原点与命令只记录日志并假装成功
pub struct DryRunFacade {
    inner: Arc<dyn SystemFacade>,
}

impl DryRunFacade {
    pub fn new(inner: Arc<dyn SystemFacade>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SystemFacade for DryRunFacade {
    async fn create_restore_point(&self, description: &str) -> Result<()> {
        log::info!("[dry-run] would create restore point '{}'", description);
        Ok(())
    }

    async fn enumerate_services(&self) -> Result<Vec<Service>> {
        self.inner.enumerate_services().await
    }

    async fn enumerate_packaged_apps(&self) -> Result<Vec<PackagedApp>> {
        self.inner.enumerate_packaged_apps().await
    }

    fn command_for(&self, action: &ComponentAction) -> Option<Vec<String>> {
        self.inner.command_for(action)
    }

    async fn run_command(&self, argv: &[String]) -> Result<CommandOutput> {
        log::info!("[dry-run] would run: {}", argv.join(" "));
        Ok(CommandOutput::ok(""))
    }

    async fn hardware_info(&self) -> Result<serde_json::Value> {
        self.inner.hardware_info().await
    }

    async fn installed_software(&self) -> Result<Vec<String>> {
        self.inner.installed_software().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::testing::FakeFacade;

    #[tokio::test]
    async fn commands_are_not_forwarded() {
        let inner = Arc::new(FakeFacade::with_services(&["Fax"]));
        let facade = DryRunFacade::new(inner.clone());

        let action = ComponentAction::DisableService {
            name: "Fax".to_string(),
        };
        let argv = facade.command_for(&action).unwrap();
        let out = facade.run_command(&argv).await.unwrap();

        assert!(out.success());
        assert_eq!(inner.command_count(), 0);
        assert_eq!(facade.enumerate_services().await.unwrap().len(), 1);
    }
}
