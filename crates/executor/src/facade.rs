use std::sync::Arc;

use async_trait::async_trait;

use ai_optimizer_common::Result;
use ai_optimizer_domain::{ComponentAction, PackagedApp, Service};

/// 进度回调：百分比 + 描述
pub type ProgressCb = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// 外部命令的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// 失败说明：优先 stderr，其次 stdout，最后退出码
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// 操作系统门面。所有会修改系统或查询系统状态的调用都经过这里。
#[async_trait]
pub trait SystemFacade: Send + Sync {
    async fn create_restore_point(&self, description: &str) -> Result<()>;

    async fn enumerate_services(&self) -> Result<Vec<Service>>;

    async fn enumerate_packaged_apps(&self) -> Result<Vec<PackagedApp>>;

    /// 把组件操作翻译成一条命令；不支持的操作返回 `None`
    fn command_for(&self, action: &ComponentAction) -> Option<Vec<String>>;

    async fn run_command(&self, argv: &[String]) -> Result<CommandOutput>;

    async fn hardware_info(&self) -> Result<serde_json::Value>;

    async fn installed_software(&self) -> Result<Vec<String>>;
}
