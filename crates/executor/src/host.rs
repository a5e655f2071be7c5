//! 基于命令模板的 OS 门面

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use ai_optimizer_common::{HostCommands, OptimizerError, Result};
use ai_optimizer_domain::{ComponentAction, PackagedApp, Service};

use crate::facade::{CommandOutput, SystemFacade};

pub struct CommandFacade {
    commands: HostCommands,
}

impl CommandFacade {
    pub fn new(commands: HostCommands) -> Self {
        Self { commands }
    }

    async fn run_listing(&self, template: &[String], what: &str) -> Result<String> {
        let output = self.run_command(template).await?;
        if !output.success() {
            return Err(OptimizerError::Facade(format!(
                "{} failed: {}",
                what,
                output.error_text()
            )));
        }
        Ok(output.stdout)
    }
}

/// 用组件 id / 包引用替换模板中的占位符；空模板返回 `None`
///
/// 占位符独占一个参数时按原样替换，值像命令行选项（以 `-` 开头）时拒绝渲染。
/// 嵌在脚本文本中时按 PowerShell 单引号字符串规则转义引号。
pub fn render_template(template: &[String], id: &str, package: &str) -> Option<Vec<String>> {
    if template.is_empty() || template[0].trim().is_empty() {
        return None;
    }
    template
        .iter()
        .map(|part| match part.as_str() {
            "{id}" => standalone(id),
            "{package}" => standalone(package),
            _ => Some(substitute(part, id, package)),
        })
        .collect()
}

fn standalone(value: &str) -> Option<String> {
    if value.starts_with('-') {
        log::warn!("refusing to pass option-like argument '{}'", value);
        return None;
    }
    Some(value.to_string())
}

/// 单遍替换，替换进来的值不会再被当作占位符
fn substitute(part: &str, id: &str, package: &str) -> String {
    let mut out = String::with_capacity(part.len());
    let mut rest = part;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{id}") {
            out.push_str(&escape_single_quoted(id));
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{package}") {
            out.push_str(&escape_single_quoted(package));
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// PowerShell 把 `'` 以及 U+2018..U+201B 都视为单引号，重复一次即为字面量
pub fn escape_single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\'' | '\u{2018}'..='\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out
}

/// 每行第一列为服务名（去掉 `.service` 后缀），第二列若存在视为启动方式
pub fn parse_services(stdout: &str) -> Vec<Service> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let raw = cols.next()?;
            let name = raw.strip_suffix(".service").unwrap_or(raw);
            if name.is_empty() {
                return None;
            }
            let mut service = Service::named(name);
            service.start_mode = cols.next().map(str::to_string);
            Some(service)
        })
        .collect()
}

/// 每行 `id<空白>完整包名`，完整包名可省略
pub fn parse_packaged_apps(stdout: &str) -> Vec<PackagedApp> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let id = cols.next()?.to_string();
            Some(PackagedApp {
                id,
                package_full_name: cols.next().map(str::to_string),
            })
        })
        .collect()
}

fn non_empty_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SystemFacade for CommandFacade {
    async fn create_restore_point(&self, description: &str) -> Result<()> {
        let argv = render_template(&self.commands.restore_point, description, "").ok_or_else(|| {
            OptimizerError::RestorePoint("no restore point command configured".to_string())
        })?;
        let output = self
            .run_command(&argv)
            .await
            .map_err(|e| OptimizerError::RestorePoint(e.to_string()))?;
        if !output.success() {
            return Err(OptimizerError::RestorePoint(output.error_text()));
        }
        log::info!("restore point '{}' created", description);
        Ok(())
    }

    async fn enumerate_services(&self) -> Result<Vec<Service>> {
        let stdout = self
            .run_listing(&self.commands.list_services, "service listing")
            .await?;
        Ok(parse_services(&stdout))
    }

    async fn enumerate_packaged_apps(&self) -> Result<Vec<PackagedApp>> {
        if self.commands.list_packaged_apps.is_empty() {
            return Ok(Vec::new());
        }
        let stdout = self
            .run_listing(&self.commands.list_packaged_apps, "packaged app listing")
            .await?;
        Ok(parse_packaged_apps(&stdout))
    }

    fn command_for(&self, action: &ComponentAction) -> Option<Vec<String>> {
        let c = &self.commands;
        match action {
            ComponentAction::DisableService { name } => {
                render_template(&c.service_disable, name, "")
            }
            ComponentAction::SetServiceManual { name } => {
                render_template(&c.service_set_manual, name, "")
            }
            ComponentAction::StopService { name } => render_template(&c.service_stop, name, ""),
            ComponentAction::RemovePackage { package } => {
                render_template(&c.package_remove, package, package)
            }
            ComponentAction::RemovePackageByName { name } => {
                render_template(&c.package_remove_by_name, name, "")
            }
        }
    }

    async fn run_command(&self, argv: &[String]) -> Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| OptimizerError::Facade("command is empty".to_string()))?;
        log::debug!("executing: {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| OptimizerError::Facade(format!("failed to run {}: {}", program, e)))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn hardware_info(&self) -> Result<serde_json::Value> {
        let logical_cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Ok(json!({
            "os": std::env::consts::OS,
            "family": std::env::consts::FAMILY,
            "arch": std::env::consts::ARCH,
            "logical_cpus": logical_cpus,
        }))
    }

    async fn installed_software(&self) -> Result<Vec<String>> {
        if self.commands.list_installed_software.is_empty() {
            return Ok(Vec::new());
        }
        let stdout = self
            .run_listing(&self.commands.list_installed_software, "software listing")
            .await?;
        Ok(non_empty_lines(&stdout))
    }
}
