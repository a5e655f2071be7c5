use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};

/// 组件扫描缓存的默认有效期（秒）
pub const DEFAULT_COMPONENT_CACHE_TTL_SECS: u64 = 300;
/// 推理服务响应缓存的默认有效期（秒）
pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 3600;

/// 应用配置
///
/// 从 TOML 文件读取，缺失的字段使用默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 只记录将要执行的操作，不真正修改系统
    pub dry_run: bool,
    /// 规则库（knowledge base）路径
    pub knowledge_base_path: PathBuf,
    pub component_cache_ttl_secs: u64,
    /// 空目录回收的根目录；为空时使用系统临时目录与用户缓存目录
    pub empty_dir_roots: Vec<String>,
    pub reasoning: ReasoningConfig,
    pub host: HostCommands,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            knowledge_base_path: PathBuf::from("knowledge_base.toml"),
            component_cache_ttl_secs: DEFAULT_COMPONENT_CACHE_TTL_SECS,
            empty_dir_roots: Vec::new(),
            reasoning: ReasoningConfig::default(),
            host: HostCommands::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    /// OpenAI 兼容的 chat/completions 地址
    pub endpoint: String,
    pub model: String,
    /// 存放 API key 的环境变量名
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub response_cache_ttl_secs: u64,
    pub temperature: f32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "AI_OPTIMIZER_API_KEY".to_string(),
            timeout_secs: 120,
            response_cache_ttl_secs: DEFAULT_RESPONSE_CACHE_TTL_SECS,
            temperature: 0.1,
        }
    }
}

/// 命令式 OS 门面使用的命令模板。
///
/// 模板中的 `{id}` 替换为组件 id，`{package}` 替换为包引用。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostCommands {
    pub restore_point: Vec<String>,
    pub list_services: Vec<String>,
    pub list_packaged_apps: Vec<String>,
    pub list_installed_software: Vec<String>,
    pub service_disable: Vec<String>,
    pub service_set_manual: Vec<String>,
    pub service_stop: Vec<String>,
    pub package_remove: Vec<String>,
    /// 没有包引用时按名称匹配卸载
    pub package_remove_by_name: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(windows)]
impl Default for HostCommands {
    fn default() -> Self {
        let ps = |script: &str| {
            argv(&[
                "powershell.exe",
                "-NoProfile",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script,
            ])
        };
        Self {
            restore_point: ps(
                "Checkpoint-Computer -Description 'ai-optimizer' -RestorePointType 'MODIFY_SETTINGS'",
            ),
            list_services: ps("Get-Service | Select-Object -ExpandProperty Name"),
            list_packaged_apps: ps(
                "Get-AppxPackage | Where-Object {$_.IsFramework -eq $false -and $_.NonRemovable -eq $false} | ForEach-Object { $_.Name + \"`t\" + $_.PackageFullName }",
            ),
            list_installed_software: ps(
                "Get-ItemProperty HKLM:\\Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\* | Where-Object DisplayName | Select-Object -ExpandProperty DisplayName",
            ),
            service_disable: ps(
                "Stop-Service -Name '{id}' -Force -ErrorAction SilentlyContinue; Set-Service -Name '{id}' -StartupType Disabled",
            ),
            service_set_manual: ps("Set-Service -Name '{id}' -StartupType Manual"),
            service_stop: ps("Stop-Service -Name '{id}' -Force"),
            package_remove: ps(
                "Get-AppxPackage -AllUsers -PackageFullName '{package}' | Remove-AppxPackage -AllUsers",
            ),
            package_remove_by_name: ps(
                "Get-AppxPackage -AllUsers -Name '*{id}*' | Remove-AppxPackage -AllUsers",
            ),
        }
    }
}

#[cfg(not(windows))]
impl Default for HostCommands {
    fn default() -> Self {
        Self {
            restore_point: argv(&["snapper", "create", "--description", "ai-optimizer"]),
            list_services: argv(&[
                "systemctl",
                "list-unit-files",
                "--type=service",
                "--no-legend",
                "--no-pager",
            ]),
            list_packaged_apps: argv(&["flatpak", "list", "--app", "--columns=application,ref"]),
            list_installed_software: argv(&["flatpak", "list", "--app", "--columns=name"]),
            service_disable: argv(&["systemctl", "disable", "--now", "--", "{id}"]),
            service_set_manual: argv(&["systemctl", "disable", "--", "{id}"]),
            service_stop: argv(&["systemctl", "stop", "--", "{id}"]),
            package_remove: argv(&["flatpak", "uninstall", "-y", "--", "{package}"]),
            package_remove_by_name: argv(&["flatpak", "uninstall", "-y", "--", "{id}"]),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.component_cache_ttl_secs == 0 {
            return Err(OptimizerError::Config(
                "component_cache_ttl_secs must be > 0".to_string(),
            ));
        }
        if self.reasoning.timeout_secs == 0 {
            return Err(OptimizerError::Config(
                "reasoning.timeout_secs must be > 0".to_string(),
            ));
        }
        let templates = [
            ("host.restore_point", &self.host.restore_point),
            ("host.list_services", &self.host.list_services),
            ("host.service_disable", &self.host.service_disable),
            ("host.package_remove", &self.host.package_remove),
        ];
        for (name, template) in templates {
            if template.is_empty() || template[0].trim().is_empty() {
                return Err(OptimizerError::Config(format!(
                    "{} must be a non-empty array",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// 从 TOML 文件加载配置；文件不存在时返回默认配置
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        log::info!("config {} not found, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| OptimizerError::from_io_at(e, path))?;
    let config: AppConfig = toml::from_str(&raw)
        .map_err(|e| OptimizerError::Config(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}
