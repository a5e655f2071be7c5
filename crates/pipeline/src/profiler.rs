use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_optimizer_domain::{ProfilerConfig, SystemProfile};
use ai_optimizer_executor::SystemFacade;
use ai_optimizer_scanner::FileSystem;

/// 按画像列出 home 目录下实际存在的标记路径
pub fn find_filesystem_markers(
    fs: &dyn FileSystem,
    home: &Path,
    markers: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let mut found = BTreeMap::new();
    for (profile, paths) in markers {
        let present: Vec<String> = paths
            .iter()
            .filter(|rel| fs.stat(&home.join(rel.as_str())).is_ok())
            .cloned()
            .collect();
        if !present.is_empty() {
            found.insert(profile.clone(), present);
        }
    }
    found
}

/// 并发采集硬件信息、已安装软件与文件系统标记；任一分支失败时以空值代替
pub async fn collect_system_profile(
    facade: &dyn SystemFacade,
    fs: Arc<dyn FileSystem>,
    config: &ProfilerConfig,
    home: Option<PathBuf>,
) -> SystemProfile {
    let markers = config.filesystem_markers.clone();
    let marker_scan = async move {
        let Some(home) = home else {
            log::debug!("home directory unknown, skipping filesystem markers");
            return BTreeMap::new();
        };
        tokio::task::spawn_blocking(move || find_filesystem_markers(fs.as_ref(), &home, &markers))
            .await
            .unwrap_or_else(|e| {
                log::warn!("filesystem marker scan failed: {}", e);
                BTreeMap::new()
            })
    };

    let (hardware, software, filesystem_markers) = tokio::join!(
        facade.hardware_info(),
        facade.installed_software(),
        marker_scan
    );

    let hardware = hardware.unwrap_or_else(|e| {
        log::warn!("hardware query failed: {}", e);
        serde_json::Value::Object(Default::default())
    });
    let installed_software = software.unwrap_or_else(|e| {
        log::warn!("software inventory failed: {}", e);
        Vec::new()
    });
    log::info!(
        "system profile: {} installed programs, {} marker groups",
        installed_software.len(),
        filesystem_markers.len()
    );
    SystemProfile {
        hardware,
        installed_software,
        filesystem_markers,
    }
}
