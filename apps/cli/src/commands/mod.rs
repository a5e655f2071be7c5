pub mod permission;
pub mod reclaim;
pub mod run;
pub mod scan;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use ai_optimizer_common::{default_reclaim_roots, expand_path, AppConfig, Result};
use ai_optimizer_domain::KnowledgeBase;
use ai_optimizer_engine::load_knowledge_base;
use ai_optimizer_executor::{CommandFacade, DryRunFacade, SystemFacade};
use ai_optimizer_scanner::{DryRunFileSystem, FileSystem, LocalFileSystem};

pub fn knowledge_base(config: &AppConfig) -> Result<KnowledgeBase> {
    let path = expand_path(&config.knowledge_base_path.to_string_lossy());
    load_knowledge_base(&path)
}

pub fn file_system(config: &AppConfig) -> Arc<dyn FileSystem> {
    if config.dry_run {
        Arc::new(DryRunFileSystem::new(LocalFileSystem))
    } else {
        Arc::new(LocalFileSystem)
    }
}

pub fn system_facade(config: &AppConfig) -> Arc<dyn SystemFacade> {
    let host: Arc<dyn SystemFacade> = Arc::new(CommandFacade::new(config.host.clone()));
    if config.dry_run {
        log::info!("dry run: no changes will be made");
        Arc::new(DryRunFacade::new(host))
    } else {
        host
    }
}

/// 命令行 > 配置 > 系统默认
pub fn reclaim_roots(config: &AppConfig, overrides: &[String]) -> Vec<PathBuf> {
    let raw = if overrides.is_empty() {
        &config.empty_dir_roots
    } else {
        overrides
    };
    if raw.is_empty() {
        return default_reclaim_roots();
    }
    raw.iter().map(|r| expand_path(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclaim_roots_prefer_overrides() {
        let mut config = AppConfig::default();
        config.empty_dir_roots = vec!["/var/tmp/a".to_string()];

        assert_eq!(reclaim_roots(&config, &[]), vec![PathBuf::from("/var/tmp/a")]);
        assert_eq!(
            reclaim_roots(&config, &["/srv/b".to_string()]),
            vec![PathBuf::from("/srv/b")]
        );

        config.empty_dir_roots.clear();
        assert_eq!(reclaim_roots(&config, &[]), default_reclaim_roots());
    }
}
