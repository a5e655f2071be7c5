use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use ai_optimizer_common::OptimizerError;
use ai_optimizer_domain::{
    CategoryFindings, CleanupCategory, CleanupDecision, CleanupSummary, JunkReport,
};
use futures::future::join_all;

use crate::filters::is_protected_extension;
use crate::fs::FileSystem;
use crate::reclaim::reclaim_under;
use crate::scanner::{measure_tree, scan_category};

/// 双模式磁盘清理引擎
#[derive(Clone)]
pub struct CleanupEngine {
    fs: Arc<dyn FileSystem>,
    categories: Arc<Vec<CleanupCategory>>,
}

impl CleanupEngine {
    pub fn new(fs: Arc<dyn FileSystem>, categories: Vec<CleanupCategory>) -> Self {
        Self {
            fs,
            categories: Arc::new(categories),
        }
    }

    pub fn categories(&self) -> &[CleanupCategory] {
        &self.categories
    }

    /// 并发扫描所有类别。单个类别失败只记日志，总大小为 0 的类别不进入报告。
    pub async fn find_junk(&self) -> JunkReport {
        self.find_junk_at(SystemTime::now()).await
    }

    pub async fn find_junk_at(&self, now: SystemTime) -> JunkReport {
        log::info!("scanning {} cleanup categories", self.categories.len());
        let tasks = self.categories.iter().cloned().map(|category| {
            let fs = Arc::clone(&self.fs);
            let id = category.category_id.clone();
            let handle =
                tokio::task::spawn_blocking(move || scan_category(fs.as_ref(), &category, now));
            async move { (id, handle.await) }
        });

        let mut report = JunkReport::default();
        for (id, result) in join_all(tasks).await {
            match result {
                Ok(Ok(findings)) if findings.size > 0 => {
                    report.categories.insert(id, findings);
                }
                Ok(Ok(_)) => log::debug!("category '{}' has nothing to clean", id),
                Ok(Err(e)) => log::error!("scan of category '{}' failed: {}", id, e),
                Err(e) => log::error!("scan task for category '{}' panicked: {}", id, e),
            }
        }
        log::info!(
            "junk scan finished: {} categories, {} bytes",
            report.len(),
            report.total_size()
        );
        report
    }

    /// 按计划清理被批准的类别，随后回收受影响目录下的空目录
    pub async fn perform_cleanup(
        &self,
        report: &JunkReport,
        plan: &BTreeMap<String, CleanupDecision>,
    ) -> Result<CleanupSummary, OptimizerError> {
        let approved: Vec<CategoryFindings> = plan
            .iter()
            .filter(|(_, decision)| decision.clean)
            .filter_map(|(id, _)| match report.get(id) {
                Some(findings) => Some(findings.clone()),
                None => {
                    log::debug!("category '{}' approved but absent from the report", id);
                    None
                }
            })
            .collect();
        if approved.is_empty() {
            return Ok(CleanupSummary::default());
        }

        let fs = Arc::clone(&self.fs);
        let summary = tokio::task::spawn_blocking(move || {
            let mut summary = CleanupSummary::default();
            let mut touched = BTreeSet::new();
            for findings in &approved {
                log::info!("cleaning category '{}'", findings.category_id);
                clean_category(fs.as_ref(), findings, &mut summary, &mut touched);
            }
            for dir in &touched {
                reclaim_under(fs.as_ref(), dir, &mut summary);
            }
            summary
        })
        .await
        .map_err(|e| OptimizerError::Task(format!("cleanup task failed: {}", e)))?;

        log::info!(
            "cleanup finished: {:.2} MB freed, {} files, {} errors",
            summary.cleaned_size_bytes as f64 / (1024.0 * 1024.0),
            summary.deleted_files_count,
            summary.errors
        );
        Ok(summary)
    }

    /// 独立的空目录回收：遍历给定根目录，根目录本身保留
    pub async fn reclaim_empty_dirs(
        &self,
        roots: Vec<PathBuf>,
    ) -> Result<CleanupSummary, OptimizerError> {
        let fs = Arc::clone(&self.fs);
        let summary = tokio::task::spawn_blocking(move || {
            let mut summary = CleanupSummary::default();
            for root in &roots {
                log::debug!("reclaiming empty directories under {}", root.display());
                reclaim_under(fs.as_ref(), root, &mut summary);
            }
            summary
        })
        .await
        .map_err(|e| OptimizerError::Task(format!("reclaim task failed: {}", e)))?;
        log::info!("removed {} empty directories", summary.removed_dirs);
        Ok(summary)
    }
}

fn clean_category(
    fs: &dyn FileSystem,
    findings: &CategoryFindings,
    summary: &mut CleanupSummary,
    touched: &mut BTreeSet<PathBuf>,
) {
    for file in &findings.files_to_delete {
        let path = Path::new(file);
        if is_protected_extension(path) {
            log::warn!("refusing to delete protected file {}", path.display());
            continue;
        }
        let size = match fs.stat(path) {
            Ok(info) if info.is_dir => {
                log::warn!("{} is a directory, skipped", path.display());
                continue;
            }
            Ok(info) => info.size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} already gone", path.display());
                continue;
            }
            Err(e) => {
                log::warn!("failed to stat '{}': {}", path.display(), e);
                summary.errors += 1;
                continue;
            }
        };
        match fs.remove_file(path) {
            Ok(()) => {
                summary.cleaned_size_bytes += size;
                summary.deleted_files_count += 1;
                if let Some(parent) = path.parent() {
                    touched.insert(parent.to_path_buf());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} removed concurrently", path.display());
            }
            Err(e) => {
                log::warn!("failed to delete file '{}': {}", path.display(), e);
                summary.errors += 1;
            }
        }
    }

    for dir in &findings.paths_to_clean {
        let dir = Path::new(dir);
        clean_directory_content(fs, dir, summary);
        touched.insert(dir.to_path_buf());
    }
}

/// 清空目录内容，目录本身保留
fn clean_directory_content(fs: &dyn FileSystem, dir: &Path, summary: &mut CleanupSummary) {
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            log::warn!("cannot read '{}': {}", dir.display(), e);
            summary.errors += 1;
            return;
        }
    };
    log::debug!("cleaning contents of {}", dir.display());

    for entry in entries {
        let (size, count, result) = if entry.is_dir {
            let (size, count) = measure_tree(fs, &entry.path);
            (size, count, fs.remove_dir_all(&entry.path))
        } else {
            (entry.size, 1, fs.remove_file(&entry.path))
        };
        match result {
            Ok(()) => {
                summary.cleaned_size_bytes += size;
                summary.deleted_files_count += count;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!("failed to delete '{}': {}", entry.path.display(), e);
                summary.errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{EntryInfo, LocalFileSystem};
    use ai_optimizer_domain::SafetyLevel;
    use std::fs;

    fn engine(categories: Vec<CleanupCategory>) -> CleanupEngine {
        CleanupEngine::new(Arc::new(LocalFileSystem), categories)
    }

    fn category(id: &str, paths: Vec<String>) -> CleanupCategory {
        CleanupCategory {
            category_id: id.to_string(),
            paths,
            age_threshold_days: None,
            safety: SafetyLevel::High,
            description: format!("{} files", id),
        }
    }

    fn clean(ids: &[&str]) -> BTreeMap<String, CleanupDecision> {
        ids.iter()
            .map(|id| (id.to_string(), CleanupDecision::CLEAN))
            .collect()
    }

    #[tokio::test]
    async fn report_omits_empty_and_missing_categories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty_cache")).unwrap();
        fs::write(dir.path().join("a.tmp"), "12345").unwrap();

        let engine = engine(vec![
            category("temp_files", vec![dir.path().join("*.tmp").display().to_string()]),
            category("empty", vec![dir.path().join("empty_cache").display().to_string()]),
            category("missing", vec![dir.path().join("nowhere").display().to_string()]),
        ]);
        let report = engine.find_junk().await;
        assert_eq!(report.len(), 1);
        assert_eq!(report.get("temp_files").unwrap().size, 5);
    }

    #[tokio::test]
    async fn cleanup_deletes_only_approved_categories() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&logs).unwrap();
        fs::create_dir_all(cache.join("nested")).unwrap();
        fs::write(logs.join("a.log"), "aaaa").unwrap();
        fs::write(logs.join("keep.txt"), "keep").unwrap();
        fs::write(cache.join("nested").join("blob"), "bbbbbb").unwrap();
        fs::write(cache.join("index"), "cc").unwrap();

        let engine = engine(vec![
            category("logs", vec![logs.join("*.log").display().to_string()]),
            category("cache", vec![cache.display().to_string()]),
        ]);
        let report = engine.find_junk().await;
        assert_eq!(report.len(), 2);

        let mut plan = clean(&["cache"]);
        plan.insert("logs".to_string(), CleanupDecision::KEEP);
        let summary = engine.perform_cleanup(&report, &plan).await.unwrap();

        assert!(logs.join("a.log").exists());
        assert!(cache.is_dir(), "directory itself must survive");
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
        assert_eq!(summary.cleaned_size_bytes, 8);
        assert_eq!(summary.deleted_files_count, 2);
        assert_eq!(summary.errors, 0);
    }

    #[tokio::test]
    async fn already_deleted_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.tmp"), "xx").unwrap();
        fs::write(dir.path().join("y.tmp"), "yyy").unwrap();
        let engine = engine(vec![category(
            "temp",
            vec![dir.path().join("*.tmp").display().to_string()],
        )]);
        let report = engine.find_junk().await;
        fs::remove_file(dir.path().join("x.tmp")).unwrap();

        let summary = engine.perform_cleanup(&report, &clean(&["temp"])).await.unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.deleted_files_count, 1);
        assert_eq!(summary.cleaned_size_bytes, 3);
    }

    #[tokio::test]
    async fn cleanup_reclaims_marker_only_dirs_under_touched_parents() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        fs::create_dir_all(downloads.join("sub")).unwrap();
        fs::create_dir_all(downloads.join("tmp")).unwrap();
        fs::create_dir_all(downloads.join("photos")).unwrap();
        fs::write(downloads.join("sub").join("Thumbs.db"), "t").unwrap();
        fs::write(downloads.join("photos").join("cat.jpg"), "jpg").unwrap();
        fs::write(downloads.join("setup.tmp"), "12345").unwrap();

        let engine = engine(vec![category(
            "temp",
            vec![downloads.join("*.tmp").display().to_string()],
        )]);
        let report = engine.find_junk().await;
        let summary = engine.perform_cleanup(&report, &clean(&["temp"])).await.unwrap();

        assert_eq!(summary.deleted_files_count, 1);
        assert_eq!(summary.removed_dirs, 1);
        assert!(!downloads.join("setup.tmp").exists());
        assert!(!downloads.join("sub").exists());
        assert!(downloads.join("tmp").is_dir());
        assert!(downloads.join("photos").join("cat.jpg").exists());
        assert!(downloads.is_dir());
    }

    #[tokio::test]
    async fn cleanup_refuses_protected_files_in_a_forged_report() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tool.exe");
        fs::write(&exe, "MZ").unwrap();
        let mut report = JunkReport::default();
        report.categories.insert(
            "forged".to_string(),
            CategoryFindings {
                category_id: "forged".to_string(),
                size: 2,
                count: 1,
                files_to_delete: vec![exe.display().to_string()],
                ..CategoryFindings::default()
            },
        );

        let summary = engine(vec![]).perform_cleanup(&report, &clean(&["forged"])).await.unwrap();
        assert!(exe.exists());
        assert_eq!(summary.deleted_files_count, 0);
    }

    #[tokio::test]
    async fn reclaim_pass_removes_empty_dirs_under_roots() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("stale").join("deeper")).unwrap();
        fs::create_dir_all(root.path().join("tmp")).unwrap();

        let summary = engine(vec![])
            .reclaim_empty_dirs(vec![root.path().to_path_buf()])
            .await
            .unwrap();
        assert_eq!(summary.removed_dirs, 2);
        assert!(!root.path().join("stale").exists());
        assert!(root.path().join("tmp").exists());
    }

    /// 所有删除都失败的文件系统
    struct ReadOnlyFs;

    impl FileSystem for ReadOnlyFs {
        fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
            LocalFileSystem.list_dir(path)
        }
        fn stat(&self, path: &Path) -> io::Result<EntryInfo> {
            LocalFileSystem.stat(path)
        }
        fn remove_file(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn remove_dir_all(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn remove_dir(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn per_file_failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.tmp", "b.tmp", "c.tmp"] {
            fs::write(dir.path().join(name), "z").unwrap();
        }
        let engine = CleanupEngine::new(
            Arc::new(ReadOnlyFs),
            vec![category("temp", vec![dir.path().join("*.tmp").display().to_string()])],
        );
        let report = engine.find_junk().await;
        let summary = engine.perform_cleanup(&report, &clean(&["temp"])).await.unwrap();
        assert_eq!(summary.errors, 3);
        assert_eq!(summary.deleted_files_count, 0);
    }
}
