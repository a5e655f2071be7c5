use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use ai_optimizer_common::{expand_path, OptimizerError};
use ai_optimizer_domain::{CategoryFindings, CleanupCategory};
use rayon::prelude::*;

use crate::filters::{is_protected_extension, FileMask, PathSpec};
use crate::fs::FileSystem;

const MAX_DEPTH: usize = 64;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// 并行统计目录树的大小与文件数；读取失败的子树按 0 计
pub fn measure_tree(fs: &dyn FileSystem, path: &Path) -> (u64, u64) {
    measure_tree_at(fs, path, 0)
}

fn measure_tree_at(fs: &dyn FileSystem, path: &Path, depth: usize) -> (u64, u64) {
    if depth >= MAX_DEPTH {
        return (0, 0);
    }
    let entries = match fs.list_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("cannot read {}: {}", path.display(), e);
            return (0, 0);
        }
    };

    // 并行处理子项
    entries
        .par_iter()
        .map(|entry| {
            if entry.is_dir {
                measure_tree_at(fs, &entry.path, depth + 1)
            } else {
                (entry.size, 1)
            }
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
}

fn is_old_enough(
    modified: Option<SystemTime>,
    threshold: Option<Duration>,
    now: SystemTime,
) -> bool {
    let Some(threshold) = threshold else {
        return true;
    };
    match modified {
        Some(modified) => now
            .duration_since(modified)
            .map(|age| age >= threshold)
            .unwrap_or(false),
        None => false,
    }
}

fn mask_search(
    fs: &dyn FileSystem,
    parent: &Path,
    mask: &FileMask,
    threshold: Option<Duration>,
    now: SystemTime,
    findings: &mut CategoryFindings,
) -> Result<(), OptimizerError> {
    let entries = match fs.list_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!(
                "search path {} for mask '{}' does not exist",
                parent.display(),
                mask.pattern()
            );
            return Ok(());
        }
        Err(e) => return Err(OptimizerError::from_io_at(e, parent)),
    };

    for entry in entries {
        if entry.is_dir || !mask.is_match(&entry.name) {
            continue;
        }
        if is_protected_extension(&entry.path) {
            log::debug!("protected file kept: {}", entry.path.display());
            continue;
        }
        if !is_old_enough(entry.modified, threshold, now) {
            continue;
        }
        findings.size += entry.size;
        findings.count += 1;
        findings.files_to_delete.push(entry.path.display().to_string());
    }
    Ok(())
}

fn directory_search(
    fs: &dyn FileSystem,
    dir: &Path,
    findings: &mut CategoryFindings,
) -> Result<(), OptimizerError> {
    match fs.stat(dir) {
        Ok(info) if info.is_dir => {}
        Ok(_) => {
            log::debug!("{} is not a directory, skipped", dir.display());
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("path {} does not exist", dir.display());
            return Ok(());
        }
        Err(e) => return Err(OptimizerError::from_io_at(e, dir)),
    }
    let (size, count) = measure_tree(fs, dir);
    findings.size += size;
    findings.count += count;
    findings.paths_to_clean.push(dir.display().to_string());
    Ok(())
}

/// 扫描单个清理类别（阻塞）
pub fn scan_category(
    fs: &dyn FileSystem,
    category: &CleanupCategory,
    now: SystemTime,
) -> Result<CategoryFindings, OptimizerError> {
    let threshold = category
        .age_threshold_days
        .map(|days| Duration::from_secs(u64::from(days) * SECS_PER_DAY));
    let mut findings = CategoryFindings {
        category_id: category.category_id.clone(),
        description: category.description.clone(),
        ..CategoryFindings::default()
    };

    for raw in &category.paths {
        if raw.trim().is_empty() {
            continue;
        }
        let path = expand_path(raw);
        match PathSpec::parse(&path).map_err(OptimizerError::InvalidPath)? {
            PathSpec::Masked { parent, mask } => {
                mask_search(fs, &parent, &mask, threshold, now, &mut findings)?
            }
            PathSpec::Directory(dir) => directory_search(fs, &dir, &mut findings)?,
        }
    }
    Ok(findings)
}
