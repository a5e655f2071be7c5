use std::io;
use std::path::Path;

use ai_optimizer_domain::CleanupSummary;

use crate::filters::{is_inert_marker, is_protected_dir};
use crate::fs::FileSystem;

const MAX_DEPTH: usize = 32;

/// 自底向上删除 `root` 之下实际为空的目录（`root` 本身保留）。
///
/// 只含惰性标记文件的目录视为空；受保护的系统目录名永不删除。
pub fn reclaim_under(fs: &dyn FileSystem, root: &Path, summary: &mut CleanupSummary) {
    match fs.stat(root) {
        Ok(info) if info.is_dir => {
            reclaim_dir(fs, root, 0, summary);
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::debug!("cannot inspect {}: {}", root.display(), e),
    }
}

/// 返回目录在处理后是否只剩标记文件
fn reclaim_dir(
    fs: &dyn FileSystem,
    dir: &Path,
    depth: usize,
    summary: &mut CleanupSummary,
) -> bool {
    if depth >= MAX_DEPTH {
        return false;
    }
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("cannot read {}: {}", dir.display(), e);
            return false;
        }
    };

    let mut effectively_empty = true;
    for entry in entries {
        if !entry.is_dir {
            if !is_inert_marker(&entry.name) {
                effectively_empty = false;
            }
            continue;
        }
        let child_empty = reclaim_dir(fs, &entry.path, depth + 1, summary);
        if child_empty
            && !is_protected_dir(&entry.path)
            && remove_empty_dir(fs, &entry.path, summary)
        {
            continue;
        }
        effectively_empty = false;
    }
    effectively_empty
}

/// 先删掉标记文件再删目录；成功时计入 removed_dirs
fn remove_empty_dir(fs: &dyn FileSystem, dir: &Path, summary: &mut CleanupSummary) -> bool {
    let entries = match fs.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
        Err(_) => return false,
    };
    for marker in entries.iter().filter(|e| !e.is_dir) {
        match fs.remove_file(&marker.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!("failed to remove marker {}: {}", marker.path.display(), e);
                summary.errors += 1;
                return false;
            }
        }
    }
    match fs.remove_dir(dir) {
        Ok(()) => {
            log::debug!("removed empty directory {}", dir.display());
            summary.removed_dirs += 1;
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            log::warn!("failed to remove empty directory {}: {}", dir.display(), e);
            summary.errors += 1;
            false
        }
    }
}
