//! 文件系统门面。清理引擎只通过 [`FileSystem`] 访问磁盘。
//!
//! 所有方法都是阻塞调用，调用方负责放到 `spawn_blocking` 中执行。

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 目录项信息（不跟随符号链接）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

pub trait FileSystem: Send + Sync {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>>;
    fn stat(&self, path: &Path) -> io::Result<EntryInfo>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// 递归删除整个目录树
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    /// 删除空目录
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// 基于 `std::fs` 的实现
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

fn entry_info(path: PathBuf, metadata: &std::fs::Metadata) -> EntryInfo {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let is_dir = metadata.file_type().is_dir();
    EntryInfo {
        name,
        is_dir,
        size: if is_dir { 0 } else { metadata.len() },
        modified: metadata.modified().ok(),
        path,
    }
}

impl FileSystem for LocalFileSystem {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let Ok(entry) = entry else { continue };
            // 扫描期间被其它进程删除的条目直接跳过
            let Ok(metadata) = std::fs::symlink_metadata(entry.path()) else {
                continue;
            };
            entries.push(entry_info(entry.path(), &metadata));
        }
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryInfo> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(entry_info(path.to_path_buf(), &metadata))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }
}

/// 演练模式：读操作透传，删除只记录日志并报告成功
pub struct DryRunFileSystem<F: FileSystem> {
    inner: F,
}

impl<F: FileSystem> DryRunFileSystem<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: FileSystem> FileSystem for DryRunFileSystem<F> {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        self.inner.list_dir(path)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryInfo> {
        self.inner.stat(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        log::info!("[dry-run] would delete file {}", path.display());
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        log::info!("[dry-run] would delete tree {}", path.display());
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        log::info!("[dry-run] would remove directory {}", path.display());
        Ok(())
    }
}
