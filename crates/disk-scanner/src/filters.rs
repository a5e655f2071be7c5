use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

/// 无论掩码是否匹配都不会删除的扩展名（可执行文件、脚本、库）
pub const PROTECTED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "sys", "msi", "bat", "cmd", "ps1", "vbs", "sh", "so", "dylib", "com", "scr",
    "drv",
];

/// 判断目录是否为空时忽略的惰性标记文件
pub const INERT_MARKER_FILES: &[&str] = &["thumbs.db", "desktop.ini", ".ds_store", ".localized"];

/// 即使为空也不会删除的系统目录名
pub const PROTECTED_DIR_NAMES: &[&str] = &[
    "windows",
    "system32",
    "syswow64",
    "program files",
    "program files (x86)",
    "programdata",
    "appdata",
    "local",
    "roaming",
    "locallow",
    "users",
    "temp",
    "tmp",
    ".cache",
    ".config",
    ".local",
    "home",
    "etc",
    "usr",
    "var",
    "bin",
    "lib",
];

pub fn is_protected_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            PROTECTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

pub fn is_inert_marker(name: &str) -> bool {
    INERT_MARKER_FILES.contains(&name.to_ascii_lowercase().as_str())
}

pub fn is_protected_dir(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => PROTECTED_DIR_NAMES.contains(&name.to_ascii_lowercase().as_str()),
        // 根目录、盘符等没有文件名的路径一律保护
        None => true,
    }
}

fn contains_mask(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// 文件名掩码（大小写不敏感）
#[derive(Debug, Clone)]
pub struct FileMask {
    pattern: String,
    matcher: GlobMatcher,
}

impl FileMask {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("invalid mask '{}': {}", pattern, e))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// 配置路径的两种形态
#[derive(Debug, Clone)]
pub enum PathSpec {
    /// 在父目录中按文件名掩码搜索
    Masked { parent: PathBuf, mask: FileMask },
    /// 整体测量的目录
    Directory(PathBuf),
}

impl PathSpec {
    /// 只支持最后一级含通配符；父目录含通配符视为非法配置
    pub fn parse(path: &Path) -> Result<Self, String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if contains_mask(&parent.to_string_lossy()) {
            return Err(format!(
                "wildcards are only supported in the last path component: {}",
                path.display()
            ));
        }
        if contains_mask(&name) {
            Ok(PathSpec::Masked {
                parent,
                mask: FileMask::new(&name)?,
            })
        } else {
            Ok(PathSpec::Directory(path.to_path_buf()))
        }
    }
}
