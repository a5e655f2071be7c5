use std::path::PathBuf;

/// 展开路径中的 `~`、`$VAR`、`${VAR}` 与 `%VAR%`；未定义的变量保持原样
pub fn expand_path(input: &str) -> PathBuf {
    let s = input.trim();
    let s = match s.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            match home_dir() {
                Some(home) => format!("{}{}", home.display(), rest),
                None => s.to_string(),
            }
        }
        _ => s.to_string(),
    };
    #[cfg(windows)]
    let s = s.replace('/', "\\");
    PathBuf::from(expand_env_vars(&s))
}

fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                match std::env::var(&name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        result.push_str("${");
                        result.push_str(&name);
                        result.push('}');
                    }
                }
            }
            '$' if chars.peek().is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match std::env::var(&name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        result.push('$');
                        result.push_str(&name);
                    }
                }
            }
            '%' => {
                let rest: String = chars.clone().collect();
                match rest.find('%') {
                    Some(end) if end > 0 => {
                        let name = &rest[..end];
                        match std::env::var(name) {
                            Ok(value) => {
                                result.push_str(&value);
                                for _ in 0..=name.chars().count() {
                                    chars.next();
                                }
                            }
                            Err(_) => result.push('%'),
                        }
                    }
                    _ => result.push('%'),
                }
            }
            _ => result.push(ch),
        }
    }
    result
}

/// 当前用户主目录
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// 默认的空目录回收根：系统临时目录与用户缓存目录
pub fn default_reclaim_roots() -> Vec<PathBuf> {
    let mut roots = vec![std::env::temp_dir()];
    #[cfg(windows)]
    if let Some(local) = std::env::var_os("LOCALAPPDATA") {
        roots.push(PathBuf::from(local).join("Temp"));
    }
    #[cfg(not(windows))]
    {
        if let Some(cache) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
            roots.push(PathBuf::from(cache));
        } else if let Some(home) = home_dir() {
            roots.push(home.join(".cache"));
        }
    }
    roots.dedup();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_and_bare_vars() {
        std::env::set_var("AI_OPT_TEST_ROOT", "/data/root");
        assert_eq!(
            expand_path("${AI_OPT_TEST_ROOT}/cache"),
            PathBuf::from("/data/root/cache")
        );
        assert_eq!(
            expand_path("$AI_OPT_TEST_ROOT/logs"),
            PathBuf::from("/data/root/logs")
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn expands_percent_vars() {
        std::env::set_var("AI_OPT_TEST_PCT", "/pct");
        assert_eq!(expand_path("%AI_OPT_TEST_PCT%/x"), PathBuf::from("/pct/x"));
    }

    #[test]
    fn unknown_vars_are_left_alone() {
        let p = expand_path("${AI_OPT_SURELY_UNDEFINED_VAR}/x");
        assert!(p.to_string_lossy().contains("AI_OPT_SURELY_UNDEFINED_VAR"));
        let p = expand_path("100%/done");
        assert!(p.to_string_lossy().contains("100%"));
    }

    #[test]
    fn trims_whitespace() {
        let expected = if cfg!(windows) { "\\a\\b" } else { "/a/b" };
        assert_eq!(expand_path("  /a/b  "), PathBuf::from(expected));
    }
}
