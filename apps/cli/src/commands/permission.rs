/// 检测当前进程是否以管理员权限运行（Windows）
pub fn has_admin_permission() -> bool {
    #[cfg(windows)]
    {
        is_elevated::is_elevated()
    }

    #[cfg(not(windows))]
    {
        true
    }
}

pub fn warn_if_not_elevated() {
    if !has_admin_permission() {
        log::warn!(
            "not running as administrator: service changes and restore points will likely fail"
        );
    }
}
