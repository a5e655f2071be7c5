//! 日志初始化。
//!
//! 全部 crate 只使用 `log` 宏；二进制入口调用一次 [`init_logging`]。
//! `RUST_LOG` 优先于传入的默认级别。

use std::io::Write;

/// 初始化 env_logger，输出到 stderr，每行带 `[ai-optimizer]` 前缀
pub fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[ai-optimizer] {} {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
