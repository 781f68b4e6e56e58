//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 订阅者，级别来自 `LEXIQUERY_LOG_LEVEL`。

use tracing::Level;

use crate::env::{core, EnvVar};

/// 解析日志级别，无效值退回 info
pub fn log_level() -> Level {
    match core::LogLevel::get().as_deref() {
        Ok("trace") => Level::TRACE,
        Ok("debug") => Level::DEBUG,
        Ok("warn") => Level::WARN,
        Ok("error") => Level::ERROR,
        _ => Level::INFO,
    }
}

/// 安装全局订阅者，重复调用时忽略
#[cfg(feature = "logging")]
pub fn init() {
    let no_color = core::NoColor::get().unwrap_or(false);

    let result = tracing_subscriber::fmt()
        .with_max_level(log_level())
        .with_ansi(!no_color)
        .with_target(true)
        .try_init();

    if result.is_err() {
        tracing::debug!("日志订阅者已存在，跳过初始化");
    }
}
