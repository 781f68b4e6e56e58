//! 查询配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, LookupConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 偏好语言
    pub const DEFAULT_LANGUAGE1: &str = "zh-CHS";
    pub const DEFAULT_LANGUAGE2: &str = "en";

    // 调度延迟
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(600);
    pub const DEFAULT_PROXY_DELAY: Duration = Duration::from_millis(600);
    pub const DEFAULT_NATIVE_DELAY_OFFSET: Duration = Duration::from_millis(400);
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_RATE_LIMIT_RETRIES: usize = 2;

    // 语言检测
    pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const HIGH_CONFIDENCE: f64 = 0.8;
    pub const LOW_CONFIDENCE: f64 = 0.2;
    pub const CONFIRM_AGREEMENT: usize = 2;
    pub const MIN_REMOTE_DETECTORS: usize = 2;
    pub const AUTHORITATIVE_DETECTOR: &str = "baidu";
    pub const ACCURATE_DETECTOR: &str = "tencent";
    pub const FAST_DETECTOR: &str = "bing";

    // 详情模式阈值（按字符数）
    pub const CHINESE_DETAIL_THRESHOLD: usize = 45;
    pub const LATIN_DETAIL_THRESHOLD: usize = 100;
    pub const OTHER_DETAIL_THRESHOLD: usize = 90;

    // 共享缓存
    pub const DEFAULT_PROXY_CACHE_TTL: Duration = Duration::from_secs(300);

    // 发音
    pub const AUDIO_PROVIDER: &str = "youdao_dict";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "lexiquery.toml",
        ".lexiquery.toml",
        "lexiquery.json",
        "~/.config/lexiquery/config.toml",
        "/etc/lexiquery/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时退回默认配置
pub fn load_lookup_config() -> LookupConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            LookupConfig::default()
        }
    }
}
