//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::EnvConfig;
use crate::lookup::error::{LookupError, LookupResult};
use crate::lookup::language;
use crate::lookup::types::{DetectorKind, DictionaryType, QueryType, TranslationType};

/// 查询偏好配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    // 偏好语言
    pub language1: String,
    pub language2: String,

    // 行为开关
    pub speed_first: bool,
    pub enable_system_proxy: bool,
    pub auto_play_word_audio: bool,
    pub collapse_translations_with_dictionary: bool,

    // 排序覆盖，未列出的提供者保持默认相对顺序
    pub dictionary_order: Vec<String>,
    pub translation_order: Vec<String>,

    // 调度配置
    pub debounce_delay_ms: u64,
    pub proxy_delay_ms: u64,
    pub native_delay_offset_ms: u64,
    pub call_timeout_secs: u64,
    pub max_rate_limit_retries: usize,

    // 语言检测配置
    pub detection_timeout_ms: u64,
    pub high_confidence: f64,
    pub low_confidence: f64,
    pub confirm_agreement: usize,
    pub authoritative_detector: String,
    pub accurate_detector: String,
    pub fast_detector: String,

    // 详情模式阈值
    pub chinese_detail_threshold: usize,
    pub latin_detail_threshold: usize,
    pub other_detail_threshold: usize,

    // 缓存与发音
    pub proxy_cache_ttl_secs: u64,
    pub audio_provider: String,

    /// 提供者开关，缺省为启用
    pub provider_switches: BTreeMap<String, bool>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            language1: constants::DEFAULT_LANGUAGE1.to_string(),
            language2: constants::DEFAULT_LANGUAGE2.to_string(),

            speed_first: true,
            enable_system_proxy: false,
            auto_play_word_audio: false,
            collapse_translations_with_dictionary: true,

            dictionary_order: Vec::new(),
            translation_order: Vec::new(),

            debounce_delay_ms: millis(constants::DEFAULT_DEBOUNCE_DELAY),
            proxy_delay_ms: millis(constants::DEFAULT_PROXY_DELAY),
            native_delay_offset_ms: millis(constants::DEFAULT_NATIVE_DELAY_OFFSET),
            call_timeout_secs: constants::DEFAULT_CALL_TIMEOUT.as_secs(),
            max_rate_limit_retries: constants::MAX_RATE_LIMIT_RETRIES,

            detection_timeout_ms: millis(constants::DEFAULT_DETECTION_TIMEOUT),
            high_confidence: constants::HIGH_CONFIDENCE,
            low_confidence: constants::LOW_CONFIDENCE,
            confirm_agreement: constants::CONFIRM_AGREEMENT,
            authoritative_detector: constants::AUTHORITATIVE_DETECTOR.to_string(),
            accurate_detector: constants::ACCURATE_DETECTOR.to_string(),
            fast_detector: constants::FAST_DETECTOR.to_string(),

            chinese_detail_threshold: constants::CHINESE_DETAIL_THRESHOLD,
            latin_detail_threshold: constants::LATIN_DETAIL_THRESHOLD,
            other_detail_threshold: constants::OTHER_DETAIL_THRESHOLD,

            proxy_cache_ttl_secs: constants::DEFAULT_PROXY_CACHE_TTL.as_secs(),
            audio_provider: constants::AUDIO_PROVIDER.to_string(),

            provider_switches: BTreeMap::new(),
        }
    }
}

impl LookupConfig {
    /// 创建带指定偏好语言的默认配置
    pub fn with_languages(language1: &str, language2: &str) -> Self {
        Self {
            language1: language1.to_string(),
            language2: language2.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> LookupResult<()> {
        for lang in [&self.language1, &self.language2] {
            if !language::is_valid_language_code(lang) {
                return Err(LookupError::ConfigError(format!("不支持的偏好语言: {}", lang)));
            }
        }

        if self.language1 == self.language2 {
            return Err(LookupError::ConfigError("两个偏好语言不能相同".to_string()));
        }

        if !(0.0..=1.0).contains(&self.low_confidence)
            || !(0.0..=1.0).contains(&self.high_confidence)
            || self.low_confidence > self.high_confidence
        {
            return Err(LookupError::ConfigError(format!(
                "置信度阈值无效: low={}, high={}",
                self.low_confidence, self.high_confidence
            )));
        }

        if self.confirm_agreement == 0 {
            return Err(LookupError::ConfigError("确认所需的一致检测数不能为0".to_string()));
        }

        if self.call_timeout_secs == 0 || self.detection_timeout_ms == 0 {
            return Err(LookupError::ConfigError("超时时间必须大于0".to_string()));
        }

        if self.chinese_detail_threshold == 0
            || self.latin_detail_threshold == 0
            || self.other_detail_threshold == 0
        {
            return Err(LookupError::ConfigError("详情阈值必须大于0".to_string()));
        }

        for name in [&self.authoritative_detector, &self.accurate_detector, &self.fast_detector] {
            name.parse::<TranslationType>()
                .map_err(|e| e.with_context("检测器配置"))?;
        }

        self.audio_query_type()?;

        Ok(())
    }

    /// 应用环境变量覆盖（使用类型安全环境变量系统）
    ///
    /// 设置但无效的变量作为配置错误返回。
    pub fn apply_env_overrides(&mut self) -> LookupResult<()> {
        let env = EnvConfig::from_env()?;
        self.apply_env_config(&env);
        Ok(())
    }

    pub fn apply_env_config(&mut self, env: &EnvConfig) {
        if let Some(language1) = &env.language1 {
            self.language1 = language1.clone();
        }
        if let Some(language2) = &env.language2 {
            self.language2 = language2.clone();
        }
        if let Some(speed_first) = env.speed_first {
            self.speed_first = speed_first;
        }
        if let Some(system_proxy) = env.system_proxy {
            self.enable_system_proxy = system_proxy;
        }
        if let Some(auto_play) = env.auto_play_audio {
            self.auto_play_word_audio = auto_play;
        }
        if let Some(delay) = env.proxy_delay {
            self.proxy_delay_ms = millis(delay);
        }
        if let Some(timeout) = env.call_timeout {
            self.call_timeout_secs = timeout.as_secs();
        }
        for name in &env.disabled_providers {
            tracing::info!("环境变量禁用提供者: {}", name);
            self.provider_switches.insert(name.clone(), false);
        }

        if let Some(agreement) = env.confirm_agreement {
            self.confirm_agreement = agreement;
        }
        if let Some(timeout) = env.detection_timeout {
            self.detection_timeout_ms = millis(timeout);
        }
    }

    // ------------------------------------------------------------------------
    // 偏好语言
    // ------------------------------------------------------------------------

    pub fn preferred_languages(&self) -> [&str; 2] {
        [self.language1.as_str(), self.language2.as_str()]
    }

    pub fn is_preferred(&self, code: &str) -> bool {
        self.language1 == code || self.language2 == code
    }

    /// 源语言对应的另一个偏好语言
    pub fn other_preferred(&self, code: &str) -> &str {
        if code == self.language1 {
            &self.language2
        } else {
            &self.language1
        }
    }

    // ------------------------------------------------------------------------
    // 提供者
    // ------------------------------------------------------------------------

    /// 提供者是否启用，未配置的默认启用
    pub fn is_enabled(&self, query_type: QueryType) -> bool {
        self.provider_switches
            .iter()
            .find(|(name, _)| name.parse::<QueryType>().ok() == Some(query_type))
            .map(|(_, enabled)| *enabled)
            .unwrap_or(true)
    }

    pub fn set_enabled(&mut self, query_type: QueryType, enabled: bool) {
        let key = match query_type {
            QueryType::Dictionary(d) => format!("{:?}_dict", d).to_lowercase(),
            QueryType::Translation(t) => format!("{:?}", t).to_lowercase(),
        };
        self.provider_switches.insert(key, enabled);
    }

    /// 词典的有效排序：用户覆盖在前，其余保持默认顺序
    pub fn dictionary_priority(&self) -> Vec<DictionaryType> {
        effective_order(&self.dictionary_order, &DictionaryType::ALL)
    }

    /// 翻译服务的有效排序
    pub fn translation_priority(&self) -> Vec<TranslationType> {
        effective_order(&self.translation_order, &TranslationType::ALL)
    }

    pub fn authoritative_detector(&self) -> Option<DetectorKind> {
        self.authoritative_detector.parse().ok().map(DetectorKind::Service)
    }

    pub fn accurate_detector(&self) -> Option<DetectorKind> {
        self.accurate_detector.parse().ok().map(DetectorKind::Service)
    }

    pub fn fast_detector(&self) -> Option<DetectorKind> {
        self.fast_detector.parse().ok().map(DetectorKind::Service)
    }

    pub fn audio_query_type(&self) -> LookupResult<QueryType> {
        let query_type: QueryType = self.audio_provider.parse()?;
        if !query_type.is_dictionary() {
            return Err(LookupError::ConfigError(format!(
                "发音提供者必须是词典: {}",
                self.audio_provider
            )));
        }
        Ok(query_type)
    }

    // ------------------------------------------------------------------------
    // 转换为Duration类型
    // ------------------------------------------------------------------------

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn proxy_delay(&self) -> Duration {
        Duration::from_millis(self.proxy_delay_ms)
    }

    pub fn native_delay(&self) -> Duration {
        Duration::from_millis(self.proxy_delay_ms + self.native_delay_offset_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }

    pub fn proxy_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.proxy_cache_ttl_secs)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn effective_order<T>(overrides: &[String], defaults: &[T]) -> Vec<T>
where
    T: Copy + PartialEq + std::str::FromStr,
{
    let mut order: Vec<T> = Vec::with_capacity(defaults.len());
    for name in overrides {
        match name.parse::<T>() {
            Ok(value) if !order.contains(&value) => order.push(value),
            Ok(_) => {}
            Err(_) => tracing::debug!("忽略未知的排序项: {}", name),
        }
    }
    for value in defaults {
        if !order.contains(value) {
            order.push(*value);
        }
    }
    order
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: LookupConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> LookupResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建，仍然应用环境变量覆盖
    pub fn from_file(path: &str) -> LookupResult<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn into_config(self) -> LookupConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> LookupResult<LookupConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(LookupConfig::default())
    }

    /// 从指定文件加载配置，格式由扩展名决定（TOML 或 JSON）
    fn load_from_file(path: &str) -> LookupResult<LookupConfig> {
        let expanded_path = shellexpand::tilde(path);
        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(expanded_path.as_ref())).required(true))
            .build()
            .map_err(|e| LookupError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        settings
            .try_deserialize::<LookupConfig>()
            .map_err(|e| LookupError::ConfigError(format!("解析配置失败: {}", e)))
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> LookupResult<()> {
        let config = LookupConfig::default();
        let content = toml::to_string_pretty(&config)?;

        std::fs::write(path, content)
            .map_err(|e| LookupError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
