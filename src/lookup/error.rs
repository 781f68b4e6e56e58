//! 查询模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 查询错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// 提供者不支持该语言对，调度层视为空结果
    #[error("{provider} 不支持语言对 {from} -> {to}")]
    UnsupportedLanguage {
        provider: String,
        from: String,
        to: String,
    },

    /// 请求频率受限
    #[error("{provider} 请求频率受限")]
    RateLimited { provider: String },

    /// 提供者调用失败（网络、解析等）
    #[error("{provider} 查询失败: {message}")]
    ProviderFailure { provider: String, message: String },

    /// 语言检测器失败
    #[error("语言检测器 {detector} 失败: {message}")]
    DetectorFailure { detector: String, message: String },

    /// 会话已取消
    #[error("查询已取消")]
    Canceled,

    /// 单次调用超时
    #[error("{provider} 调用超时 ({elapsed_ms}ms)")]
    Timeout { provider: String, elapsed_ms: u64 },

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl LookupError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::RateLimited { .. } => true,
            LookupError::Timeout { .. } => true,
            LookupError::ProviderFailure { .. } => true,
            LookupError::DetectorFailure { .. } => true,
            LookupError::UnsupportedLanguage { .. } => false,
            LookupError::Canceled => false,
            LookupError::ConfigError(_) => false,
            LookupError::ParseError(_) => false,
            LookupError::SerializationError(_) => false,
            LookupError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LookupError::UnsupportedLanguage { .. } => ErrorSeverity::Info,
            LookupError::Canceled => ErrorSeverity::Info,
            LookupError::DetectorFailure { .. } => ErrorSeverity::Info,
            LookupError::RateLimited { .. } => ErrorSeverity::Warning,
            LookupError::Timeout { .. } => ErrorSeverity::Warning,
            LookupError::ProviderFailure { .. } => ErrorSeverity::Warning,
            LookupError::ParseError(_) => ErrorSeverity::Error,
            LookupError::SerializationError(_) => ErrorSeverity::Error,
            LookupError::ConfigError(_) => ErrorSeverity::Critical,
            LookupError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            LookupError::UnsupportedLanguage { .. } => ErrorCategory::Language,
            LookupError::RateLimited { .. } => ErrorCategory::RateLimit,
            LookupError::ProviderFailure { .. } => ErrorCategory::Provider,
            LookupError::DetectorFailure { .. } => ErrorCategory::Detection,
            LookupError::Canceled => ErrorCategory::Cancellation,
            LookupError::Timeout { .. } => ErrorCategory::Timeout,
            LookupError::ConfigError(_) => ErrorCategory::Configuration,
            LookupError::ParseError(_) => ErrorCategory::Parsing,
            LookupError::SerializationError(_) => ErrorCategory::Serialization,
            LookupError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 错误关联的提供者名称
    pub fn provider(&self) -> Option<&str> {
        match self {
            LookupError::UnsupportedLanguage { provider, .. }
            | LookupError::RateLimited { provider }
            | LookupError::ProviderFailure { provider, .. }
            | LookupError::Timeout { provider, .. } => Some(provider),
            LookupError::DetectorFailure { detector, .. } => Some(detector),
            _ => None,
        }
    }

    /// 是否需要通知用户
    ///
    /// 取消与不支持的语言对静默处理，检测器失败只影响投票。
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            LookupError::Canceled
                | LookupError::UnsupportedLanguage { .. }
                | LookupError::DetectorFailure { .. }
        )
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        match &mut self {
            LookupError::ProviderFailure { message, .. }
            | LookupError::DetectorFailure { message, .. } => {
                *message = format!("{} (上下文: {})", message, context);
            }
            LookupError::ConfigError(msg)
            | LookupError::ParseError(msg)
            | LookupError::SerializationError(msg)
            | LookupError::InternalError(msg) => {
                *msg = format!("{} (上下文: {})", msg, context);
            }
            _ => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Language,
    RateLimit,
    Provider,
    Detection,
    Cancellation,
    Timeout,
    Configuration,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for LookupError {
    fn from(error: std::io::Error) -> Self {
        LookupError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(error: serde_json::Error) -> Self {
        LookupError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for LookupError {
    fn from(error: toml::de::Error) -> Self {
        LookupError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<toml::ser::Error> for LookupError {
    fn from(error: toml::ser::Error) -> Self {
        LookupError::SerializationError(format!("TOML序列化错误: {}", error))
    }
}

impl From<config::ConfigError> for LookupError {
    fn from(error: config::ConfigError) -> Self {
        LookupError::ConfigError(error.to_string())
    }
}

impl From<crate::env::EnvError> for LookupError {
    fn from(error: crate::env::EnvError) -> Self {
        LookupError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type LookupResult<T> = Result<T, LookupError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub user_visible_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &LookupError) {
        self.total_errors += 1;

        *self.by_category.entry(error.category()).or_insert(0) += 1;
        *self.by_severity.entry(error.severity()).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if error.is_user_visible() {
            self.user_visible_errors += 1;
        }
    }

    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &LookupError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::debug!("查询信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("查询警告: {}", error),
            ErrorSeverity::Error => tracing::error!("查询错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("查询严重错误: {}", error),
        }
    }

    /// 创建提供者失败错误
    pub fn provider_failure<P: fmt::Display, T: fmt::Display>(provider: P, msg: T) -> LookupError {
        LookupError::ProviderFailure {
            provider: provider.to_string(),
            message: msg.to_string(),
        }
    }

    /// 创建检测器失败错误
    pub fn detector_failure<D: fmt::Display, T: fmt::Display>(detector: D, msg: T) -> LookupError {
        LookupError::DetectorFailure {
            detector: detector.to_string(),
            message: msg.to_string(),
        }
    }

    pub fn rate_limited<P: fmt::Display>(provider: P) -> LookupError {
        LookupError::RateLimited {
            provider: provider.to_string(),
        }
    }

    pub fn unsupported_language<P: fmt::Display>(provider: P, from: &str, to: &str) -> LookupError {
        LookupError::UnsupportedLanguage {
            provider: provider.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> LookupError {
        LookupError::ConfigError(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> LookupError {
        LookupError::InternalError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let limited = helpers::rate_limited("Bing Translate");
        assert!(limited.is_retryable());
        assert_eq!(limited.category(), ErrorCategory::RateLimit);
        assert_eq!(limited.provider(), Some("Bing Translate"));

        assert!(!LookupError::Canceled.is_user_visible());
        assert!(!helpers::unsupported_language("DeepL Translate", "en", "th").is_user_visible());
        assert!(helpers::provider_failure("Google Translate", "502").is_user_visible());

        let timeout = LookupError::Timeout {
            provider: "Apple Translate".to_string(),
            elapsed_ms: 10_000,
        };
        assert_ne!(timeout, LookupError::Canceled);
        assert_eq!(timeout.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_with_context() {
        let error = helpers::provider_failure("Caiyun Translate", "HTTP 500").with_context("第二次尝试");
        assert!(error.to_string().contains("第二次尝试"));

        // 无消息字段的变体保持不变
        assert_eq!(LookupError::Canceled.with_context("忽略"), LookupError::Canceled);
    }

    #[test]
    fn test_error_stats() {
        let mut stats = ErrorStats::default();
        stats.record_error(&helpers::rate_limited("Bing Translate"));
        stats.record_error(&LookupError::Canceled);
        stats.record_error(&helpers::config_error("缺少语言"));

        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.retryable_errors, 1);
        assert_eq!(stats.user_visible_errors, 2);
        assert_eq!(stats.by_severity.get(&ErrorSeverity::Critical), Some(&1));
        assert!((stats.error_rate(6) - 0.5).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.total_errors, 0);
    }
}
