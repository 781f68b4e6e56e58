//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。查询相关变量没有默认值，
//! 未设置时不会覆盖配置文件中的值。

use std::env;
use std::fmt;
use std::time::Duration;

use crate::lookup::language;
use crate::lookup::types::QueryType;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LEXIQUERY_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 查询相关环境变量
pub mod lookup {
    use super::*;

    /// 第一偏好语言
    pub struct Language1;
    impl EnvVar<String> for Language1 {
        const NAME: &'static str = "LEXIQUERY_LANGUAGE1";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "First preferred language (e.g. zh-CHS, en, ja)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME)
        }
    }

    /// 第二偏好语言
    pub struct Language2;
    impl EnvVar<String> for Language2 {
        const NAME: &'static str = "LEXIQUERY_LANGUAGE2";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Second preferred language (e.g. en)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME)
        }
    }

    /// 速度优先
    pub struct SpeedFirst;
    impl EnvVar<bool> for SpeedFirst {
        const NAME: &'static str = "LEXIQUERY_SPEED_FIRST";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str =
            "Confirm the first detected preferred language without waiting for agreement";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 系统代理直连
    pub struct SystemProxy;
    impl EnvVar<bool> for SystemProxy {
        const NAME: &'static str = "LEXIQUERY_SYSTEM_PROXY";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Skip the proxy delay for providers that need a proxy";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 自动播放单词发音
    pub struct AutoPlayAudio;
    impl EnvVar<bool> for AutoPlayAudio {
        const NAME: &'static str = "LEXIQUERY_AUTO_PLAY_AUDIO";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Play word pronunciation automatically for English words";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 代理延迟
    pub struct ProxyDelay;
    impl EnvVar<Duration> for ProxyDelay {
        const NAME: &'static str = "LEXIQUERY_PROXY_DELAY_MS";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Delay before dispatching proxy-bound providers, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 0, 10_000)
        }
    }

    /// 单次调用超时
    pub struct CallTimeout;
    impl EnvVar<Duration> for CallTimeout {
        const NAME: &'static str = "LEXIQUERY_CALL_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Timeout of a single provider call in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 120)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }

    /// 禁用的提供者列表
    pub struct DisabledProviders;
    impl EnvVar<Vec<String>> for DisabledProviders {
        const NAME: &'static str = "LEXIQUERY_DISABLED_PROVIDERS";
        const DEFAULT: Option<Vec<String>> = None;
        const DESCRIPTION: &'static str =
            "Comma-separated provider names to disable (e.g. openai,youdao_dict)";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            value
                .split(',')
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(|name| {
                    name.parse::<QueryType>()
                        .map(|_| name.to_string())
                        .map_err(|_| EnvError {
                            variable: Self::NAME.to_string(),
                            message: format!("Unknown provider '{}'", name),
                        })
                })
                .collect()
        }
    }
}

/// 语言检测相关环境变量
pub mod detection {
    use super::*;

    /// 确认所需的一致检测数
    pub struct ConfirmAgreement;
    impl EnvVar<usize> for ConfirmAgreement {
        const NAME: &'static str = "LEXIQUERY_DETECT_CONFIRM_AGREEMENT";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Number of agreeing detectors needed to confirm a language";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 5)
        }
    }

    /// 检测总超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "LEXIQUERY_DETECT_TIMEOUT_MS";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Overall language detection timeout in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 100, 30_000)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_millis(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<Duration> {
    let millis: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid number of milliseconds".to_string(),
    })?;

    if !(min..=max).contains(&millis) {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} out of range {}..={}", millis, min, max),
        });
    }

    Ok(Duration::from_millis(millis))
}

fn parse_language(value: &str, var_name: &str) -> EnvResult<String> {
    language::canonicalize(value)
        .map(str::to_string)
        .ok_or_else(|| EnvError {
            variable: var_name.to_string(),
            message: format!("Unsupported language '{}'", value),
        })
}

/// 查询相关的环境变量覆盖
///
/// 未设置的变量为 `None`，不覆盖配置文件。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub language1: Option<String>,
    pub language2: Option<String>,
    pub speed_first: Option<bool>,
    pub system_proxy: Option<bool>,
    pub auto_play_audio: Option<bool>,
    pub proxy_delay: Option<Duration>,
    pub call_timeout: Option<Duration>,
    pub disabled_providers: Vec<String>,

    pub confirm_agreement: Option<usize>,
    pub detection_timeout: Option<Duration>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    ///
    /// 设置但无效的变量返回错误。
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            language1: optional::<lookup::Language1, _>()?,
            language2: optional::<lookup::Language2, _>()?,
            speed_first: optional::<lookup::SpeedFirst, _>()?,
            system_proxy: optional::<lookup::SystemProxy, _>()?,
            auto_play_audio: optional::<lookup::AutoPlayAudio, _>()?,
            proxy_delay: optional::<lookup::ProxyDelay, _>()?,
            call_timeout: optional::<lookup::CallTimeout, _>()?,
            disabled_providers: optional::<lookup::DisabledProviders, _>()?.unwrap_or_default(),

            confirm_agreement: optional::<detection::ConfirmAgreement, _>()?,
            detection_timeout: optional::<detection::Timeout, _>()?,
        })
    }
}

fn optional<V: EnvVar<T>, T>() -> EnvResult<Option<T>> {
    match env::var(V::NAME) {
        Ok(value) => V::parse(&value).map(Some),
        Err(_) => Ok(None),
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!("- `{}`: {}\n", core::LogLevel::NAME, core::LogLevel::DESCRIPTION));
    docs.push_str(&format!("- `{}`: {}\n", core::NoColor::NAME, core::NoColor::DESCRIPTION));

    docs.push_str("\n## Lookup Configuration\n\n");
    for (name, description) in [
        (lookup::Language1::NAME, lookup::Language1::DESCRIPTION),
        (lookup::Language2::NAME, lookup::Language2::DESCRIPTION),
        (lookup::SpeedFirst::NAME, lookup::SpeedFirst::DESCRIPTION),
        (lookup::SystemProxy::NAME, lookup::SystemProxy::DESCRIPTION),
        (lookup::AutoPlayAudio::NAME, lookup::AutoPlayAudio::DESCRIPTION),
        (lookup::ProxyDelay::NAME, lookup::ProxyDelay::DESCRIPTION),
        (lookup::CallTimeout::NAME, lookup::CallTimeout::DESCRIPTION),
        (lookup::DisabledProviders::NAME, lookup::DisabledProviders::DESCRIPTION),
    ] {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs.push_str("\n## Detection Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        detection::ConfirmAgreement::NAME,
        detection::ConfirmAgreement::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        detection::Timeout::NAME,
        detection::Timeout::DESCRIPTION
    ));

    docs
}
