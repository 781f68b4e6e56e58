//! # Lexiquery Library
//!
//! 词典与机器翻译的查询调度核心：多检测器共识确定源语言，并发调度所有启用的提供者，
//! 把陆续到达的结果合并成稳定、可取消、有序的展示列表。
//!
//! ## 模块组织
//!
//! - `lookup` - 语言检测、会话调度与结果聚合
//! - `env` - 类型化的环境变量
//! - `logging` - 日志初始化

pub mod env;
pub mod logging;
pub mod lookup;

// Re-export commonly used items for convenience
pub use lookup::{
    ConfigManager, DetectedLangModel, DisplaySnapshot, LookupConfig, LookupError, LookupResult,
    QueryObserver, QueryOrchestrator, QueryType, QueryWordInfo, SessionHandle,
};
