//! 查询调度模块
//!
//! 在多个词典和翻译提供者之间并行查询一段文本：
//! - **detection**: 多检测器竞速与共识，得到源语言
//! - **core**: 会话调度器，管理会话的取代与取消、提供者调度
//! - **pipeline**: 结果聚合、排序和详情模式判定
//! - **storage**: 代理、令牌和请求计数等共享缓存
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lexiquery::lookup::{LoggingObserver, LookupConfig, QueryOrchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = QueryOrchestrator::builder(LookupConfig::default())
//!     .observer(Arc::new(LoggingObserver))
//!     .build()?;
//!
//! let snapshot = orchestrator.start_query("good", None).wait().await;
//! println!("{} 个分区", snapshot.sections.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
pub mod config;

/// 会话调度核心
pub mod core;

/// 语言检测
pub mod detection;

/// 错误处理模块
pub mod error;

/// 语言代码表
pub mod language;

/// 结果聚合管道
pub mod pipeline;

/// 外部协作者接口
pub mod providers;

/// 共享缓存
pub mod storage;

/// 数据模型
pub mod types;

// ============================================================================
// 核心API导出
// ============================================================================

pub use self::core::{
    CancelSignal, OrchestratorStatsSnapshot, QueryOrchestrator, QueryOrchestratorBuilder,
    QuerySession, SessionHandle, SessionPhase,
};

pub use config::{constants, ConfigManager, LookupConfig};

pub use detection::{ConsensusEngine, ConsensusSettings, LocalDetector};

pub use error::{ErrorCategory, ErrorSeverity, LookupError, LookupResult};

pub use pipeline::{AggregatedView, Aggregator, AggregatorSettings};

pub use providers::{
    AudioPlayer, Detector, LoggingObserver, NoProxy, ProgressSink, Provider, ProviderContext,
    ProxyAgent, ProxyResolver, QueryObserver, StaticProxy,
};

pub use types::{
    DetectedLangModel, DetectorKind, DictionaryType, DisplaySection, DisplaySnapshot,
    ListDisplayItem, QueryResult, QueryType, QueryTypeResult, QueryWordInfo, TranslationType,
    WordInfoPatch,
};
