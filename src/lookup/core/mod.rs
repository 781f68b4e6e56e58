//! 查询调度核心
//!
//! ## 架构设计
//!
//! - **调度层** (`orchestrator.rs`): 管理会话的取代、语言检测、提供者调度与结果落定
//! - **会话层** (`session.rs`): 会话状态、取消令牌和会话句柄
//! - **统计** (`stats.rs`): 原子计数的运行时统计
//!
//! ## 模块依赖关系
//!
//! ```text
//! QueryOrchestrator (orchestrator.rs)
//!     ├── ConsensusEngine (detection/consensus.rs)
//!     ├── QuerySession (session.rs)
//!     │       └── Aggregator (pipeline/aggregator.rs)
//!     ├── CachedProxyResolver / TokenCache / RequestCounters (storage/cache.rs)
//!     └── OrchestratorStats (stats.rs)
//! ```

pub mod orchestrator;
pub mod session;
pub mod stats;

/// 查询调度器 - 主要的对外接口
pub use orchestrator::{QueryOrchestrator, QueryOrchestratorBuilder};

/// 会话与取消
pub use session::{CancelSignal, QuerySession, SessionHandle, SessionPhase, SessionToken};

/// 运行时统计
pub use stats::{OrchestratorStats, OrchestratorStatsSnapshot};
