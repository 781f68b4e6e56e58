//! 语言检测模块
//!
//! - **consensus**: 多检测器竞速与共识
//! - **local**: 本地统计检测与字符集启发式

pub mod consensus;
pub mod local;

pub use consensus::{select_detectors, ConsensusEngine, ConsensusSettings};
pub use local::LocalDetector;
