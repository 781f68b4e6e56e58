//! 结果处理管道
//!
//! 提供结果聚合、排序和详情模式判定功能。

pub mod aggregator;
pub mod ordering;

pub use aggregator::{AggregatedView, Aggregator, AggregatorSettings};
pub use ordering::{script_hint, DetailThresholds, ScriptHint, SectionOrder};
