//! 存储模块
//!
//! 提供进程级共享缓存。

pub mod cache;

pub use cache::{CachedProxyResolver, RequestCounters, TokenCache};
