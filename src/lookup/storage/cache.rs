//! 进程级共享缓存
//!
//! 代理地址、提供者令牌与请求计数。写入方总是整体替换条目，读取方不会看到半更新的值。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::lookup::providers::{ProxyAgent, ProxyResolver};
use crate::lookup::types::QueryType;

// ============================================================================
// 代理缓存
// ============================================================================

#[derive(Debug, Clone)]
struct ProxyEntry {
    agent: Option<ProxyAgent>,
    resolved_at: Instant,
}

/// 带 TTL 的代理解析缓存
pub struct CachedProxyResolver {
    resolver: Arc<dyn ProxyResolver>,
    ttl: Duration,
    entry: RwLock<Option<ProxyEntry>>,
    resolutions: AtomicU64,
}

impl CachedProxyResolver {
    pub fn new(resolver: Arc<dyn ProxyResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            entry: RwLock::new(None),
            resolutions: AtomicU64::new(0),
        }
    }

    /// 读取缓存，过期或为空时重新解析
    pub async fn resolve(&self) -> Option<ProxyAgent> {
        if let Some(agent) = self.cached() {
            return agent;
        }

        let agent = self.resolver.resolve().await;
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("代理已解析: {:?}", agent.as_ref().map(|a| a.url.as_str()));

        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(ProxyEntry {
            agent: agent.clone(),
            resolved_at: Instant::now(),
        });
        agent
    }

    /// 有效缓存，外层 `None` 表示需要重新解析
    fn cached(&self) -> Option<Option<ProxyAgent>> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|e| e.resolved_at.elapsed() < self.ttl)
            .map(|e| e.agent.clone())
    }

    pub fn invalidate(&self) {
        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = None;
    }

    /// 实际调用底层解析器的次数
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }
}

// ============================================================================
// 令牌缓存
// ============================================================================

#[derive(Debug, Clone)]
struct TokenEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// 提供者令牌缓存
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: DashMap<String, TokenEntry>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at.map_or(true, |at| Instant::now() < at) {
                return Some(entry.value.clone());
            }
        }

        self.evict_expired(key);
        None
    }

    /// 只删除仍然过期的条目，期间写入的新值保留
    fn evict_expired(&self, key: &str) {
        self.entries
            .remove_if(key, |_, entry| entry.expires_at.is_some_and(|at| Instant::now() >= at));
    }

    pub fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.entries.insert(
            key.to_string(),
            TokenEntry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// 请求计数
// ============================================================================

/// 每个提供者的请求计数，同时上报到 metrics
#[derive(Debug, Default)]
pub struct RequestCounters {
    counts: DashMap<QueryType, AtomicU64>,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, query_type: QueryType) {
        self.counts
            .entry(query_type)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lexiquery_provider_requests_total", "provider" => query_type.name())
            .increment(1);
    }

    pub fn get(&self, query_type: QueryType) -> u64 {
        self.counts
            .get(&query_type)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum()
    }
}
