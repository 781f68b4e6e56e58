//! 外部协作者接口
//!
//! 提供者客户端、语言检测器、代理解析、发音播放与界面观察者都通过这里的窄接口接入。

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::core::session::CancelSignal;
use super::error::{LookupError, LookupResult};
use super::storage::TokenCache;
use super::types::{
    DetectedLangModel, DetectorKind, DisplaySnapshot, QueryType, QueryTypeResult, QueryWordInfo,
};

/// 网络代理
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAgent {
    pub url: String,
}

impl ProxyAgent {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

/// 增量结果回调，每次推送都整体替换该提供者的结果槽
#[derive(Clone, Default)]
pub struct ProgressSink {
    inner: Option<Arc<dyn Fn(QueryTypeResult) + Send + Sync>>,
}

impl ProgressSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(QueryTypeResult) + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    /// 不接收增量结果
    pub fn discard() -> Self {
        Self { inner: None }
    }

    pub fn push(&self, partial: QueryTypeResult) {
        if let Some(inner) = &self.inner {
            inner(partial);
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("attached", &self.inner.is_some())
            .finish()
    }
}

/// 单次提供者调用的上下文
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub proxy: Option<ProxyAgent>,
    pub cancel: CancelSignal,
    pub progress: ProgressSink,
    pub tokens: Arc<TokenCache>,
}

impl ProviderContext {
    /// 独立调用时使用的上下文：永不取消、无代理、丢弃增量结果
    pub fn detached() -> Self {
        Self {
            proxy: None,
            cancel: CancelSignal::never(),
            progress: ProgressSink::discard(),
            tokens: Arc::new(TokenCache::new()),
        }
    }
}

/// 词典或翻译提供者
#[async_trait]
pub trait Provider: Send + Sync {
    fn query_type(&self) -> QueryType;

    /// 是否支持该语言对，不支持时不会被调度
    fn supports(&self, _from: &str, _to: &str) -> bool {
        true
    }

    /// 是否需要网络代理
    fn requires_proxy(&self) -> bool {
        false
    }

    /// 是否为系统原生翻译（调用会阻塞较长时间）
    fn is_native(&self) -> bool {
        false
    }

    /// 是否响应取消信号；不响应的调用会跑完，其结果由过期检查丢弃
    fn honors_cancellation(&self) -> bool {
        true
    }

    async fn query(&self, word: &QueryWordInfo, ctx: ProviderContext) -> LookupResult<QueryTypeResult>;
}

/// 语言检测器
#[async_trait]
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// 远程检测器；非远程的视为系统本地检测器
    fn is_remote(&self) -> bool {
        true
    }

    /// 凭据等前置条件是否满足
    fn is_available(&self) -> bool {
        true
    }

    fn is_low_latency(&self) -> bool {
        false
    }

    async fn detect(&self, text: &str) -> LookupResult<DetectedLangModel>;
}

/// 系统代理发现
#[async_trait]
pub trait ProxyResolver: Send + Sync {
    async fn resolve(&self) -> Option<ProxyAgent>;
}

/// 不使用代理
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProxy;

#[async_trait]
impl ProxyResolver for NoProxy {
    async fn resolve(&self) -> Option<ProxyAgent> {
        None
    }
}

/// 固定代理地址
#[derive(Debug, Clone)]
pub struct StaticProxy(pub ProxyAgent);

#[async_trait]
impl ProxyResolver for StaticProxy {
    async fn resolve(&self) -> Option<ProxyAgent> {
        Some(self.0.clone())
    }
}

/// 发音下载与播放，调用即返回
pub trait AudioPlayer: Send + Sync {
    fn download_and_play(&self, word: &QueryWordInfo);
}

/// 界面观察者
///
/// 回调在会话状态锁内执行，实现中不得同步回调查询调度器。
pub trait QueryObserver: Send + Sync {
    /// 完整快照，整体替换上一次的内容
    fn on_update(&self, snapshot: &DisplaySnapshot);

    fn on_error(&self, _query_type: QueryType, _error: &LookupError) {}

    fn on_language_resolved(&self, _from: &str, _to: &str) {}
}

/// 只写日志的观察者
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl QueryObserver for LoggingObserver {
    fn on_update(&self, snapshot: &DisplaySnapshot) {
        tracing::debug!(
            "会话 {} 更新: {} 个分区, loading={}",
            snapshot.session_id,
            snapshot.sections.len(),
            snapshot.loading
        );
    }

    fn on_error(&self, query_type: QueryType, error: &LookupError) {
        tracing::warn!("{} 失败: {}", query_type, error);
    }
}
