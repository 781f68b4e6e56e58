//! 查询调度器
//!
//! 每次 `start_query` 都会取代当前会话：防抖、语言检测、目标语言选择，然后并发调度所有启用的提供者。
//! 每个提供者调用都有独立的失败边界，结果逐个合并进会话并发布完整快照。

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use super::session::{QuerySession, SessionHandle, SessionPhase};
use super::stats::{OrchestratorStats, OrchestratorStatsSnapshot};
use crate::lookup::config::LookupConfig;
use crate::lookup::detection::ConsensusEngine;
use crate::lookup::error::{helpers, ErrorStats, LookupError, LookupResult};
use crate::lookup::language;
use crate::lookup::pipeline::aggregator::{LINKED_DICTIONARY, LINKED_TRANSLATION};
use crate::lookup::pipeline::AggregatorSettings;
use crate::lookup::providers::{
    AudioPlayer, Detector, LoggingObserver, NoProxy, ProgressSink, Provider, ProviderContext,
    ProxyResolver, QueryObserver,
};
use crate::lookup::storage::{CachedProxyResolver, RequestCounters, TokenCache};
use crate::lookup::types::{QueryType, QueryTypeResult, QueryWordInfo};

/// 调度器构建器
pub struct QueryOrchestratorBuilder {
    config: LookupConfig,
    providers: Vec<Arc<dyn Provider>>,
    detectors: Vec<Arc<dyn Detector>>,
    proxy_resolver: Arc<dyn ProxyResolver>,
    audio: Option<Arc<dyn AudioPlayer>>,
    observer: Arc<dyn QueryObserver>,
}

impl QueryOrchestratorBuilder {
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
            detectors: Vec::new(),
            proxy_resolver: Arc::new(NoProxy),
            audio: None,
            observer: Arc::new(LoggingObserver),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        self.providers.extend(providers);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn proxy_resolver(mut self, resolver: Arc<dyn ProxyResolver>) -> Self {
        self.proxy_resolver = resolver;
        self
    }

    pub fn audio_player(mut self, audio: Arc<dyn AudioPlayer>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 校验配置并构建调度器
    pub fn build(self) -> LookupResult<QueryOrchestrator> {
        self.config.validate()?;
        let audio_query_type = self.config.audio_query_type()?;

        // 同一类型只保留第一个提供者
        let mut seen = HashSet::new();
        let providers: Vec<Arc<dyn Provider>> = self
            .providers
            .into_iter()
            .filter(|provider| {
                let query_type = provider.query_type();
                let fresh = seen.insert(query_type);
                if !fresh {
                    tracing::warn!("重复注册的提供者 {} 已忽略", query_type);
                }
                fresh
            })
            .collect();

        let consensus = ConsensusEngine::from_config(self.detectors, &self.config);
        let proxy = CachedProxyResolver::new(self.proxy_resolver, self.config.proxy_cache_ttl());

        tracing::info!(
            "查询调度器就绪: {} 个提供者, 偏好语言 {}/{}",
            providers.len(),
            self.config.language1,
            self.config.language2
        );

        Ok(QueryOrchestrator {
            inner: Arc::new(Inner {
                aggregator_settings: AggregatorSettings::from_config(&self.config),
                config: self.config,
                providers,
                consensus,
                proxy,
                audio: self.audio,
                audio_query_type,
                observer: self.observer,
                tokens: Arc::new(TokenCache::new()),
                counters: RequestCounters::new(),
                stats: Arc::new(OrchestratorStats::default()),
                errors: Mutex::new(ErrorStats::default()),
                next_id: AtomicU64::new(0),
                current: Mutex::new(None),
            }),
        })
    }
}

/// 单个提供者的调度项
struct DispatchTask {
    provider: Arc<dyn Provider>,
    /// 仅为关联词典提供数据，自身不显示
    hidden: bool,
}

struct Inner {
    config: LookupConfig,
    providers: Vec<Arc<dyn Provider>>,
    consensus: ConsensusEngine,
    proxy: CachedProxyResolver,
    audio: Option<Arc<dyn AudioPlayer>>,
    audio_query_type: QueryType,
    observer: Arc<dyn QueryObserver>,
    aggregator_settings: AggregatorSettings,
    tokens: Arc<TokenCache>,
    counters: RequestCounters,
    stats: Arc<OrchestratorStats>,
    errors: Mutex<ErrorStats>,
    next_id: AtomicU64,
    current: Mutex<Option<Arc<QuerySession>>>,
}

/// 查询会话调度器
#[derive(Clone)]
pub struct QueryOrchestrator {
    inner: Arc<Inner>,
}

impl QueryOrchestrator {
    pub fn builder(config: LookupConfig) -> QueryOrchestratorBuilder {
        QueryOrchestratorBuilder::new(config)
    }

    /// 发起查询，经过防抖延迟后开始检测
    ///
    /// `target` 为空时目标语言取第一偏好语言。必须在 tokio 运行时内调用。
    pub fn start_query(&self, text: &str, target: Option<&str>) -> SessionHandle {
        self.launch(text, target, self.inner.config.debounce_delay())
    }

    /// 发起查询，跳过防抖延迟
    pub fn start_query_now(&self, text: &str, target: Option<&str>) -> SessionHandle {
        self.launch(text, target, Duration::ZERO)
    }

    /// 取消当前会话并发布空快照
    pub fn clear_query(&self) -> SessionHandle {
        let session = self.inner.new_session(QueryWordInfo::new("", language::AUTO, language::AUTO));
        self.inner.install(&session);
        session.dispatch(&[], self.inner.observer.as_ref());
        tracing::debug!("查询已清空 (会话 {})", session.id());
        SessionHandle::new(session, None)
    }

    /// 当前会话
    pub fn current_session(&self) -> Option<Arc<QuerySession>> {
        self.inner.current_session()
    }

    pub fn stats(&self) -> OrchestratorStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// 提供者错误按类别和严重程度的累计统计，不含取消
    pub fn error_stats(&self) -> ErrorStats {
        self.inner.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 该提供者的累计请求次数（含重试）
    pub fn request_count(&self, query_type: QueryType) -> u64 {
        self.inner.counters.get(query_type)
    }

    pub fn config(&self) -> &LookupConfig {
        &self.inner.config
    }

    pub fn token_cache(&self) -> Arc<TokenCache> {
        Arc::clone(&self.inner.tokens)
    }

    /// 丢弃缓存的代理，下次调用重新解析
    pub fn invalidate_proxy(&self) {
        self.inner.proxy.invalidate();
    }

    fn launch(&self, text: &str, target: Option<&str>, debounce: Duration) -> SessionHandle {
        let text = text.trim();
        if text.is_empty() {
            return self.clear_query();
        }

        let target = target.map(|t| language::canonicalize(t).unwrap_or(t).to_string());
        let naive_target = target.clone().unwrap_or_else(|| self.inner.config.language1.clone());

        let session = self.inner.new_session(QueryWordInfo::new(text, language::AUTO, &naive_target));
        self.inner.install(&session);
        tracing::info!("会话 {} 开始查询: {}", session.id(), text);

        let inner = Arc::clone(&self.inner);
        let driven = Arc::clone(&session);
        let driver = tokio::spawn(async move {
            inner.drive(driven, target, debounce).await;
        });

        SessionHandle::new(session, Some(driver))
    }
}

impl Inner {
    fn new_session(&self, word_info: QueryWordInfo) -> Arc<QuerySession> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.inc_sessions_started();
        Arc::new(QuerySession::new(id, word_info, self.aggregator_settings.clone()))
    }

    /// 安装新会话并取代旧会话
    fn install(&self, session: &Arc<QuerySession>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(Arc::clone(session)) {
            if previous.end(SessionPhase::Superseded) {
                self.stats.inc_sessions_superseded();
                tracing::debug!("会话 {} 被会话 {} 取代", previous.id(), session.id());
            }
        }
    }

    fn current_session(&self) -> Option<Arc<QuerySession>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn is_current(&self, session: &Arc<QuerySession>) -> bool {
        self.current_session()
            .map(|current| Arc::ptr_eq(&current, session))
            .unwrap_or(false)
    }

    async fn drive(self: Arc<Self>, session: Arc<QuerySession>, target: Option<String>, debounce: Duration) {
        let signal = session.signal();

        if !signal.sleep(debounce).await {
            tracing::debug!("会话 {} 在防抖期间被取消", session.id());
            return;
        }
        if !session.begin_detection() {
            return;
        }

        let text = session.word_info().word;
        let (generation, detected) = tokio::select! {
            detected = self.consensus.detect_tracked(&text) => detected,
            _ = signal.cancelled() => {
                tracing::debug!("会话 {} 在语言检测期间被取消", session.id());
                return;
            }
        };
        if !session.is_live() || !self.consensus.is_latest(generation) {
            tracing::debug!("会话 {} 的检测结果已过期", session.id());
            return;
        }

        let from = detected.language.clone();
        let to = self.resolve_target(&from, target.as_deref());
        tracing::debug!(
            "会话 {} 语言: {} -> {} (检测器 {}, confirmed={})",
            session.id(),
            from,
            to,
            detected.detector,
            detected.confirmed
        );

        let Some(word_info) = session.resolve_languages(detected, &to, self.observer.as_ref()) else {
            return;
        };

        let plan = self.dispatch_plan(&word_info);
        let query_types: Vec<QueryType> = plan.iter().map(|task| task.provider.query_type()).collect();
        if !session.dispatch(&query_types, self.observer.as_ref()) {
            return;
        }
        tracing::info!("会话 {} 调度 {} 个提供者", session.id(), plan.len());

        let tasks: Vec<_> = plan
            .into_iter()
            .map(|task| self.run_task(&session, task))
            .collect();
        join_all(tasks).await;

        if session.phase() == SessionPhase::Complete {
            self.stats.inc_sessions_completed();
            tracing::info!("会话 {} 完成", session.id());
        }
    }

    /// 源语言等于目标语言时换成另一个偏好语言
    fn resolve_target(&self, from: &str, target: Option<&str>) -> String {
        let naive = target.unwrap_or(&self.config.language1);
        if from == naive {
            self.config.other_preferred(from).to_string()
        } else {
            naive.to_string()
        }
    }

    fn dispatch_plan(&self, word_info: &QueryWordInfo) -> Vec<DispatchTask> {
        let from = &word_info.from_language;
        let to = &word_info.to_language;

        let linked_dictionary_enabled = self.config.is_enabled(LINKED_DICTIONARY)
            && self.providers.iter().any(|p| p.query_type() == LINKED_DICTIONARY);

        self.providers
            .iter()
            .filter_map(|provider| {
                let query_type = provider.query_type();
                let enabled = self.config.is_enabled(query_type);
                let linked = query_type == LINKED_TRANSLATION && linked_dictionary_enabled;
                if !enabled && !linked {
                    return None;
                }
                if !provider.supports(from, to) {
                    tracing::debug!("{} 不支持 {} -> {}，跳过", query_type, from, to);
                    return None;
                }
                Some(DispatchTask {
                    provider: Arc::clone(provider),
                    hidden: !enabled,
                })
            })
            .collect()
    }

    fn dispatch_delay(&self, provider: &dyn Provider) -> Duration {
        if provider.is_native() {
            self.config.native_delay()
        } else if provider.requires_proxy() && !self.config.enable_system_proxy {
            self.config.proxy_delay()
        } else {
            Duration::ZERO
        }
    }

    async fn run_task(&self, session: &Arc<QuerySession>, task: DispatchTask) {
        let query_type = task.provider.query_type();
        let signal = session.signal();

        let delay = self.dispatch_delay(task.provider.as_ref());
        if !delay.is_zero() {
            tracing::debug!("{} 延迟 {:?} 后调度", query_type, delay);
        }
        if !signal.sleep(delay).await {
            return;
        }

        match self.call_with_retry(session, task.provider.as_ref(), task.hidden).await {
            Ok(result) => self.settle_success(session, query_type, result, task.hidden),
            Err(error) => self.settle_failure(session, query_type, error),
        }
    }

    async fn call_with_retry(
        &self,
        session: &Arc<QuerySession>,
        provider: &dyn Provider,
        hidden: bool,
    ) -> LookupResult<QueryTypeResult> {
        let signal = session.signal();
        let mut retries = 0;

        loop {
            match self.call_once(session, provider, hidden).await {
                Err(LookupError::RateLimited { provider: name }) if retries < self.config.max_rate_limit_retries => {
                    retries += 1;
                    self.stats.inc_rate_limit_retries();
                    tracing::warn!(
                        "{} 请求频率受限，{:?} 后第 {} 次重试",
                        name,
                        self.config.proxy_delay(),
                        retries
                    );
                    if !signal.sleep(self.config.proxy_delay()).await {
                        return Err(LookupError::Canceled);
                    }
                }
                outcome => return outcome,
            }
        }
    }

    async fn call_once(
        &self,
        session: &Arc<QuerySession>,
        provider: &dyn Provider,
        hidden: bool,
    ) -> LookupResult<QueryTypeResult> {
        let query_type = provider.query_type();
        let signal = session.signal();
        let word_info = session.word_info();

        let proxy = if provider.requires_proxy() {
            self.proxy.resolve().await
        } else {
            None
        };

        let progress = {
            let session = Arc::clone(session);
            let observer = Arc::clone(&self.observer);
            let stats = Arc::clone(&self.stats);
            ProgressSink::new(move |mut partial: QueryTypeResult| {
                partial.query_type = query_type;
                if session.apply_result(partial, hidden, false, observer.as_ref()).is_none() {
                    stats.inc_stale_results_dropped();
                }
            })
        };

        let ctx = ProviderContext {
            proxy,
            cancel: signal.clone(),
            progress,
            tokens: Arc::clone(&self.tokens),
        };

        self.counters.record(query_type);
        self.stats.inc_provider_calls();

        let started = Instant::now();
        let call = tokio::time::timeout(self.config.call_timeout(), provider.query(&word_info, ctx));
        let outcome = if provider.honors_cancellation() {
            tokio::select! {
                outcome = call => outcome,
                _ = signal.cancelled() => return Err(LookupError::Canceled),
            }
        } else {
            call.await
        };

        outcome.unwrap_or_else(|_| {
            Err(LookupError::Timeout {
                provider: query_type.to_string(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            })
        })
    }

    fn settle_success(&self, session: &Arc<QuerySession>, query_type: QueryType, mut result: QueryTypeResult, hidden: bool) {
        result.query_type = query_type;
        self.stats.inc_provider_successes();

        match session.apply_result(result, hidden, true, self.observer.as_ref()) {
            Some(word_info) => self.maybe_play_audio(session, query_type, &word_info),
            None => {
                self.stats.inc_stale_results_dropped();
                tracing::debug!("会话 {} 已失效，丢弃 {} 的结果", session.id(), query_type);
            }
        }
    }

    fn settle_failure(&self, session: &Arc<QuerySession>, query_type: QueryType, error: LookupError) {
        match &error {
            LookupError::Canceled | LookupError::UnsupportedLanguage { .. } => {}
            LookupError::Timeout { .. } => self.stats.inc_provider_timeouts(),
            _ => self.stats.inc_provider_failures(),
        }
        if !matches!(error, LookupError::Canceled) {
            helpers::log_error(&error);
            self.errors
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .record_error(&error);
        }

        if !session.fail_task(query_type, &error, self.observer.as_ref()) && !matches!(error, LookupError::Canceled) {
            self.stats.inc_stale_results_dropped();
        }
    }

    /// 发音：英文单词、开启自动播放、最新会话、本会话尚未播放
    fn maybe_play_audio(&self, session: &Arc<QuerySession>, query_type: QueryType, word_info: &QueryWordInfo) {
        let Some(audio) = &self.audio else {
            return;
        };
        if query_type != self.audio_query_type || !self.config.auto_play_word_audio {
            return;
        }
        if word_info.is_word != Some(true)
            || word_info.speech_url.is_none()
            || word_info.from_language != language::ENGLISH
        {
            return;
        }
        if !self.is_current(session) || !session.claim_audio() {
            return;
        }

        self.stats.inc_audio_played();
        tracing::debug!("会话 {} 播放发音: {}", session.id(), word_info.word);
        audio.download_and_play(word_info);
    }
}
