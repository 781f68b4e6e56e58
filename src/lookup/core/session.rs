//! 查询会话
//!
//! 会话是一次查询的聚合根：持有规范的查询词信息、已落定的结果、未完成的提供者集合和唯一的取消令牌。
//! 状态由一把互斥锁保护，锁从不跨越 `.await` 持有。

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lookup::error::LookupError;
use crate::lookup::pipeline::{Aggregator, AggregatorSettings};
use crate::lookup::providers::QueryObserver;
use crate::lookup::types::{
    DetectedLangModel, DisplaySnapshot, QueryResult, QueryType, QueryTypeResult, QueryWordInfo,
};

// ============================================================================
// 取消令牌
// ============================================================================

/// 会话的取消令牌，一次触发，所有订阅者可见
#[derive(Debug, Clone)]
pub struct SessionToken {
    tx: Arc<watch::Sender<bool>>,
}

impl SessionToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

/// 取消信号的只读端，交给提供者和延迟任务
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// 永不触发的信号
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消；令牌被释放且未取消时永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// 可取消的延迟，返回 `false` 表示期间已取消
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_cancelled();
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = self.cancelled() => false,
        }
    }
}

// ============================================================================
// 会话
// ============================================================================

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Created,
    Detecting,
    Dispatched,
    Partial,
    Complete,
    Cancelled,
    Superseded,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Cancelled | SessionPhase::Superseded)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Created => "created",
            SessionPhase::Detecting => "detecting",
            SessionPhase::Dispatched => "dispatched",
            SessionPhase::Partial => "partial",
            SessionPhase::Complete => "complete",
            SessionPhase::Cancelled => "cancelled",
            SessionPhase::Superseded => "superseded",
        };
        f.write_str(name)
    }
}

struct SessionState {
    phase: SessionPhase,
    word_info: QueryWordInfo,
    aggregator: Aggregator,
    outstanding: HashSet<QueryType>,
    audio_played: bool,
}

impl SessionState {
    fn is_live(&self) -> bool {
        !self.phase.is_terminal()
    }

    fn refresh_phase(&mut self) {
        if !self.is_live() {
            return;
        }
        if self.outstanding.is_empty() {
            self.phase = SessionPhase::Complete;
        } else if !self.aggregator.is_empty() {
            self.phase = SessionPhase::Partial;
        }
    }
}

/// 一次查询会话
pub struct QuerySession {
    id: u64,
    token: SessionToken,
    state: Mutex<SessionState>,
}

impl QuerySession {
    pub fn new(id: u64, word_info: QueryWordInfo, settings: AggregatorSettings) -> Self {
        let mut aggregator = Aggregator::new(settings);
        aggregator.set_languages(&word_info.from_language, &word_info.to_language);

        Self {
            id,
            token: SessionToken::new(),
            state: Mutex::new(SessionState {
                phase: SessionPhase::Created,
                word_info,
                aggregator,
                outstanding: HashSet::new(),
                audio_played: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn is_live(&self) -> bool {
        self.lock().is_live()
    }

    pub fn signal(&self) -> CancelSignal {
        self.token.signal()
    }

    /// 当前的规范查询词信息（已合并提供者补充的信息）
    pub fn word_info(&self) -> QueryWordInfo {
        self.lock().word_info.clone()
    }

    pub fn outstanding(&self) -> Vec<QueryType> {
        let mut outstanding: Vec<QueryType> = self.lock().outstanding.iter().copied().collect();
        outstanding.sort();
        outstanding
    }

    /// 当前快照
    pub fn snapshot(&self) -> DisplaySnapshot {
        let state = self.lock();
        build_snapshot(self.id, &state)
    }

    /// 结束会话，返回此前是否仍然有效
    ///
    /// 令牌在锁内触发，之后不会再有任何通知发出。
    pub(crate) fn end(&self, phase: SessionPhase) -> bool {
        let mut state = self.lock();
        if !state.is_live() {
            return false;
        }
        state.phase = phase;
        state.outstanding.clear();
        self.token.cancel();
        tracing::debug!("会话 {} 结束: {}", self.id, phase);
        true
    }

    pub(crate) fn begin_detection(&self) -> bool {
        let mut state = self.lock();
        if !state.is_live() {
            return false;
        }
        state.phase = SessionPhase::Detecting;
        true
    }

    /// 写入检测结果与目标语言
    pub(crate) fn resolve_languages(
        &self,
        detected: DetectedLangModel,
        to: &str,
        observer: &dyn QueryObserver,
    ) -> Option<QueryWordInfo> {
        let mut state = self.lock();
        if !state.is_live() {
            return None;
        }
        state.word_info.from_language = detected.language.clone();
        state.word_info.to_language = to.to_string();
        state.word_info.detected_language = Some(detected);

        let (from, to) = (state.word_info.from_language.clone(), state.word_info.to_language.clone());
        state.aggregator.set_languages(&from, &to);
        observer.on_language_resolved(&from, &to);
        Some(state.word_info.clone())
    }

    /// 登记要调度的提供者并发布首个快照
    pub(crate) fn dispatch(&self, query_types: &[QueryType], observer: &dyn QueryObserver) -> bool {
        let mut state = self.lock();
        if !state.is_live() {
            return false;
        }
        state.outstanding.extend(query_types.iter().copied());
        state.phase = SessionPhase::Dispatched;
        state.refresh_phase();
        observer.on_update(&build_snapshot(self.id, &state));
        true
    }

    /// 合并提供者结果
    ///
    /// `finished` 为假时表示增量结果，提供者仍在进行中。会话失效时返回 `None`。
    pub(crate) fn apply_result(
        &self,
        result: QueryTypeResult,
        hidden: bool,
        finished: bool,
        observer: &dyn QueryObserver,
    ) -> Option<QueryWordInfo> {
        let mut state = self.lock();
        if !state.is_live() {
            return None;
        }

        let query_type = result.query_type;
        if let Some(patch) = &result.patch {
            patch.apply(&mut state.word_info);
        }
        state.aggregator.settle(QueryResult::new(result, hidden));
        if finished {
            state.outstanding.remove(&query_type);
        }
        state.refresh_phase();

        observer.on_update(&build_snapshot(self.id, &state));
        Some(state.word_info.clone())
    }

    /// 记录提供者失败，返回会话是否仍然有效
    ///
    /// 失败的提供者不保留任何分区，此前推送的增量结果一并清除。
    pub(crate) fn fail_task(&self, query_type: QueryType, error: &LookupError, observer: &dyn QueryObserver) -> bool {
        let mut state = self.lock();
        if !state.is_live() {
            return false;
        }

        state.aggregator.remove(query_type);
        state.outstanding.remove(&query_type);
        state.refresh_phase();

        if error.is_user_visible() {
            observer.on_error(query_type, error);
        }
        observer.on_update(&build_snapshot(self.id, &state));
        true
    }

    /// 占用本会话唯一一次的发音机会
    pub(crate) fn claim_audio(&self) -> bool {
        let mut state = self.lock();
        if !state.is_live() || state.audio_played {
            return false;
        }
        state.audio_played = true;
        true
    }

    pub fn has_played_audio(&self) -> bool {
        self.lock().audio_played
    }
}

impl fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySession")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}

fn build_snapshot(session_id: u64, state: &SessionState) -> DisplaySnapshot {
    let view = state.aggregator.view();
    DisplaySnapshot {
        session_id,
        loading: !state.outstanding.is_empty(),
        sections: view.sections,
        show_detail: view.show_detail,
        multiple_translations: view.multiple_translations,
        from_language: state.word_info.from_language.clone(),
        to_language: state.word_info.to_language.clone(),
    }
}

// ============================================================================
// 会话句柄
// ============================================================================

/// `start_query` 返回的句柄
#[derive(Debug)]
pub struct SessionHandle {
    session: Arc<QuerySession>,
    driver: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn new(session: Arc<QuerySession>, driver: Option<JoinHandle<()>>) -> Self {
        Self { session, driver }
    }

    pub fn id(&self) -> u64 {
        self.session.id()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.session.snapshot()
    }

    pub fn word_info(&self) -> QueryWordInfo {
        self.session.word_info()
    }

    pub fn session(&self) -> &Arc<QuerySession> {
        &self.session
    }

    /// 取消会话：未完成的延迟立即结束，可取消的调用被中止
    pub fn cancel(&self) {
        self.session.end(SessionPhase::Cancelled);
    }

    /// 等待会话的所有任务结束
    pub async fn wait(mut self) -> DisplaySnapshot {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::error!("会话 {} 的调度任务异常退出: {}", self.session.id(), e);
            }
        }
        self.session.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::providers::LoggingObserver;
    use crate::lookup::types::TranslationType;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let token = SessionToken::new();
        let signal = token.signal();

        let sleeper = tokio::spawn(async move { signal.sleep(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;
        token.cancel();

        assert!(!sleeper.await.unwrap());
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let token = SessionToken::new();
        assert!(token.signal().sleep(Duration::from_millis(600)).await);
        assert!(CancelSignal::never().sleep(Duration::ZERO).await);
    }

    #[test]
    fn test_session_lifecycle() {
        let observer = LoggingObserver;
        let session = QuerySession::new(1, QueryWordInfo::new("good", "en", "zh-CHS"), AggregatorSettings::default());
        let google = QueryType::Translation(TranslationType::Google);
        let bing = QueryType::Translation(TranslationType::Bing);

        assert_eq!(session.phase(), SessionPhase::Created);
        assert!(session.begin_detection());
        assert!(session.dispatch(&[google, bing], &observer));
        assert!(session.snapshot().loading);

        let result = QueryTypeResult::new(google, &session.word_info()).with_translations(["好"]);
        assert!(session.apply_result(result, false, true, &observer).is_some());
        assert_eq!(session.phase(), SessionPhase::Partial);

        let error = LookupError::ProviderFailure {
            provider: bing.to_string(),
            message: "boom".to_string(),
        };
        assert!(session.fail_task(bing, &error, &observer));
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(!session.snapshot().loading);
    }

    #[test]
    fn test_failure_discards_partial_result() {
        let observer = LoggingObserver;
        let session = QuerySession::new(2, QueryWordInfo::new("good", "en", "zh-CHS"), AggregatorSettings::default());
        let openai = QueryType::Translation(TranslationType::OpenAI);

        assert!(session.dispatch(&[openai], &observer));
        let partial = QueryTypeResult::new(openai, &session.word_info()).with_translations(["好"]);
        assert!(session.apply_result(partial, false, false, &observer).is_some());
        assert_eq!(session.snapshot().sections.len(), 1);

        let error = LookupError::Timeout {
            provider: openai.to_string(),
            elapsed_ms: 10_000,
        };
        assert!(session.fail_task(openai, &error, &observer));
        assert!(session.snapshot().sections.is_empty());
        assert_eq!(session.phase(), SessionPhase::Complete);
    }

    #[test]
    fn test_ended_session_rejects_updates() {
        let observer = LoggingObserver;
        let session = QuerySession::new(2, QueryWordInfo::new("good", "en", "zh-CHS"), AggregatorSettings::default());
        let google = QueryType::Translation(TranslationType::Google);

        assert!(session.dispatch(&[google], &observer));
        assert!(session.end(SessionPhase::Superseded));
        assert!(!session.end(SessionPhase::Cancelled));
        assert!(session.signal().is_cancelled());

        let result = QueryTypeResult::new(google, &session.word_info()).with_translations(["好"]);
        assert!(session.apply_result(result, false, true, &observer).is_none());
        assert!(!session.claim_audio());
        assert_eq!(session.phase(), SessionPhase::Superseded);
    }

    #[test]
    fn test_audio_claimed_once() {
        let session = QuerySession::new(3, QueryWordInfo::default(), AggregatorSettings::default());
        assert!(session.claim_audio());
        assert!(!session.claim_audio());
        assert!(session.has_played_audio());
    }
}
