// 集成测试公共模块
//
// 提供可编排的假提供者、假检测器，以及记录回调的观察者和发音播放器

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lexiquery::lookup::error::helpers;
use lexiquery::lookup::{
    AudioPlayer, DetectedLangModel, Detector, DetectorKind, DictionaryType, DisplaySection,
    DisplaySnapshot, ListDisplayItem, LookupConfig, LookupError, LookupResult, Provider,
    ProviderContext, ProxyAgent, QueryObserver, QueryOrchestrator, QueryType, QueryTypeResult,
    QueryWordInfo, TranslationType, WordInfoPatch,
};

// ============================================================================
// 假提供者
// ============================================================================

/// 提供者的预设输出
#[derive(Debug, Clone)]
pub enum Outcome {
    Translation(String),
    Dictionary {
        entries: Vec<String>,
        translation: Option<String>,
    },
    Failure(String),
    Unsupported,
}

/// 按脚本返回结果的提供者
pub struct ScriptedProvider {
    query_type: QueryType,
    outcome: Outcome,
    delay: Duration,
    partials: Vec<String>,
    patch: Option<WordInfoPatch>,
    rate_limits_left: AtomicUsize,
    requires_proxy: bool,
    native: bool,
    honors_cancellation: bool,
    supported: bool,
    calls: Arc<AtomicUsize>,
    seen_proxy: Mutex<Option<ProxyAgent>>,
}

impl ScriptedProvider {
    fn new(query_type: QueryType, outcome: Outcome) -> Self {
        Self {
            query_type,
            outcome,
            delay: Duration::ZERO,
            partials: Vec::new(),
            patch: None,
            rate_limits_left: AtomicUsize::new(0),
            requires_proxy: false,
            native: false,
            honors_cancellation: true,
            supported: true,
            calls: Arc::new(AtomicUsize::new(0)),
            seen_proxy: Mutex::new(None),
        }
    }

    pub fn translation(t: TranslationType, text: &str) -> Self {
        Self::new(t.into(), Outcome::Translation(text.to_string()))
    }

    pub fn dictionary(d: DictionaryType, entries: &[&str]) -> Self {
        Self::new(
            d.into(),
            Outcome::Dictionary {
                entries: entries.iter().map(|e| e.to_string()).collect(),
                translation: None,
            },
        )
    }

    pub fn failing(query_type: QueryType, message: &str) -> Self {
        Self::new(query_type, Outcome::Failure(message.to_string()))
    }

    pub fn unsupported(query_type: QueryType) -> Self {
        Self::new(query_type, Outcome::Unsupported)
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    /// 词典同时返回的一行译文
    pub fn with_translation(mut self, text: &str) -> Self {
        if let Outcome::Dictionary { translation, .. } = &mut self.outcome {
            *translation = Some(text.to_string());
        }
        self
    }

    pub fn with_patch(mut self, patch: WordInfoPatch) -> Self {
        self.patch = Some(patch);
        self
    }

    /// 在最终结果之前推送的增量译文
    pub fn streaming(mut self, partials: &[&str]) -> Self {
        self.partials = partials.iter().map(|p| p.to_string()).collect();
        self
    }

    /// 前 n 次调用返回频率受限
    pub fn rate_limited(self, times: usize) -> Self {
        self.rate_limits_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn needs_proxy(mut self) -> Self {
        self.requires_proxy = true;
        self
    }

    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn ignores_cancellation(mut self) -> Self {
        self.honors_cancellation = false;
        self
    }

    pub fn not_supporting_pair(mut self) -> Self {
        self.supported = false;
        self
    }

    /// 调用计数，构建前取出
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn seen_proxy(&self) -> Option<ProxyAgent> {
        self.seen_proxy.lock().unwrap().clone()
    }

    fn result(&self, word: &QueryWordInfo) -> LookupResult<QueryTypeResult> {
        let result = QueryTypeResult::new(self.query_type, word);
        let result = match &self.outcome {
            Outcome::Translation(text) => result.with_translations([text.as_str()]),
            Outcome::Dictionary { entries, translation } => {
                let sections = if entries.is_empty() {
                    Vec::new()
                } else {
                    vec![entries.iter().enumerate().fold(
                        DisplaySection::new(self.query_type, "释义"),
                        |section, (i, entry)| {
                            section.with_item(ListDisplayItem::new(
                                self.query_type,
                                &format!("{}-{}", self.query_type.name(), i),
                                entry,
                            ))
                        },
                    )]
                };
                result
                    .with_sections(sections)
                    .with_translations(translation.iter().map(|t| t.as_str()))
            }
            Outcome::Failure(message) => {
                return Err(helpers::provider_failure(self.query_type, message))
            }
            Outcome::Unsupported => {
                return Err(helpers::unsupported_language(
                    self.query_type,
                    &word.from_language,
                    &word.to_language,
                ))
            }
        };

        Ok(match &self.patch {
            Some(patch) => result.with_patch(patch.clone()),
            None => result,
        })
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn query_type(&self) -> QueryType {
        self.query_type
    }

    fn supports(&self, _from: &str, _to: &str) -> bool {
        self.supported
    }

    fn requires_proxy(&self) -> bool {
        self.requires_proxy
    }

    fn is_native(&self) -> bool {
        self.native
    }

    fn honors_cancellation(&self) -> bool {
        self.honors_cancellation
    }

    async fn query(&self, word: &QueryWordInfo, ctx: ProviderContext) -> LookupResult<QueryTypeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_proxy.lock().unwrap() = ctx.proxy.clone();

        let left = self.rate_limits_left.load(Ordering::SeqCst);
        if left > 0 {
            self.rate_limits_left.store(left - 1, Ordering::SeqCst);
            return Err(helpers::rate_limited(self.query_type));
        }

        for partial in &self.partials {
            ctx.progress
                .push(QueryTypeResult::new(self.query_type, word).with_translations([partial.as_str()]));
        }

        if !self.delay.is_zero() {
            if self.honors_cancellation {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = ctx.cancel.cancelled() => return Err(LookupError::Canceled),
                }
            } else {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.result(word)
    }
}

// ============================================================================
// 假检测器
// ============================================================================

/// 延迟后返回固定语言代码的检测器
pub struct ScriptedDetector {
    service: TranslationType,
    code: Option<String>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(service: TranslationType, code: &str, delay_ms: u64) -> Self {
        Self {
            service,
            code: Some(code.to_string()),
            delay: Duration::from_millis(delay_ms),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(service: TranslationType, delay_ms: u64) -> Self {
        Self {
            code: None,
            ..Self::new(service, "", delay_ms)
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Service(self.service)
    }

    async fn detect(&self, _text: &str) -> LookupResult<DetectedLangModel> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.code {
            Some(code) => Ok(DetectedLangModel::from_native(self.kind(), code)),
            None => Err(helpers::detector_failure(self.kind(), "service unavailable")),
        }
    }
}

// ============================================================================
// 记录回调
// ============================================================================

#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<DisplaySnapshot>>,
    errors: Mutex<Vec<(QueryType, LookupError)>>,
    languages: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshots(&self) -> Vec<DisplaySnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<DisplaySnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    pub fn snapshots_for(&self, session_id: u64) -> Vec<DisplaySnapshot> {
        self.snapshots()
            .into_iter()
            .filter(|s| s.session_id == session_id)
            .collect()
    }

    pub fn errors(&self) -> Vec<(QueryType, LookupError)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn languages(&self) -> Vec<(String, String)> {
        self.languages.lock().unwrap().clone()
    }
}

impl QueryObserver for RecordingObserver {
    fn on_update(&self, snapshot: &DisplaySnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn on_error(&self, query_type: QueryType, error: &LookupError) {
        self.errors.lock().unwrap().push((query_type, error.clone()));
    }

    fn on_language_resolved(&self, from: &str, to: &str) {
        self.languages
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    played: Mutex<Vec<QueryWordInfo>>,
}

impl RecordingAudio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn played(&self) -> Vec<QueryWordInfo> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioPlayer for RecordingAudio {
    fn download_and_play(&self, word: &QueryWordInfo) {
        self.played.lock().unwrap().push(word.clone());
    }
}

// ============================================================================
// 构建辅助
// ============================================================================

/// 测试默认配置：无防抖，速度优先关闭
pub fn test_config() -> LookupConfig {
    LookupConfig {
        debounce_delay_ms: 0,
        speed_first: false,
        ..LookupConfig::default()
    }
}

/// 两个检测器都判定为英文
pub fn english_detectors() -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(ScriptedDetector::new(TranslationType::Bing, "en", 10)) as Arc<dyn Detector>,
        Arc::new(ScriptedDetector::new(TranslationType::Google, "en", 20)),
    ]
}

pub fn build_orchestrator(
    config: LookupConfig,
    providers: Vec<Arc<dyn Provider>>,
    detectors: Vec<Arc<dyn Detector>>,
    observer: Arc<RecordingObserver>,
) -> QueryOrchestrator {
    detectors
        .into_iter()
        .fold(
            QueryOrchestrator::builder(config)
                .providers(providers)
                .observer(observer),
            |builder, detector| builder.detector(detector),
        )
        .build()
        .expect("orchestrator should build")
}

/// 一个分区的全部条目标题
pub fn item_titles(section: &DisplaySection) -> Vec<String> {
    section.items.iter().map(|item| item.title.clone()).collect()
}
