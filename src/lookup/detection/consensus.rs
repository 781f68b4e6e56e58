//! 语言检测共识引擎
//!
//! 并发运行所有检测器，每个检测结果落定时与本次调用的累积列表比对：
//! 权威检测器直接确认，两个检测器一致即确认，否则等待全部落定后按优先级回退。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

use super::local::LocalDetector;
use crate::lookup::config::{constants, LookupConfig};
use crate::lookup::providers::Detector;
use crate::lookup::types::{DetectedLangModel, DetectorKind};

/// 共识规则参数
#[derive(Debug, Clone)]
pub struct ConsensusSettings {
    pub preferred: Vec<String>,
    pub speed_first: bool,
    /// 确认所需的一致检测器数量
    pub confirm_agreement: usize,
    /// 最准确但最慢的检测器
    pub authoritative: Option<DetectorKind>,
    /// 较准确的检测器，回退时优先
    pub accurate: Option<DetectorKind>,
    /// 默认的快速检测器
    pub fast_default: Option<DetectorKind>,
    pub timeout: Duration,
}

impl ConsensusSettings {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            preferred: config
                .preferred_languages()
                .iter()
                .map(|code| code.to_string())
                .collect(),
            speed_first: config.speed_first,
            confirm_agreement: config.confirm_agreement.max(1),
            authoritative: config.authoritative_detector(),
            accurate: config.accurate_detector(),
            fast_default: config.fast_detector(),
            timeout: config.detection_timeout(),
        }
    }

    fn is_preferred(&self, code: &str) -> bool {
        self.preferred.iter().any(|p| p == code)
    }
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self::from_config(&LookupConfig::default())
    }
}

/// 单次检测调用的累积状态
struct ConsensusRound<'a> {
    settings: &'a ConsensusSettings,
    enabled: usize,
    detections: Vec<DetectedLangModel>,
}

impl<'a> ConsensusRound<'a> {
    fn new(settings: &'a ConsensusSettings, enabled: usize) -> Self {
        Self {
            settings,
            enabled,
            detections: Vec::with_capacity(enabled),
        }
    }

    /// 评估新落定的检测结果，返回确认的结果则立即结束
    fn evaluate(&mut self, mut model: DetectedLangModel) -> Option<DetectedLangModel> {
        tracing::debug!("{} 检测结果: {}", model.detector, model.language);

        if Some(model.detector) == self.settings.authoritative && model.is_valid() {
            tracing::debug!("权威检测器确认语言: {}", model.language);
            return Some(model.confirmed());
        }

        if !model.is_valid() {
            return None;
        }

        let agreeing: Vec<&DetectedLangModel> = self
            .detections
            .iter()
            .filter(|d| d.language == model.language && d.detector != model.detector)
            .collect();
        let count = agreeing.len() + 1;

        if count == 1 {
            if self.enabled == 1 {
                return Some(model.confirmed());
            }
            if self.settings.is_preferred(&model.language) {
                model.prior = true;
                if self.settings.speed_first {
                    tracing::debug!("速度优先，确认首个偏好语言: {}", model.language);
                    return Some(model.confirmed());
                }
            }
        }

        if count >= self.settings.confirm_agreement {
            let earliest = agreeing.first().map(|d| (*d).clone()).unwrap_or(model);
            tracing::debug!("{} 个检测器一致，确认语言: {}", count, earliest.language);
            return Some(earliest.confirmed());
        }

        self.detections.push(model);
        None
    }

    /// 全部落定仍未确认时的回退选择
    fn fallback(&self) -> Option<DetectedLangModel> {
        if self.enabled == 1 {
            if let Some(only) = self.detections.first() {
                return Some(only.clone());
            }
        }

        if let Some(prior) = self.detections.iter().find(|d| d.prior) {
            tracing::debug!("回退到首个偏好语言判定: {}", prior.language);
            return Some(prior.clone());
        }

        if let Some(accurate) = self.find_by(self.settings.accurate) {
            return Some(accurate.clone());
        }

        self.find_by(self.settings.fast_default)
            .or_else(|| self.detections.first())
            .cloned()
    }

    fn find_by(&self, kind: Option<DetectorKind>) -> Option<&DetectedLangModel> {
        let kind = kind?;
        self.detections.iter().find(|d| d.detector == kind)
    }
}

/// 语言检测共识引擎
pub struct ConsensusEngine {
    detectors: Vec<Arc<dyn Detector>>,
    local: LocalDetector,
    settings: ConsensusSettings,
    generation: AtomicU64,
}

impl ConsensusEngine {
    pub fn new(detectors: Vec<Arc<dyn Detector>>, local: LocalDetector, settings: ConsensusSettings) -> Self {
        Self {
            detectors,
            local,
            settings,
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(detectors: Vec<Arc<dyn Detector>>, config: &LookupConfig) -> Self {
        Self::new(
            select_detectors(detectors),
            LocalDetector::from_config(config),
            ConsensusSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// 检测文本语言，总会得到结果
    pub async fn detect(&self, text: &str) -> DetectedLangModel {
        self.detect_tracked(text).await.1
    }

    /// 检测并返回本次调用的代数，供调用方丢弃过期结果
    pub async fn detect_tracked(&self, text: &str) -> (u64, DetectedLangModel) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let model = self.run(text).await;
        (generation, model)
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(&self, text: &str) -> DetectedLangModel {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() || self.detectors.is_empty() {
            return self.local.detect_text(&normalized);
        }

        let mut round = ConsensusRound::new(&self.settings, self.detectors.len());
        let mut pending: FuturesUnordered<_> = self
            .detectors
            .iter()
            .map(|detector| {
                let detector = Arc::clone(detector);
                let text = normalized.clone();
                async move {
                    let kind = detector.kind();
                    (kind, detector.detect(&text).await)
                }
            })
            .collect();

        let race = async {
            while let Some((kind, outcome)) = pending.next().await {
                match outcome {
                    Ok(model) => {
                        if let Some(winner) = round.evaluate(model) {
                            return Some(winner);
                        }
                    }
                    Err(e) => tracing::debug!("检测器 {} 失败，不参与投票: {}", kind, e),
                }
            }
            None
        };
        let outcome = tokio::time::timeout(self.settings.timeout, race).await;

        match outcome {
            Ok(Some(winner)) => winner,
            Ok(None) => self.fallback(&round, &normalized),
            Err(_) => {
                tracing::warn!("语言检测超时 ({:?})，使用已有结果", self.settings.timeout);
                self.fallback(&round, &normalized)
            }
        }
    }

    fn fallback(&self, round: &ConsensusRound<'_>, text: &str) -> DetectedLangModel {
        round.fallback().unwrap_or_else(|| {
            tracing::debug!("远程检测均无有效结果，使用本地检测");
            self.local.detect_text(text)
        })
    }
}

/// 选择参与检测的检测器
///
/// 保留可用的远程检测器；低延迟远程检测器总是保留；远程检测器不足时加入系统本地检测器。
pub fn select_detectors(detectors: Vec<Arc<dyn Detector>>) -> Vec<Arc<dyn Detector>> {
    let (remote, local): (Vec<_>, Vec<_>) = detectors.into_iter().partition(|d| d.is_remote());

    let mut selected: Vec<Arc<dyn Detector>> = remote
        .into_iter()
        .filter(|d| d.is_available() || d.is_low_latency())
        .collect();

    if selected.len() < constants::MIN_REMOTE_DETECTORS {
        selected.extend(local.into_iter().filter(|d| d.is_available()));
    }

    selected
}
