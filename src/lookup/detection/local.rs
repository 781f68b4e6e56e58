//! 本地语言检测
//!
//! 基于 whatlang 三元组统计，限定在支持的语言内；统计失败时退回字符集启发式。
//! 本地检测永不失败，最差返回 `auto`。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use whatlang::{Detector as WhatlangDetector, Lang};

use crate::lookup::config::LookupConfig;
use crate::lookup::error::LookupResult;
use crate::lookup::language;
use crate::lookup::providers::Detector;
use crate::lookup::types::{DetectedLangModel, DetectorKind};

/// 本地统计检测器
pub struct LocalDetector {
    detector: WhatlangDetector,
    preferred: Vec<String>,
    preferred_langs: Vec<Lang>,
    high_confidence: f64,
    low_confidence: f64,
}

impl LocalDetector {
    pub fn new(preferred: &[&str], high_confidence: f64, low_confidence: f64) -> Self {
        let mut preferred_langs: Vec<Lang> = Vec::new();
        for code in preferred {
            if let Some(lang) = language::to_whatlang(code) {
                if !preferred_langs.contains(&lang) {
                    preferred_langs.push(lang);
                }
            }
        }

        Self {
            detector: WhatlangDetector::with_allowlist(language::whatlang_allowlist()),
            preferred: preferred.iter().map(|code| code.to_string()).collect(),
            preferred_langs,
            high_confidence,
            low_confidence,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            &config.preferred_languages(),
            config.high_confidence,
            config.low_confidence,
        )
    }

    fn is_preferred(&self, code: &str) -> bool {
        self.preferred.iter().any(|p| p == code)
    }

    /// 检测文本语言
    pub fn detect_text(&self, text: &str) -> DetectedLangModel {
        let Some(info) = self.detector.detect(text) else {
            tracing::debug!("统计检测无结果，使用字符集启发式");
            return self.simple_detect(text);
        };

        let top_lang = info.lang();
        let top_code = language::from_whatlang(top_lang);
        let top_confidence = info.confidence();

        let mut candidates: Vec<(String, f64)> = Vec::new();
        if let Some(code) = top_code {
            candidates.push((code.to_string(), top_confidence));
        }

        // 在首选语言与统计首选之间再比较一次，得到偏好语言的候选
        if let Some((code, confidence)) = self.preferred_candidate(text, top_lang) {
            if !candidates.iter().any(|(c, _)| c == code) {
                candidates.push((code.to_string(), confidence));
            }
        }
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let native = top_lang.code();

        if let Some(code) = top_code {
            if top_confidence > self.high_confidence && self.is_preferred(code) {
                tracing::debug!("本地检测确认语言: {} ({:.2})", code, top_confidence);
                let mut model = DetectedLangModel::new(DetectorKind::Local, code, native).confirmed();
                model.candidates = candidates;
                return model;
            }
        }

        if let Some((code, confidence)) = candidates
            .iter()
            .find(|(code, confidence)| *confidence > self.low_confidence && self.is_preferred(code))
        {
            tracing::debug!("本地检测偏好语言（未确认）: {} ({:.2})", code, confidence);
            let mut model = DetectedLangModel::new(DetectorKind::Local, code, native);
            model.candidates = candidates.clone();
            return model;
        }

        if let Some(code) = top_code {
            tracing::debug!("本地检测使用统计首选（未确认）: {}", code);
            let mut model = DetectedLangModel::new(DetectorKind::Local, code, native);
            model.candidates = candidates;
            return model;
        }

        self.simple_detect(text)
    }

    fn preferred_candidate(&self, text: &str, top_lang: Lang) -> Option<(&'static str, f64)> {
        if self.preferred_langs.is_empty() {
            return None;
        }

        let mut allowlist = self.preferred_langs.clone();
        if !allowlist.contains(&top_lang) {
            allowlist.push(top_lang);
        }

        let info = WhatlangDetector::with_allowlist(allowlist).detect(text)?;
        if !self.preferred_langs.contains(&info.lang()) {
            return None;
        }
        let code = language::from_whatlang(info.lang())?;
        Some((code, info.confidence()))
    }

    /// 字符集启发式：纯 ASCII 字母数字视为英语，纯汉字视为中文
    pub fn simple_detect(&self, text: &str) -> DetectedLangModel {
        let stripped = strip_non_word(text);

        let code = if stripped.is_empty() {
            language::AUTO
        } else if stripped.chars().all(|c| c.is_ascii_alphanumeric()) && self.is_preferred(language::ENGLISH) {
            language::ENGLISH
        } else if stripped.chars().all(is_cjk) {
            self.preferred_chinese().unwrap_or(language::AUTO)
        } else {
            language::AUTO
        };

        DetectedLangModel::new(DetectorKind::Simple, code, code)
    }

    fn preferred_chinese(&self) -> Option<&'static str> {
        [language::CHINESE_SIMPLIFIED, language::CHINESE_TRADITIONAL]
            .into_iter()
            .find(|code| self.is_preferred(code))
    }
}

#[async_trait]
impl Detector for LocalDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Local
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn is_low_latency(&self) -> bool {
        true
    }

    async fn detect(&self, text: &str) -> LookupResult<DetectedLangModel> {
        Ok(self.detect_text(text))
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// 去除空白与标点
fn strip_non_word(text: &str) -> String {
    static NON_WORD: OnceLock<Option<Regex>> = OnceLock::new();

    match NON_WORD.get_or_init(|| Regex::new(r"[\W_]+").ok()) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.chars().filter(|c| c.is_alphanumeric()).collect(),
    }
}
