//! 分区排序与详情模式判定

use crate::lookup::config::LookupConfig;
use crate::lookup::types::{DictionaryType, QueryType, TranslationType};

/// 提供者的显示顺序：词典在前，类别内按有效优先级
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOrder {
    dictionaries: Vec<DictionaryType>,
    translations: Vec<TranslationType>,
}

impl SectionOrder {
    pub fn new(dictionaries: Vec<DictionaryType>, translations: Vec<TranslationType>) -> Self {
        Self {
            dictionaries,
            translations,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.dictionary_priority(), config.translation_priority())
    }

    /// 排序键，未出现在列表中的排在类别末尾
    pub fn sort_key(&self, query_type: QueryType) -> (u8, usize) {
        match query_type {
            QueryType::Dictionary(d) => (
                0,
                self.dictionaries
                    .iter()
                    .position(|x| *x == d)
                    .unwrap_or(self.dictionaries.len()),
            ),
            QueryType::Translation(t) => (
                1,
                self.translations
                    .iter()
                    .position(|x| *x == t)
                    .unwrap_or(self.translations.len()),
            ),
        }
    }
}

impl Default for SectionOrder {
    fn default() -> Self {
        Self::new(DictionaryType::ALL.to_vec(), TranslationType::ALL.to_vec())
    }
}

/// 文本的书写系统
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptHint {
    Chinese,
    Latin,
    Other,
}

/// 按字符占比判断书写系统
pub fn script_hint(text: &str) -> ScriptHint {
    let total_chars = text.chars().count();
    if total_chars == 0 {
        return ScriptHint::Other;
    }

    let chinese_chars = text
        .chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .count();
    let latin_chars = text.chars().filter(|c| c.is_ascii_alphabetic()).count();

    if chinese_chars as f32 / total_chars as f32 > 0.3 {
        ScriptHint::Chinese
    } else if latin_chars as f32 / total_chars as f32 > 0.5 {
        ScriptHint::Latin
    } else {
        ScriptHint::Other
    }
}

/// 详情模式的长度阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailThresholds {
    pub chinese: usize,
    pub latin: usize,
    pub other: usize,
}

impl DetailThresholds {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            chinese: config.chinese_detail_threshold,
            latin: config.latin_detail_threshold,
            other: config.other_detail_threshold,
        }
    }

    pub fn threshold_for(&self, text: &str) -> usize {
        match script_hint(text) {
            ScriptHint::Chinese => self.chinese,
            ScriptHint::Latin => self.latin,
            ScriptHint::Other => self.other,
        }
    }

    /// 单行译文是否超过所属书写系统的阈值
    pub fn exceeds(&self, text: &str) -> bool {
        text.chars().count() > self.threshold_for(text)
    }
}

impl Default for DetailThresholds {
    fn default() -> Self {
        Self::from_config(&LookupConfig::default())
    }
}
