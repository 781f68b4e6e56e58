//! 结果聚合与排序
//!
//! 每个提供者落定时整体替换其结果槽，然后重新关联、过滤、排序、命名并判定详情模式。
//! 输出只由结果槽的内容决定，与到达顺序无关。

use std::collections::HashMap;

use super::ordering::{DetailThresholds, SectionOrder};
use crate::lookup::config::LookupConfig;
use crate::lookup::language;
use crate::lookup::types::{
    DictionaryType, DisplaySection, ListDisplayItem, QueryResult, QueryType, TranslationType,
};

pub(crate) const LINKED_DICTIONARY: QueryType = QueryType::Dictionary(DictionaryType::Linguee);
pub(crate) const LINKED_TRANSLATION: QueryType = QueryType::Translation(TranslationType::DeepL);

/// 聚合规则参数
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    pub order: SectionOrder,
    pub thresholds: DetailThresholds,
    /// 有词典词条时合并翻译分区
    pub collapse_translations: bool,
}

impl AggregatorSettings {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            order: SectionOrder::from_config(config),
            thresholds: DetailThresholds::from_config(config),
            collapse_translations: config.collapse_translations_with_dictionary,
        }
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&LookupConfig::default())
    }
}

/// 一次聚合的输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedView {
    /// 可见结果，已排序并填充展示分区
    pub results: Vec<QueryResult>,
    pub sections: Vec<DisplaySection>,
    pub show_detail: bool,
    pub multiple_translations: bool,
}

/// 结果聚合器
#[derive(Debug, Clone)]
pub struct Aggregator {
    settings: AggregatorSettings,
    slots: HashMap<QueryType, QueryResult>,
    from_language: String,
    to_language: String,
}

impl Aggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            slots: HashMap::new(),
            from_language: language::AUTO.to_string(),
            to_language: language::AUTO.to_string(),
        }
    }

    pub fn set_languages(&mut self, from: &str, to: &str) {
        self.from_language = from.to_string();
        self.to_language = to.to_string();
    }

    /// 整体替换该提供者的结果槽
    pub fn settle(&mut self, result: QueryResult) {
        self.slots.insert(result.query_type, result);
    }

    pub fn remove(&mut self, query_type: QueryType) -> Option<QueryResult> {
        self.slots.remove(&query_type)
    }

    pub fn result(&self, query_type: QueryType) -> Option<&QueryResult> {
        self.slots.get(&query_type)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 完整聚合
    pub fn view(&self) -> AggregatedView {
        let mut results: Vec<QueryResult> = self
            .slots
            .values()
            .filter(|r| !r.hide_display)
            .cloned()
            .map(|mut r| {
                r.display_sections = self.render(&r);
                r
            })
            .filter(|r| r.display_sections.iter().any(|s| !s.items.is_empty()))
            .collect();

        results.sort_by_key(|r| self.settings.order.sort_key(r.query_type));

        let has_entries = results.iter().any(|r| r.source.has_dictionary_entries());

        let show_detail = !has_entries
            && results
                .iter()
                .filter(|r| r.query_type.is_translation())
                .any(|r| self.settings.thresholds.exceeds(&r.source.one_line_translation()));

        let collapse = has_entries && self.settings.collapse_translations;
        if collapse {
            let mut kept_translation = false;
            results.retain(|r| {
                if r.query_type.is_dictionary() {
                    return true;
                }
                let keep = !kept_translation;
                kept_translation = true;
                keep
            });
        }

        self.apply_titles(&mut results, show_detail);

        let sections = results
            .iter()
            .flat_map(|r| r.display_sections.iter().cloned())
            .collect();

        AggregatedView {
            results,
            sections,
            show_detail,
            multiple_translations: !collapse,
        }
    }

    /// 由原始输出生成展示分区
    fn render(&self, result: &QueryResult) -> Vec<DisplaySection> {
        let source = &result.source;
        let query_type = result.query_type;

        if query_type.is_dictionary() {
            if source.has_dictionary_entries() {
                let mut sections = source.dictionary_sections.clone();
                if query_type == LINKED_DICTIONARY {
                    self.link_first_item(&mut sections);
                }
                return sections;
            }

            // 没有词条的词典显示关联翻译或自身的译文
            let text = match (query_type == LINKED_DICTIONARY, self.linked_translation_text()) {
                (true, Some(text)) => text,
                _ => source.one_line_translation(),
            };
            return translation_sections(query_type, &text);
        }

        translation_sections(query_type, &source.one_line_translation())
    }

    fn linked_translation_text(&self) -> Option<String> {
        self.slots
            .get(&LINKED_TRANSLATION)
            .map(|r| r.source.one_line_translation())
            .filter(|text| !text.is_empty())
    }

    /// 关联词典的首条显示关联翻译的译文
    fn link_first_item(&self, sections: &mut [DisplaySection]) {
        let Some(text) = self.linked_translation_text() else {
            return;
        };
        if let Some(item) = sections.first_mut().and_then(|s| s.items.first_mut()) {
            item.title = text.clone();
            item.copy_text = text;
        }
    }

    fn apply_titles(&self, results: &mut [QueryResult], show_detail: bool) {
        let label = language::from_to_label(&self.from_language, &self.to_language, show_detail);
        let labeled = |name: &str| format!("{}   ({})", name, label);

        let mut previous_is_translation = false;
        for result in results.iter_mut() {
            let name = result.query_type.name();
            let is_translation = result.query_type.is_translation();

            let title = if is_translation && previous_is_translation {
                name.to_string()
            } else {
                labeled(name)
            };
            if let Some(first) = result.display_sections.first_mut() {
                first.title = title;
            }

            previous_is_translation = is_translation;
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregatorSettings::default())
    }
}

fn translation_sections(query_type: QueryType, text: &str) -> Vec<DisplaySection> {
    if text.is_empty() {
        return Vec::new();
    }
    let key = format!("{}-{}", text, query_type.name());
    vec![DisplaySection::new(query_type, query_type.name())
        .with_item(ListDisplayItem::new(query_type, &key, text))]
}
