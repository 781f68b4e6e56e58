//! 查询核心数据模型

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LookupError;
use super::language;

// ============================================================================
// 提供者标识
// ============================================================================

/// 词典类提供者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DictionaryType {
    Linguee,
    Youdao,
    Iciba,
}

impl DictionaryType {
    /// 默认排序
    pub const ALL: [DictionaryType; 3] = [
        DictionaryType::Linguee,
        DictionaryType::Youdao,
        DictionaryType::Iciba,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DictionaryType::Linguee => "Linguee Dictionary",
            DictionaryType::Youdao => "Youdao Dictionary",
            DictionaryType::Iciba => "iCiba Dictionary",
        }
    }
}

impl FromStr for DictionaryType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_name(s);
        let stem = key
            .strip_suffix("dictionary")
            .or_else(|| key.strip_suffix("dict"))
            .unwrap_or(&key);
        match stem {
            "linguee" => Ok(DictionaryType::Linguee),
            "youdao" => Ok(DictionaryType::Youdao),
            "iciba" | "kingsoft" => Ok(DictionaryType::Iciba),
            _ => Err(LookupError::ParseError(format!("未知的词典: {}", s))),
        }
    }
}

/// 翻译类提供者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TranslationType {
    DeepL,
    Google,
    Bing,
    Apple,
    Baidu,
    Tencent,
    Volcano,
    Youdao,
    Caiyun,
    OpenAI,
}

impl TranslationType {
    /// 默认排序
    pub const ALL: [TranslationType; 10] = [
        TranslationType::DeepL,
        TranslationType::Google,
        TranslationType::Bing,
        TranslationType::Apple,
        TranslationType::Baidu,
        TranslationType::Tencent,
        TranslationType::Volcano,
        TranslationType::Youdao,
        TranslationType::Caiyun,
        TranslationType::OpenAI,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TranslationType::DeepL => "DeepL Translate",
            TranslationType::Google => "Google Translate",
            TranslationType::Bing => "Bing Translate",
            TranslationType::Apple => "Apple Translate",
            TranslationType::Baidu => "Baidu Translate",
            TranslationType::Tencent => "Tencent Translate",
            TranslationType::Volcano => "Volcano Translate",
            TranslationType::Youdao => "Youdao Translate",
            TranslationType::Caiyun => "Caiyun Translate",
            TranslationType::OpenAI => "OpenAI Translate",
        }
    }
}

impl FromStr for TranslationType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_name(s);
        let stem = ["translator", "translation", "translate"]
            .iter()
            .find_map(|suffix| key.strip_suffix(suffix))
            .unwrap_or(&key);
        match stem {
            "deepl" => Ok(TranslationType::DeepL),
            "google" => Ok(TranslationType::Google),
            "bing" | "microsoft" => Ok(TranslationType::Bing),
            "apple" | "system" => Ok(TranslationType::Apple),
            "baidu" => Ok(TranslationType::Baidu),
            "tencent" => Ok(TranslationType::Tencent),
            "volcano" | "volcengine" => Ok(TranslationType::Volcano),
            "youdao" => Ok(TranslationType::Youdao),
            "caiyun" => Ok(TranslationType::Caiyun),
            "openai" | "chatgpt" => Ok(TranslationType::OpenAI),
            _ => Err(LookupError::ParseError(format!("未知的翻译服务: {}", s))),
        }
    }
}

fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// 提供者标识：词典或翻译
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryType {
    Dictionary(DictionaryType),
    Translation(TranslationType),
}

impl QueryType {
    pub fn name(&self) -> &'static str {
        match self {
            QueryType::Dictionary(d) => d.name(),
            QueryType::Translation(t) => t.name(),
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, QueryType::Dictionary(_))
    }

    pub fn is_translation(&self) -> bool {
        matches!(self, QueryType::Translation(_))
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 解析用户配置里的提供者名称
///
/// 带 `dictionary`/`dict` 后缀的名称视为词典，其余优先按翻译服务解析。
impl FromStr for QueryType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_name(s);
        if key.ends_with("dictionary") || key.ends_with("dict") {
            return s.parse().map(QueryType::Dictionary);
        }
        s.parse::<TranslationType>()
            .map(QueryType::Translation)
            .or_else(|_| s.parse().map(QueryType::Dictionary))
    }
}

impl From<DictionaryType> for QueryType {
    fn from(value: DictionaryType) -> Self {
        QueryType::Dictionary(value)
    }
}

impl From<TranslationType> for QueryType {
    fn from(value: TranslationType) -> Self {
        QueryType::Translation(value)
    }
}

// ============================================================================
// 语言检测
// ============================================================================

/// 检测器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    /// 本地统计检测
    Local,
    /// 字符集启发式
    Simple,
    /// 远程翻译服务的检测接口
    Service(TranslationType),
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Local => f.write_str("local"),
            DetectorKind::Simple => f.write_str("simple"),
            DetectorKind::Service(t) => write!(f, "{} detect", t.name()),
        }
    }
}

/// 单个检测器的判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLangModel {
    pub detector: DetectorKind,
    /// 规范语言代码
    pub language: String,
    /// 检测器原始返回的代码
    pub native_code: String,
    pub confirmed: bool,
    /// 首个偏好语言判定
    pub prior: bool,
    /// 候选语言及置信度，按置信度降序
    pub candidates: Vec<(String, f64)>,
}

impl DetectedLangModel {
    pub fn new(detector: DetectorKind, language: &str, native_code: &str) -> Self {
        Self {
            detector,
            language: language.to_string(),
            native_code: native_code.to_string(),
            confirmed: false,
            prior: false,
            candidates: Vec::new(),
        }
    }

    /// 从检测器原始代码构造，无法识别时为 `auto`
    pub fn from_native(detector: DetectorKind, native_code: &str) -> Self {
        let language = language::canonicalize(native_code).unwrap_or(language::AUTO);
        Self::new(detector, language, native_code)
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    pub fn is_valid(&self) -> bool {
        language::is_valid_language_code(&self.language)
    }
}

// ============================================================================
// 查询词信息
// ============================================================================

/// 一次查询的规范化单元
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryWordInfo {
    pub word: String,
    pub from_language: String,
    pub to_language: String,
    pub is_word: Option<bool>,
    pub has_dictionary_entries: Option<bool>,
    pub phonetic: Option<String>,
    pub exam_types: Vec<String>,
    pub speech_url: Option<String>,
    pub detected_language: Option<DetectedLangModel>,
}

impl QueryWordInfo {
    pub fn new(word: &str, from_language: &str, to_language: &str) -> Self {
        Self {
            word: word.to_string(),
            from_language: from_language.to_string(),
            to_language: to_language.to_string(),
            ..Default::default()
        }
    }
}

/// 提供者发现的附加信息，由调度层合并进会话的查询词信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordInfoPatch {
    pub is_word: Option<bool>,
    pub has_dictionary_entries: Option<bool>,
    pub phonetic: Option<String>,
    pub exam_types: Option<Vec<String>>,
    pub speech_url: Option<String>,
}

impl WordInfoPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, info: &mut QueryWordInfo) {
        if let Some(is_word) = self.is_word {
            info.is_word = Some(is_word);
        }
        if let Some(has_entries) = self.has_dictionary_entries {
            info.has_dictionary_entries = Some(has_entries);
        }
        if let Some(phonetic) = &self.phonetic {
            info.phonetic = Some(phonetic.clone());
        }
        if let Some(exam_types) = &self.exam_types {
            info.exam_types = exam_types.clone();
        }
        if let Some(speech_url) = &self.speech_url {
            info.speech_url = Some(speech_url.clone());
        }
    }
}

// ============================================================================
// 查询结果
// ============================================================================

/// 提供者的原始输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTypeResult {
    pub query_type: QueryType,
    pub translations: Vec<String>,
    /// 词典提供者自行渲染的分区，为空表示没有词条
    pub dictionary_sections: Vec<DisplaySection>,
    pub raw: Option<serde_json::Value>,
    /// 发起调用时的查询词信息
    pub word_info: QueryWordInfo,
    pub patch: Option<WordInfoPatch>,
}

impl QueryTypeResult {
    pub fn new(query_type: QueryType, word_info: &QueryWordInfo) -> Self {
        Self {
            query_type,
            translations: Vec::new(),
            dictionary_sections: Vec::new(),
            raw: None,
            word_info: word_info.clone(),
            patch: None,
        }
    }

    pub fn with_translations<I, S>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.translations = translations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sections(mut self, sections: Vec<DisplaySection>) -> Self {
        self.dictionary_sections = sections;
        self
    }

    pub fn with_patch(mut self, patch: WordInfoPatch) -> Self {
        self.patch = Some(patch);
        self
    }

    /// 单行译文
    pub fn one_line_translation(&self) -> String {
        self.translations
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_dictionary_entries(&self) -> bool {
        self.query_type.is_dictionary()
            && self.dictionary_sections.iter().any(|s| !s.items.is_empty())
    }
}

/// 会话持有的结果槽
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query_type: QueryType,
    pub source: QueryTypeResult,
    pub display_sections: Vec<DisplaySection>,
    pub hide_display: bool,
}

impl QueryResult {
    pub fn new(source: QueryTypeResult, hide_display: bool) -> Self {
        Self {
            query_type: source.query_type,
            source,
            display_sections: Vec::new(),
            hide_display,
        }
    }
}

// ============================================================================
// 展示模型
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySection {
    pub section_type: QueryType,
    pub title: String,
    pub items: Vec<ListDisplayItem>,
}

impl DisplaySection {
    pub fn new(section_type: QueryType, title: &str) -> Self {
        Self {
            section_type,
            title: title.to_string(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: ListDisplayItem) -> Self {
        self.items.push(item);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDisplayItem {
    pub key: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub copy_text: String,
    pub query_type: QueryType,
}

impl ListDisplayItem {
    pub fn new(query_type: QueryType, key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            subtitle: None,
            copy_text: title.to_string(),
            query_type,
        }
    }
}

/// 推送给界面的完整快照，每次都是整体替换
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub session_id: u64,
    pub loading: bool,
    pub sections: Vec<DisplaySection>,
    pub show_detail: bool,
    pub multiple_translations: bool,
    pub from_language: String,
    pub to_language: String,
}

impl DisplaySnapshot {
    pub fn empty(session_id: u64) -> Self {
        Self {
            session_id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_parsing() {
        assert_eq!(
            "deepl".parse::<QueryType>().unwrap(),
            QueryType::Translation(TranslationType::DeepL)
        );
        assert_eq!(
            "Linguee".parse::<QueryType>().unwrap(),
            QueryType::Dictionary(DictionaryType::Linguee)
        );
        assert_eq!(
            "youdao_dict".parse::<QueryType>().unwrap(),
            QueryType::Dictionary(DictionaryType::Youdao)
        );
        assert_eq!(
            "Youdao Translate".parse::<QueryType>().unwrap(),
            QueryType::Translation(TranslationType::Youdao)
        );
        assert!("gooogle".parse::<QueryType>().is_err());

        assert_eq!("iciba".parse::<DictionaryType>().unwrap(), DictionaryType::Iciba);
        assert_eq!("OpenAI".parse::<TranslationType>().unwrap(), TranslationType::OpenAI);
    }

    #[test]
    fn test_one_line_translation() {
        let info = QueryWordInfo::new("good", "en", "zh-CHS");
        let result = QueryTypeResult::new(TranslationType::Google.into(), &info)
            .with_translations(["好的", " ", "良好"]);
        assert_eq!(result.one_line_translation(), "好的, 良好");
        assert!(!result.has_dictionary_entries());
    }

    #[test]
    fn test_patch_apply() {
        let mut info = QueryWordInfo::new("good", "en", "zh-CHS");
        let patch = WordInfoPatch {
            is_word: Some(true),
            phonetic: Some("ɡʊd".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut info);
        assert_eq!(info.is_word, Some(true));
        assert_eq!(info.phonetic.as_deref(), Some("ɡʊd"));
        assert!(info.speech_url.is_none());
        assert!(WordInfoPatch::default().is_empty());
    }

    #[test]
    fn test_detected_from_native() {
        let model = DetectedLangModel::from_native(DetectorKind::Service(TranslationType::Google), "zh-CN");
        assert_eq!(model.language, "zh-CHS");
        assert!(model.is_valid());
        assert!(!DetectedLangModel::auto(DetectorKind::Simple).is_valid());
    }
}
