//! 规范语言代码表
//!
//! 所有提供者与检测器的边界都转换到同一套语言代码空间（`en`、`zh-CHS`、`zh-CHT` ...），
//! 加上哨兵值 `auto`。

use whatlang::Lang;

/// 未知语言的哨兵值
pub const AUTO: &str = "auto";

pub const ENGLISH: &str = "en";
pub const CHINESE_SIMPLIFIED: &str = "zh-CHS";
pub const CHINESE_TRADITIONAL: &str = "zh-CHT";

/// 支持的语言条目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageItem {
    /// 规范代码
    pub code: &'static str,
    /// ISO 639-1 代码
    pub iso: &'static str,
    pub english_name: &'static str,
    pub chinese_name: &'static str,
    pub emoji: &'static str,
    pub whatlang: Option<Lang>,
}

const fn item(
    code: &'static str,
    iso: &'static str,
    english_name: &'static str,
    chinese_name: &'static str,
    emoji: &'static str,
    whatlang: Option<Lang>,
) -> LanguageItem {
    LanguageItem {
        code,
        iso,
        english_name,
        chinese_name,
        emoji,
        whatlang,
    }
}

/// 支持的语言列表
pub static LANGUAGES: &[LanguageItem] = &[
    item("zh-CHS", "zh-CN", "Chinese-Simplified", "简体中文", "🇨🇳", Some(Lang::Cmn)),
    item("zh-CHT", "zh-TW", "Chinese-Traditional", "繁体中文", "🇭🇰", None),
    item("en", "en", "English", "英语", "🇬🇧", Some(Lang::Eng)),
    item("ja", "ja", "Japanese", "日语", "🇯🇵", Some(Lang::Jpn)),
    item("ko", "ko", "Korean", "韩语", "🇰🇷", Some(Lang::Kor)),
    item("fr", "fr", "French", "法语", "🇫🇷", Some(Lang::Fra)),
    item("es", "es", "Spanish", "西班牙语", "🇪🇸", Some(Lang::Spa)),
    item("pt", "pt", "Portuguese", "葡萄牙语", "🇵🇹", Some(Lang::Por)),
    item("it", "it", "Italian", "意大利语", "🇮🇹", Some(Lang::Ita)),
    item("de", "de", "German", "德语", "🇩🇪", Some(Lang::Deu)),
    item("ru", "ru", "Russian", "俄语", "🇷🇺", Some(Lang::Rus)),
    item("ar", "ar", "Arabic", "阿拉伯语", "🇸🇦", Some(Lang::Ara)),
    item("sv", "sv", "Swedish", "瑞典语", "🇸🇪", Some(Lang::Swe)),
    item("nl", "nl", "Dutch", "荷兰语", "🇳🇱", Some(Lang::Nld)),
    item("ro", "ro", "Romanian", "罗马尼亚语", "🇷🇴", Some(Lang::Ron)),
    item("th", "th", "Thai", "泰语", "🇹🇭", Some(Lang::Tha)),
    item("sk", "sk", "Slovak", "斯洛伐克语", "🇸🇰", Some(Lang::Slk)),
    item("hu", "hu", "Hungarian", "匈牙利语", "🇭🇺", Some(Lang::Hun)),
    item("el", "el", "Greek", "希腊语", "🇬🇷", Some(Lang::Ell)),
    item("da", "da", "Danish", "丹麦语", "🇩🇰", Some(Lang::Dan)),
    item("fi", "fi", "Finnish", "芬兰语", "🇫🇮", Some(Lang::Fin)),
    item("pl", "pl", "Polish", "波兰语", "🇵🇱", Some(Lang::Pol)),
    item("cs", "cs", "Czech", "捷克语", "🇨🇿", Some(Lang::Ces)),
    item("tr", "tr", "Turkish", "土耳其语", "🇹🇷", Some(Lang::Tur)),
    item("uk", "uk", "Ukrainian", "乌克兰语", "🇺🇦", Some(Lang::Ukr)),
    item("vi", "vi", "Vietnamese", "越南语", "🇻🇳", Some(Lang::Vie)),
    item("id", "id", "Indonesian", "印度尼西亚语", "🇮🇩", Some(Lang::Ind)),
    item("hi", "hi", "Hindi", "印地语", "🇮🇳", Some(Lang::Hin)),
    item("he", "he", "Hebrew", "希伯来语", "🇮🇱", Some(Lang::Heb)),
];

/// 按规范代码查找
pub fn find(code: &str) -> Option<&'static LanguageItem> {
    LANGUAGES.iter().find(|item| item.code == code)
}

/// 是否为有效的规范语言代码（`auto` 与空串无效）
pub fn is_valid_language_code(code: &str) -> bool {
    !code.is_empty() && code != AUTO && find(code).is_some()
}

/// 将外部代码（ISO 639-1、带区域的 BCP 47 标签、大小写不一的规范代码）转换为规范代码
pub fn canonicalize(code: &str) -> Option<&'static str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replace('_', "-").to_lowercase();
    match normalized.as_str() {
        "zh" | "zh-chs" | "zh-cn" | "zh-hans" | "zh-sg" | "zh-hans-cn" | "cmn" => {
            return Some(CHINESE_SIMPLIFIED)
        }
        "zh-cht" | "zh-tw" | "zh-hk" | "zh-mo" | "zh-hant" | "zh-hant-tw" | "cht" => {
            return Some(CHINESE_TRADITIONAL)
        }
        _ => {}
    }

    if let Some(item) = LANGUAGES
        .iter()
        .find(|item| item.code.eq_ignore_ascii_case(&normalized) || item.iso.eq_ignore_ascii_case(&normalized))
    {
        return Some(item.code);
    }

    // en-US -> en
    let primary = normalized.split('-').next().unwrap_or_default();
    LANGUAGES
        .iter()
        .find(|item| item.code == primary || item.iso == primary)
        .map(|item| item.code)
}

pub fn from_whatlang(lang: Lang) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|item| item.whatlang == Some(lang))
        .map(|item| item.code)
}

pub fn to_whatlang(code: &str) -> Option<Lang> {
    match code {
        CHINESE_TRADITIONAL => Some(Lang::Cmn),
        _ => find(code).and_then(|item| item.whatlang),
    }
}

/// 所有可被本地检测器识别的语言
pub fn whatlang_allowlist() -> Vec<Lang> {
    LANGUAGES.iter().filter_map(|item| item.whatlang).collect()
}

pub fn is_chinese(code: &str) -> bool {
    code == CHINESE_SIMPLIFIED || code == CHINESE_TRADITIONAL
}

pub fn emoji(code: &str) -> &'static str {
    find(code).map(|item| item.emoji).unwrap_or("🌐")
}

pub fn english_name(code: &str) -> &'static str {
    find(code).map(|item| item.english_name).unwrap_or("Auto")
}

/// 生成 "🇬🇧 English → 🇨🇳 Chinese-Simplified" 形式的语言标签
///
/// `emoji_only` 为真时只保留国旗。
pub fn from_to_label(from: &str, to: &str, emoji_only: bool) -> String {
    if emoji_only {
        format!("{} → {}", emoji(from), emoji(to))
    } else {
        format!(
            "{} {} → {} {}",
            emoji(from),
            english_name(from),
            emoji(to),
            english_name(to)
        )
    }
}
