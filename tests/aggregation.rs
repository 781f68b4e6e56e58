//! 结果聚合与配置加载集成测试

use std::io::Write;

use lexiquery::lookup::{
    Aggregator, AggregatorSettings, ConfigManager, DictionaryType, DisplaySection, ListDisplayItem,
    LookupConfig, QueryResult, QueryType, QueryTypeResult, QueryWordInfo, TranslationType,
};

fn info() -> QueryWordInfo {
    QueryWordInfo::new("good", "en", "zh-CHS")
}

fn translation(t: TranslationType, text: &str, hidden: bool) -> QueryResult {
    QueryResult::new(
        QueryTypeResult::new(t.into(), &info()).with_translations([text]),
        hidden,
    )
}

fn dictionary(d: DictionaryType, entries: &[&str]) -> QueryResult {
    let query_type = QueryType::Dictionary(d);
    let sections = if entries.is_empty() {
        Vec::new()
    } else {
        let mut section = DisplaySection::new(query_type, "释义");
        for (i, entry) in entries.iter().enumerate() {
            section = section.with_item(ListDisplayItem::new(query_type, &format!("{}-{}", d.name(), i), entry));
        }
        vec![section]
    };
    QueryResult::new(QueryTypeResult::new(query_type, &info()).with_sections(sections), false)
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            all.push(tail);
        }
    }
    all
}

fn aggregate(settings: &AggregatorSettings, results: &[QueryResult]) -> Aggregator {
    let mut aggregator = Aggregator::new(settings.clone());
    aggregator.set_languages("en", "zh-CHS");
    for result in results {
        aggregator.settle(result.clone());
    }
    aggregator
}

/// 任意到达顺序得到相同的输出
#[test]
fn test_aggregation_is_order_independent() {
    let results = vec![
        dictionary(DictionaryType::Linguee, &["good", "fine"]),
        translation(TranslationType::DeepL, "好的", true),
        translation(TranslationType::Google, "好", false),
        translation(TranslationType::Bing, "  ", false),
        dictionary(DictionaryType::Iciba, &[]),
    ];

    for settings in [
        AggregatorSettings::default(),
        AggregatorSettings {
            collapse_translations: false,
            ..AggregatorSettings::default()
        },
    ] {
        let orders = permutations(&results);
        assert_eq!(orders.len(), 120);

        let expected = aggregate(&settings, &orders[0]).view();
        for order in &orders[1..] {
            assert_eq!(aggregate(&settings, order).view(), expected);
        }

        assert_eq!(expected.sections[0].section_type, QueryType::Dictionary(DictionaryType::Linguee));
        assert_eq!(expected.sections[0].items[0].title, "好的");
    }

    println!("✅ 120 种到达顺序结果一致");
}

/// 用户排序覆盖在前，未知名称与重复名称被忽略
#[test]
fn test_user_order_override() {
    let config = LookupConfig {
        translation_order: vec![
            "Bing".to_string(),
            "not-a-provider".to_string(),
            "openai".to_string(),
            "bing".to_string(),
        ],
        collapse_translations_with_dictionary: false,
        ..LookupConfig::default()
    };
    let settings = AggregatorSettings::from_config(&config);

    let view = aggregate(
        &settings,
        &[
            translation(TranslationType::Google, "好", false),
            translation(TranslationType::DeepL, "好的", false),
            translation(TranslationType::OpenAI, "很好", false),
            translation(TranslationType::Bing, "良好", false),
            dictionary(DictionaryType::Youdao, &["adj. 好的"]),
        ],
    )
    .view();

    let order: Vec<QueryType> = view.results.iter().map(|r| r.query_type).collect();
    assert_eq!(
        order,
        vec![
            QueryType::Dictionary(DictionaryType::Youdao),
            QueryType::Translation(TranslationType::Bing),
            QueryType::Translation(TranslationType::OpenAI),
            QueryType::Translation(TranslationType::DeepL),
            QueryType::Translation(TranslationType::Google),
        ]
    );
    // 词典后的首个翻译带语言标签，其余只有名称
    assert!(view.sections[1].title.starts_with("Bing Translate   ("));
    assert_eq!(view.sections[2].title, "OpenAI Translate");

    println!("✅ 排序覆盖");
}

/// 中文阈值 45：46 字进入详情模式，44 字不进入
#[test]
fn test_detail_mode_threshold() {
    let settings = AggregatorSettings::default();

    let long = aggregate(&settings, &[translation(TranslationType::Google, &"好".repeat(46), false)]);
    assert!(long.view().show_detail);

    let short = aggregate(&settings, &[translation(TranslationType::Google, &"好".repeat(44), false)]);
    assert!(!short.view().show_detail);

    let latin = aggregate(&settings, &[translation(TranslationType::Google, &"a".repeat(101), false)]);
    assert!(latin.view().show_detail);

    let with_entries = aggregate(
        &settings,
        &[
            translation(TranslationType::Google, &"好".repeat(46), false),
            dictionary(DictionaryType::Youdao, &["adj. 好的"]),
        ],
    );
    assert!(!with_entries.view().show_detail);

    println!("✅ 详情模式阈值");
}

/// 从 TOML 文件加载配置
#[test]
fn test_load_toml_config() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
language1 = "en"
language2 = "ja"
speed_first = false
proxy_delay_ms = 250
translation_order = ["bing", "nonsense", "google", "bing"]

[provider_switches]
deepl = false
youdao_dict = true
"#
    )
    .unwrap();

    let config = ConfigManager::from_file(file.path().to_str().unwrap())
        .unwrap()
        .into_config();

    assert_eq!(config.preferred_languages(), ["en", "ja"]);
    assert!(!config.speed_first);
    assert_eq!(config.proxy_delay_ms, 250);
    assert_eq!(config.native_delay_offset_ms, 400);
    assert!(!config.is_enabled(QueryType::Translation(TranslationType::DeepL)));
    assert!(config.is_enabled(QueryType::Dictionary(DictionaryType::Youdao)));
    assert!(config.is_enabled(QueryType::Translation(TranslationType::Google)));

    let priority = config.translation_priority();
    assert_eq!(&priority[..3], &[TranslationType::Bing, TranslationType::Google, TranslationType::DeepL]);
    assert_eq!(priority.len(), TranslationType::ALL.len());

    println!("✅ TOML 配置加载");
}

/// 从 JSON 文件加载配置
#[test]
fn test_load_json_config() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"language1": "zh-CHS", "language2": "fr", "confirm_agreement": 3, "chinese_detail_threshold": 60}}"#
    )
    .unwrap();

    let config = ConfigManager::from_file(file.path().to_str().unwrap())
        .unwrap()
        .into_config();

    assert_eq!(config.language2, "fr");
    assert_eq!(config.confirm_agreement, 3);
    assert_eq!(config.chinese_detail_threshold, 60);
    assert_eq!(config.latin_detail_threshold, 100);

    println!("✅ JSON 配置加载");
}

/// 非法配置被拒绝
#[test]
fn test_invalid_config_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "language1 = \"en\"\nlanguage2 = \"en\"").unwrap();
    assert!(ConfigManager::from_file(file.path().to_str().unwrap()).is_err());

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "audio_provider = \"google\"").unwrap();
    assert!(ConfigManager::from_file(file.path().to_str().unwrap()).is_err());

    assert!(ConfigManager::from_file("/nonexistent/lexiquery.toml").is_err());

    println!("✅ 非法配置被拒绝");
}

/// 生成的示例配置可以重新加载
#[test]
fn test_generated_example_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lexiquery.toml");
    let path = path.to_str().unwrap();

    ConfigManager::generate_example_config(path).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("language1"));
    assert!(content.contains("proxy_delay_ms"));

    let loaded = ConfigManager::from_file(path).unwrap().into_config();
    assert_eq!(loaded.debounce_delay_ms, LookupConfig::default().debounce_delay_ms);
    assert_eq!(loaded.audio_provider, LookupConfig::default().audio_provider);

    println!("✅ 示例配置");
}
