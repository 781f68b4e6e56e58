//! 环境变量覆盖集成测试
//!
//! 环境变量是进程级状态，所有场景放在同一个测试里顺序执行

use std::env;
use std::io::Write;

use lexiquery::env::{detection, lookup, EnvVar};
use lexiquery::lookup::{ConfigManager, LookupError, QueryType, TranslationType};

fn clear_vars() {
    for name in [
        lookup::SpeedFirst::NAME,
        lookup::ProxyDelay::NAME,
        lookup::DisabledProviders::NAME,
        detection::ConfirmAgreement::NAME,
    ] {
        env::remove_var(name);
    }
}

#[test]
fn test_env_overrides_file_config() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "speed_first = true\nproxy_delay_ms = 600").unwrap();
    let path = file.path().to_str().unwrap();

    clear_vars();
    let config = ConfigManager::from_file(path).unwrap().into_config();
    assert!(config.speed_first);
    assert_eq!(config.proxy_delay_ms, 600);

    // 有效的覆盖
    env::set_var(lookup::SpeedFirst::NAME, "off");
    env::set_var(lookup::ProxyDelay::NAME, "250");
    env::set_var(lookup::DisabledProviders::NAME, "deepl");
    let config = ConfigManager::from_file(path).unwrap().into_config();
    assert!(!config.speed_first);
    assert_eq!(config.proxy_delay_ms, 250);
    assert!(!config.is_enabled(QueryType::Translation(TranslationType::DeepL)));

    // 设置但无效的变量不会被静默忽略
    env::set_var(lookup::SpeedFirst::NAME, "maybe");
    match ConfigManager::from_file(path) {
        Err(LookupError::ConfigError(message)) => assert!(message.contains(lookup::SpeedFirst::NAME)),
        Err(other) => panic!("expected config error, got {:?}", other),
        Ok(_) => panic!("invalid LEXIQUERY_SPEED_FIRST accepted"),
    }

    env::set_var(lookup::SpeedFirst::NAME, "on");
    env::set_var(detection::ConfirmAgreement::NAME, "9");
    assert!(ConfigManager::from_file(path).is_err());

    clear_vars();
    println!("✅ 环境变量覆盖");
}
