use std::fs;

use td::config::Config;
use td::splitter::SplitMode;
use td::task::{Category, Priority};
use td::view::{SortMode, StatusFilter};

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_or_default(&dir.path().join("config.toml"));

    assert_eq!(config.defaults.category().unwrap(), Category::Work);
    assert_eq!(config.defaults.priority().unwrap(), Priority::Medium);
    assert_eq!(config.view.status().unwrap(), StatusFilter::All);
    assert_eq!(config.view.sort().unwrap(), SortMode::Date);
    assert_eq!(config.ai.mode().unwrap(), SplitMode::Mock);
    assert_eq!(config.ai.mock_delay_ms, 1500);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    let toml = r#"
[defaults]
category = "health"
priority = "high"

[view]
status = "active"
sort = "priority"

[ai]
mode = "real"
endpoint = "http://localhost:8080/generate"
credential_env = "MY_KEY"
mock_delay_ms = 10

[notify]
events = "-"
"#;

    fs::write(&config_path, toml)?;

    let config = Config::load(&config_path)?;

    assert_eq!(config.defaults.category()?, Category::Health);
    assert_eq!(config.defaults.priority()?, Priority::High);
    assert_eq!(config.view.status()?, StatusFilter::Active);
    assert_eq!(config.view.sort()?, SortMode::Priority);
    assert_eq!(config.ai.mode()?, SplitMode::Real);
    assert_eq!(config.ai.endpoint, "http://localhost:8080/generate");
    assert_eq!(config.ai.credential_env, "MY_KEY");
    assert_eq!(config.ai.mock_delay_ms, 10);
    assert_eq!(config.notify.events, "-");

    Ok(())
}

#[test]
fn config_load_rejects_invalid_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "this = [not valid").expect("write config");

    let result = Config::load(&config_path);
    assert!(result.is_err());
}
