//! Integration tests for lyceum.toml loading
//!
//! These tests write configuration files to a temporary directory and load
//! them through `LyceumConfig` and `ConfigManager`.

use lyceum::utils::toml_config::{
    ConfigError, ConfigManager, LyceumConfig, ModelRole, ProviderConfig,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("lyceum.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_full_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[workflow]
model = "qwen2.5"
max_steps = 7
plan_retry_limit = 1
step_timeout_secs = 45
plan_timeout_secs = 20

[models]
editor = "llama3.1"

[provider]
type = "ollama"
base_url = "http://gpu-box:11434"

[tools]
web_search = false

[output]
dir = "reports"
"#,
    );

    let config = LyceumConfig::load(&path).unwrap();
    assert_eq!(config.model_for(ModelRole::Editor), "llama3.1");
    assert_eq!(config.model_for(ModelRole::Research), "qwen2.5");
    assert!(!config.tools.web_search);
    assert!(config.tools.fetch_page);
    assert_eq!(config.output.dir, std::path::PathBuf::from("reports"));
    assert_eq!(
        config.provider,
        ProviderConfig::Ollama {
            base_url: "http://gpu-box:11434".to_string()
        }
    );

    let settings = config.workflow_settings();
    assert_eq!(settings.max_steps, 7);
    assert_eq!(settings.plan_retry_limit, 1);
    assert_eq!(settings.step_timeout, Duration::from_secs(45));
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[workflow]\nmax_steps = 0\n");
    assert!(matches!(
        LyceumConfig::load(&path),
        Err(ConfigError::ValidationError(_))
    ));

    let path = write_config(&dir, "[workflow\nmodel = ");
    assert!(matches!(
        LyceumConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(dir.path().join("absent.toml")).unwrap();
    let config = manager.config();
    assert_eq!(config.workflow.plan_retry_limit, 2);
    assert_eq!(config.provider, ProviderConfig::default());
}

#[test]
fn test_reload_swaps_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[workflow]\nmax_steps = 4\n");
    let manager = ConfigManager::new(&path).unwrap();

    let before = manager.config();
    write_config(&dir, "[workflow]\nmax_steps = 9\n");
    manager.reload().unwrap();

    assert_eq!(before.workflow.max_steps, 4);
    assert_eq!(manager.config().workflow.max_steps, 9);
}

#[test]
fn test_failed_reload_keeps_previous_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[workflow]\nmax_steps = 4\n");
    let manager = ConfigManager::new(&path).unwrap();

    write_config(&dir, "[workflow]\nplan_retry_limit = 99\n");
    assert!(manager.reload().is_err());
    assert_eq!(manager.config().workflow.max_steps, 4);
}
