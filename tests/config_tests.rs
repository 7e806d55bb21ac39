//! Configuration loading from disk and application wiring

use std::io::Write;
use std::path::Path;
use strata::llm::ProviderName;
use strata::utils::toml_config::{ConfigError, LogFormat, ResearchMode, StrataConfig};
use strata::{AppError, AppState};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_full_configuration_file() {
    let file = write_config(
        r#"
[server]
host = "0.0.0.0"
port = 8088
log_format = "json"

[[providers]]
type = "gemini"
timeout_secs = 10

[[providers]]
type = "groq"

[research]
mode = "delegated"
source_timeout_secs = 5

[research.sources]
fundamentals = "http://metrics.local/fundamentals"
macro = "http://metrics.local/macro"

[a2a]
url = "http://executor.local:8001"
deadline_secs = 60

[quality]
objective_weight = 0.5
subjective_weight = 0.5
pass_threshold = 8
max_revisions = 2

[cache]
enabled = false
"#,
    );

    let config = StrataConfig::load(file.path()).unwrap();

    assert_eq!(config.server.port, 8088);
    assert_eq!(config.server.log_format, LogFormat::Json);
    assert_eq!(
        config.providers.iter().map(|p| p.kind).collect::<Vec<_>>(),
        vec![ProviderName::Gemini, ProviderName::Groq]
    );
    assert_eq!(config.research.mode, ResearchMode::Delegated);
    assert_eq!(
        config.research.sources.macro_economy.as_deref(),
        Some("http://metrics.local/macro")
    );
    assert_eq!(config.a2a.deadline_secs, 60);
    assert_eq!(config.quality.pass_threshold, 8);
    assert_eq!(config.quality.max_revisions, 2);
    assert!(!config.cache.enabled);
}

#[test]
fn missing_file_is_reported() {
    let err = StrataConfig::load("/definitely/not/here/strata.toml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[server\nport = ");
    let err = StrataConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn unknown_provider_type_is_rejected() {
    let file = write_config("[[providers]]\ntype = \"mystery\"\n");
    assert!(StrataConfig::load(file.path()).is_err());
}

#[test]
fn shipped_sample_configuration_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("strata.toml");
    let config = StrataConfig::load(path).unwrap();
    assert!(!config.providers.is_empty());
}

#[test]
fn app_state_skips_providers_without_keys() {
    std::env::set_var("STRATA_CFG_TEST_GEMINI_KEY", "secret");
    let config = StrataConfig::parse(
        r#"
[[providers]]
type = "groq"
api_key_env = "STRATA_CFG_TEST_UNSET_GROQ_KEY"

[[providers]]
type = "gemini"
api_key_env = "STRATA_CFG_TEST_GEMINI_KEY"
"#,
    )
    .unwrap();

    let state = AppState::from_config(config).unwrap();

    assert_eq!(state.router.provider_names(), vec![ProviderName::Gemini]);
    assert!(state.task_manager.is_none());
}

#[test]
fn app_state_requires_one_usable_provider() {
    let config = StrataConfig::parse(
        "[[providers]]\ntype = \"groq\"\napi_key_env = \"STRATA_CFG_TEST_NEVER_SET\"\n",
    )
    .unwrap();

    let err = AppState::from_config(config).err().unwrap();
    assert!(matches!(err, AppError::Configuration(_)));
}

#[test]
fn serving_the_executor_mounts_a_task_manager() {
    std::env::set_var("STRATA_CFG_TEST_SERVE_KEY", "secret");
    let config = StrataConfig::parse(
        r#"
[[providers]]
type = "openrouter"
api_key_env = "STRATA_CFG_TEST_SERVE_KEY"

[research]
mode = "delegated"

[a2a]
serve = true
"#,
    )
    .unwrap();

    let state = AppState::from_config(config).unwrap();

    assert!(state.task_manager.is_some());
    assert!(state.workflows.engine().is_delegated());
    assert_eq!(
        state.task_manager.unwrap().card().url,
        "http://127.0.0.1:3000"
    );
}
