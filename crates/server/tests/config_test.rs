//! # Configuration Tests
//!
//! Tests for the layered configuration loading. The config module is included
//! directly so the tests exercise exactly the code the server runs. Tests that
//! touch environment variables run serially.

#[path = "../src/config.rs"]
mod config;

use self::config::{get_config, ConfigError};
use casewatch::prompts::PromptTemplates;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

const VARS: &[&str] = &[
    "PORT",
    "DB_URL",
    "JWT_SECRET",
    "CASEWATCH_TEST_SEARCH_KEY",
    "CASEWATCH_PIPELINE__RELEVANCE_FLOOR",
    "CASEWATCH_PIPELINE__TOP_K",
    "CASEWATCH_SEARCH__ENGINE_ID",
];

/// Clears every environment variable these tests set.
fn clear_env_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

const MINIMAL_CONFIG: &str = r#"
jwt_secret: "file-secret"
generation:
  provider: "local"
  api_url: "http://localhost:1234/v1/chat/completions"
  model_name: "llama"
embedding:
  api_url: "http://localhost:1234/v1/embeddings"
  model_name: "nomic-embed"
search:
  api_key: "${CASEWATCH_TEST_SEARCH_KEY}"
  engine_id: "engine-1"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config file");
    file
}

fn load(file: &NamedTempFile) -> Result<config::AppConfig, ConfigError> {
    get_config(Some(file.path().to_str().expect("temp path is UTF-8")))
}

#[test]
#[serial]
fn test_defaults_fill_omitted_sections() {
    clear_env_vars();
    env::set_var("CASEWATCH_TEST_SEARCH_KEY", "substituted-key");
    let file = write_config(MINIMAL_CONFIG);

    let config = load(&file).expect("Configuration should load successfully");

    assert_eq!(config.port, 8082);
    assert_eq!(config.db_url, "db/casewatch.db");
    assert_eq!(config.jwt_secret, "file-secret");
    assert_eq!(config.generation.provider, "local");
    assert!(config.ner.is_none());
    assert_eq!(config.search.api_key, "substituted-key");
    assert_eq!(config.pipeline.relevance_floor, 0.75);
    assert_eq!(config.pipeline.top_k, 3);
    assert_eq!(config.prompts, PromptTemplates::default());

    clear_env_vars();
}

#[test]
#[serial]
fn test_unset_placeholder_becomes_empty() {
    clear_env_vars();
    let file = write_config(MINIMAL_CONFIG);

    let config = load(&file).expect("Configuration should load successfully");
    assert_eq!(config.search.api_key, "");
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env_vars();
    env::set_var("PORT", "9999");
    env::set_var("JWT_SECRET", "env-secret");
    env::set_var("CASEWATCH_PIPELINE__RELEVANCE_FLOOR", "0.8");
    env::set_var("CASEWATCH_PIPELINE__TOP_K", "5");
    env::set_var("CASEWATCH_SEARCH__ENGINE_ID", "engine-from-env");
    let file = write_config(MINIMAL_CONFIG);

    let config = load(&file).expect("Configuration should load successfully");

    assert_eq!(config.port, 9999);
    assert_eq!(config.jwt_secret, "env-secret");
    assert!((config.pipeline.relevance_floor - 0.8).abs() < 1e-6);
    assert_eq!(config.pipeline.top_k, 5);
    // Untouched pipeline settings keep their defaults.
    assert_eq!(config.pipeline.max_terms, 15);
    assert_eq!(config.search.engine_id, "engine-from-env");

    clear_env_vars();
}

#[test]
#[serial]
fn test_single_prompt_override_keeps_other_defaults() {
    clear_env_vars();
    let content = format!(
        "{MINIMAL_CONFIG}\nprompts:\n  alert_rationale:\n    system_prompt: \"You are a cautious reviewer.\"\n"
    );
    let file = write_config(&content);

    let config = load(&file).expect("Configuration should load successfully");
    let defaults = PromptTemplates::default();

    assert_eq!(
        config.prompts.alert_rationale.system_prompt,
        "You are a cautious reviewer."
    );
    assert_eq!(
        config.prompts.alert_rationale.user_prompt,
        defaults.alert_rationale.user_prompt
    );
    assert_eq!(config.prompts.concept_extraction, defaults.concept_extraction);
}

#[test]
#[serial]
fn test_pipeline_section_is_read() {
    clear_env_vars();
    let content = format!(
        "{MINIMAL_CONFIG}\npipeline:\n  article_representation: \"title_snippet\"\n  default_upload_limit: 3\n  embedding_dimension: 768\n"
    );
    let file = write_config(&content);

    let config = load(&file).expect("Configuration should load successfully");
    assert_eq!(
        config.pipeline.article_representation,
        casewatch::settings::ArticleRepresentation::TitleSnippet
    );
    assert_eq!(config.pipeline.default_upload_limit, 3);
    assert_eq!(config.pipeline.embedding_dimension, Some(768));
}

#[test]
#[serial]
fn test_missing_config_file_is_not_found() {
    clear_env_vars();
    let result = get_config(Some("/definitely/not/here/config.yml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
#[serial]
fn test_malformed_config_is_a_general_error() {
    clear_env_vars();
    // `generation` is required.
    let file = write_config("jwt_secret: \"x\"\n");
    let result = load(&file);
    assert!(matches!(result, Err(ConfigError::General(_))));
}
