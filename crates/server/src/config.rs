//! # Application Configuration
//!
//! This module defines the configuration structure for the `casewatch-server` and
//! the logic for loading it from a YAML file and environment variables.
//!
//! Layers, lowest precedence first:
//! 1. Programmatic defaults (port, database path, prompt templates).
//! 2. The main YAML file, with `${VAR}` placeholders substituted from the environment.
//! 3. Plain environment variables for top-level keys (`PORT`, `DB_URL`, `JWT_SECRET`).
//! 4. `CASEWATCH_` prefixed variables for nested keys, using `__` as the separator
//!    (e.g. `CASEWATCH_PIPELINE__RELEVANCE_FLOOR=0.8`).

use casewatch::constants::DEFAULT_DB_FILE;
use casewatch::prompts::tasks::*;
use casewatch::providers::factory::{EmbeddingConfig, NerConfig, ProviderConfig, SearchConfig};
use casewatch::{prompts::PromptTemplates, PipelineSettings};
use config::{
    Config as ConfigBuilder, Environment, File, FileFormat, Value as ConfigValue,
    ValueKind as ConfigValueKind,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file, or `:memory:` for an ephemeral store.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// The HS256 secret used to validate bearer tokens. Loaded from `JWT_SECRET` env var.
    #[serde(default)]
    pub jwt_secret: String,

    /// The generative provider (concepts, article summaries, alert rationales).
    pub generation: ProviderConfig,
    pub embedding: EmbeddingConfig,
    /// The legal entity recognizer. Without it extraction runs on concepts only.
    #[serde(default)]
    pub ner: Option<NerConfig>,
    pub search: SearchConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub prompts: PromptTemplates,
}

fn default_port() -> u16 {
    8082
}

fn default_db_url() -> String {
    DEFAULT_DB_FILE.to_string()
}

/// Constructs a `config::Value` map of the default prompts from the library.
/// This serves as the base layer of configuration, so a YAML file can override a
/// single prompt without restating the others.
fn build_default_prompts() -> HashMap<String, ConfigValue> {
    let prompts = vec![
        (
            "concept_extraction",
            (
                CONCEPT_EXTRACTION_SYSTEM_PROMPT,
                CONCEPT_EXTRACTION_USER_PROMPT,
            ),
        ),
        (
            "article_summary",
            (ARTICLE_SUMMARY_SYSTEM_PROMPT, ARTICLE_SUMMARY_USER_PROMPT),
        ),
        (
            "alert_rationale",
            (ALERT_RATIONALE_SYSTEM_PROMPT, ALERT_RATIONALE_USER_PROMPT),
        ),
    ];

    prompts
        .into_iter()
        .map(|(name, (sys, user))| {
            let mut table = HashMap::new();
            table.insert("system_prompt".to_string(), ConfigValue::from(sys));
            table.insert("user_prompt".to_string(), ConfigValue::from(user));
            (
                name.to_string(),
                ConfigValue::new(None, ConfigValueKind::Table(table)),
            )
        })
        .collect()
}

// Reads a file and substitutes `${VAR}` placeholders from the environment.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// Without an override path, `config.yml` next to the crate manifest is used; if it
/// does not exist, the `config.{AI_PROVIDER}.yml` template is loaded instead
/// (`AI_PROVIDER` defaults to `local`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("port", default_port() as i64)?
        .set_default("db_url", default_db_url())?
        .set_default("prompts", build_default_prompts())?;

    // Layer 2: Main Config (with Fallback)
    let main_config_path = if let Some(override_path) = config_path_override {
        override_path.to_string()
    } else {
        let user_config_path = format!("{base_path}/config.yml");
        if std::path::Path::new(&user_config_path).exists() {
            info!("Loading user-defined configuration from '{user_config_path}'.");
            user_config_path
        } else {
            let provider = env::var("AI_PROVIDER").unwrap_or_else(|_| "local".to_string());
            let fallback_path = format!("{base_path}/config.{provider}.yml");
            info!("'{user_config_path}' not found. Falling back to '{fallback_path}' based on AI_PROVIDER='{provider}'.");
            fallback_path
        }
    };

    let main_content = read_and_substitute(&main_config_path)?
        .ok_or_else(|| ConfigError::NotFound(format!("Main config file not found at '{main_config_path}'. Please ensure 'config.yml' exists or your AI_PROVIDER is set to load a valid template ('local' or 'gemini').")))?;
    builder = builder.add_source(File::from_str(&main_content, FileFormat::Yaml));

    let settings = builder
        // Layer 3: Environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Layer 4: Prefixed environment variables for nested overrides.
        .add_source(
            Environment::with_prefix("CASEWATCH")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}
