//! Configuration loading, validation, and management for Reprompt.
//!
//! Loads configuration from `./reprompt.toml` when present, otherwise from
//! `~/.reprompt/config.toml`, with environment variable overrides for
//! credentials and model selection. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory before the home config.
pub const LOCAL_CONFIG_FILE: &str = "reprompt.toml";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider family: "openai" or "anthropic"
    #[serde(default = "default_model_class")]
    pub model_class: String,

    /// Model name sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Short model label used in result paths (defaults per model class)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_tag: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Max tokens per model answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Root directory for run artifacts
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Provider-specific credentials and endpoints
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Token counting
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Dataset file locations
    #[serde(default)]
    pub datasets: DatasetPaths,

    /// Parameter grid for `reprompt sweep`
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_model_class() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4-1106-preview".into()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model_class", &self.model_class)
            .field("model", &self.model)
            .field("model_tag", &self.model_tag)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("results_dir", &self.results_dir)
            .field("providers", &self.providers)
            .field("tokenizer", &self.tokenizer)
            .field("retry", &self.retry)
            .field("datasets", &self.datasets)
            .field("sweep", &self.sweep)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("organization", &self.organization)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// OpenAI organization id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// "tiktoken", "heuristic" or "huggingface"
    #[serde(default = "default_tokenizer_kind")]
    pub kind: String,

    /// Tiktoken encoding or model name overriding the configured model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Path to a `tokenizer.json` for the huggingface kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_tokenizer_kind() -> String {
    "tiktoken".into()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: default_tokenizer_kind(),
            encoding: None,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Randomize each delay between zero and its exponential bound
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Per-attempt timeout
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_attempt_timeout_secs() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: true,
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetPaths {
    #[serde(default = "default_nq_path")]
    pub nq: PathBuf,

    #[serde(default = "default_squad_path")]
    pub squad: PathBuf,

    #[serde(default = "default_hotpotqa_path")]
    pub hotpotqa: PathBuf,

    /// Directory holding `abstracts.json` and `questions.json`
    #[serde(default = "default_pubmed_dir")]
    pub pubmed_dir: PathBuf,

    /// Raw abstract dump the PubMed corpus is built from
    #[serde(default = "default_pubmed_source")]
    pub pubmed_source: PathBuf,
}

fn default_nq_path() -> PathBuf {
    PathBuf::from("data/nq/nq-open-contriever-msmarco-retrieved-documents.jsonl.gz")
}
fn default_squad_path() -> PathBuf {
    PathBuf::from("data/squad/train-v2.0.json")
}
fn default_hotpotqa_path() -> PathBuf {
    PathBuf::from("data/hotpotqa/hotpot_train_v1.1.json")
}
fn default_pubmed_dir() -> PathBuf {
    PathBuf::from("data/pubmed")
}
fn default_pubmed_source() -> PathBuf {
    PathBuf::from("../pubmed/processed/abstracts/2024.json")
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            nq: default_nq_path(),
            squad: default_squad_path(),
            hotpotqa: default_hotpotqa_path(),
            pubmed_dir: default_pubmed_dir(),
            pubmed_source: default_pubmed_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_datasets")]
    pub datasets: Vec<String>,

    #[serde(default = "default_context_lengths")]
    pub context_lengths: Vec<usize>,

    /// Distance between consecutive answer positions
    #[serde(default = "default_answer_step")]
    pub answer_step: usize,

    #[serde(default = "default_question_count")]
    pub question_count: usize,

    #[serde(default = "default_hotpotqa_question_count")]
    pub hotpotqa_question_count: usize,
}

fn default_sweep_datasets() -> Vec<String> {
    vec![
        "nq".into(),
        "squad".into(),
        "hotpotqa".into(),
        "pubmed".into(),
    ]
}
fn default_context_lengths() -> Vec<usize> {
    vec![40_000]
}
fn default_answer_step() -> usize {
    10_000
}
fn default_question_count() -> usize {
    50
}
fn default_hotpotqa_question_count() -> usize {
    250
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            datasets: default_sweep_datasets(),
            context_lengths: default_context_lengths(),
            answer_step: default_answer_step(),
            question_count: default_question_count(),
            hotpotqa_question_count: default_hotpotqa_question_count(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `./reprompt.toml` or `~/.reprompt/config.toml`.
    ///
    /// Environment variables override the file:
    /// - `REPROMPT_MODEL_CLASS`
    /// - `REPROMPT_MODEL` (or `MODEL_NAME`)
    /// - `OPENAI_API_KEY` (or `OPENAI_KEY`), `OPENAI_ORG_ID`
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::resolve_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// The config file `load()` reads.
    pub fn resolve_path() -> PathBuf {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            local
        } else {
            Self::config_dir().join("config.toml")
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(class) = lookup("REPROMPT_MODEL_CLASS") {
            self.model_class = class;
        }
        if let Some(model) = lookup("REPROMPT_MODEL").or_else(|| lookup("MODEL_NAME")) {
            self.model = model;
        }

        let openai = self.providers.entry("openai".into()).or_default();
        if openai.api_key.is_none() {
            openai.api_key = lookup("OPENAI_API_KEY").or_else(|| lookup("OPENAI_KEY"));
        }
        if openai.organization.is_none() {
            openai.organization = lookup("OPENAI_ORG_ID");
        }

        let anthropic = self.providers.entry("anthropic".into()).or_default();
        if anthropic.api_key.is_none() {
            anthropic.api_key = lookup("ANTHROPIC_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reprompt")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.model_class.as_str(), "openai" | "anthropic") {
            return Err(ConfigError::ValidationError(format!(
                "model_class must be either 'openai' or 'anthropic', got '{}'",
                self.model_class
            )));
        }

        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be > 0".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }

        if self.sweep.answer_step == 0 {
            return Err(ConfigError::ValidationError(
                "sweep.answer_step must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Settings for the provider selected by `model_class`.
    pub fn active_provider(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.model_class)
    }

    /// Whether an API key is available for the active provider.
    pub fn has_api_key(&self) -> bool {
        self.active_provider()
            .and_then(|p| p.api_key.as_ref())
            .is_some_and(|k| !k.is_empty())
    }

    /// Short label for result paths: explicit tag, or one per model class.
    pub fn model_tag(&self) -> String {
        if let Some(tag) = &self.model_tag {
            return tag.clone();
        }
        match self.model_class.as_str() {
            "anthropic" => "claude".into(),
            "openai" => "gpt4".into(),
            other => other.into(),
        }
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_class: default_model_class(),
            model: default_model(),
            model_tag: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            results_dir: default_results_dir(),
            providers: HashMap::new(),
            tokenizer: TokenizerConfig::default(),
            retry: RetryConfig::default(),
            datasets: DatasetPaths::default(),
            sweep: SweepConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {reason}", .path.display())]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {}: {reason}", .path.display())]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model_class, "openai");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.sweep.context_lengths, vec![40_000]);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.datasets.squad, config.datasets.squad);
        assert_eq!(parsed.sweep.answer_step, config.sweep.answer_step);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_model_class_rejected() {
        let config = AppConfig {
            model_class: "cohere".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cohere"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/reprompt.toml")).unwrap();
        assert_eq!(config.model_class, "openai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reprompt.toml");
        std::fs::write(
            &path,
            r#"
model_class = "anthropic"
model = "claude-2.1"

[retry]
max_attempts = 5

[sweep]
context_lengths = [10000, 20000]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model_class, "anthropic");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.max_delay_ms, 60_000);
        assert_eq!(config.sweep.context_lengths, vec![10_000, 20_000]);
        assert_eq!(config.sweep.question_count, 50);
        assert_eq!(config.model_tag(), "claude");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reprompt.toml");
        std::fs::write(&path, "model_class = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_model_and_keys() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("MODEL_NAME", "gpt-4o"),
            ("OPENAI_KEY", "sk-legacy"),
            ("OPENAI_ORG_ID", "org-1"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]));
        assert_eq!(config.model, "gpt-4o");
        let openai = &config.providers["openai"];
        assert_eq!(openai.api_key.as_deref(), Some("sk-legacy"));
        assert_eq!(openai.organization.as_deref(), Some("org-1"));
        assert_eq!(
            config.providers["anthropic"].api_key.as_deref(),
            Some("sk-ant")
        );
        assert!(config.has_api_key());
    }

    #[test]
    fn file_keys_win_over_env() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("from-file".into()),
                ..ProviderConfig::default()
            },
        );
        config.apply_env(env(&[("OPENAI_API_KEY", "from-env")]));
        assert_eq!(
            config.providers["openai"].api_key.as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "sk-secret-value")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("model_class"));
        assert!(toml_str.contains("[sweep]"));
    }
}
