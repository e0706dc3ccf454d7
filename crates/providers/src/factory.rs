//! Provider factory: builds the configured completion provider.

use std::sync::Arc;

use reprompt_config::AppConfig;
use reprompt_core::{CompletionProvider, Error, ProviderError};
use tracing::info;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiProvider;
use crate::retry::{RetryPolicy, RetryingProvider};

/// The supported provider families.
pub const MODEL_CLASSES: [&str; 2] = ["openai", "anthropic"];

/// Build the bare provider selected by `config.model_class`, without retries.
pub fn build_base_provider(config: &AppConfig) -> Result<Arc<dyn CompletionProvider>, Error> {
    let settings = config.providers.get(&config.model_class);
    let api_key = settings
        .and_then(|p| p.api_key.clone())
        .filter(|k| !k.is_empty());
    let api_url = settings.and_then(|p| p.api_url.clone());

    let provider: Arc<dyn CompletionProvider> = match config.model_class.as_str() {
        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured(
                    "set OPENAI_API_KEY or providers.openai.api_key".into(),
                )
            })?;
            let mut p = OpenAiProvider::new(api_key, &config.model);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            if let Some(org) = settings.and_then(|s| s.organization.clone()) {
                p = p.with_organization(org);
            }
            Arc::new(p)
        }
        "anthropic" => {
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured(
                    "set ANTHROPIC_API_KEY or providers.anthropic.api_key".into(),
                )
            })?;
            let mut p = AnthropicProvider::new(api_key, &config.model);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        other => {
            return Err(Error::config(format!(
                "Model class must be either 'openai' or 'anthropic', got '{other}'"
            )));
        }
    };

    info!(provider = %provider.name(), model = %provider.model(), "Built completion provider");
    Ok(provider)
}

/// Build the configured provider wrapped in the configured retry policy.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn CompletionProvider>, Error> {
    let base = build_base_provider(config)?;
    Ok(Arc::new(RetryingProvider::new(
        base,
        RetryPolicy::from(&config.retry),
    )))
}
