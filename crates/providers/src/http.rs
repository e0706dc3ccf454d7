//! HTTP plumbing shared by the API providers.

use std::time::Duration;

use reprompt_core::ProviderError;
use tracing::warn;

/// Client-side timeout for a single HTTP request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fallback wait when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Error codes and types that mark a prompt blocked on policy grounds.
const POLICY_CODES: [&str; 3] = ["content_policy_violation", "content_filter", "policy_violation"];

/// Phrases providers put in the message of a policy refusal.
const POLICY_PHRASES: [&str; 3] = ["content policy", "usage policy", "content management policy"];

/// Whether a 400 body describes a content-policy block rather than a
/// malformed request.
///
/// Both OpenAI and Anthropic wrap errors as `{"error": {"type", "code",
/// "message"}}`; anything that does not parse is treated as a plain bad
/// request.
pub(crate) fn is_policy_block(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let error = &value["error"];
    let field = |name: &str| error[name].as_str().unwrap_or_default().to_lowercase();

    let (code, kind, message) = (field("code"), field("type"), field("message"));
    POLICY_CODES.iter().any(|c| code == *c || kind == *c)
        || POLICY_PHRASES.iter().any(|p| message.contains(p))
}

/// Map a non-success HTTP status to a [`ProviderError`].
///
/// A 400 is a rejection only when the body names a policy block; any other
/// 400 (context too long, bad parameter) is a terminal `ApiError`.
pub(crate) fn error_for_status(
    provider: &str,
    status: u16,
    body: String,
    retry_after_secs: Option<u64>,
) -> ProviderError {
    match status {
        400 if is_policy_block(&body) => ProviderError::Rejected(body),
        401 | 403 => ProviderError::AuthenticationFailed(format!("Invalid {provider} API key")),
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => {
            warn!(provider, status, body = %body, "Provider returned error");
            ProviderError::ApiError {
                status_code: status,
                message: body,
            }
        }
    }
}
