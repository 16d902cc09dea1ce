//! LLM provider implementations.
//!
//! Every supported backend (Groq, OpenAI, Ollama and other local servers) speaks the
//! OpenAI chat completions format, so a single `OpenAiCompatibleProvider` covers them.
//! Use `create_provider()` to instantiate it from configuration.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use openai_compat::OpenAiCompatibleProvider;

/// Base delay of the exponential backoff between retries.
const BASE_BACKOFF_MS: u64 = 500;
/// Upper bound on a single backoff delay.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `LlmError::RateLimited` (respects `retry_after_secs`) and
/// `LlmError::Timeout`. Permanent errors (auth, parse) return immediately.
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) if is_retryable(&e) && attempt < max_retries => {
                let backoff_ms = compute_backoff(attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if an error is retryable (transient).
fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::RateLimited { .. } | LlmError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(attempt: u32, err: &LlmError) -> u64 {
    if let LlmError::RateLimited { retry_after_secs } = err
        && *retry_after_secs > 0
    {
        return retry_after_secs.saturating_mul(1000).min(MAX_BACKOFF_MS);
    }
    BASE_BACKOFF_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS)
}

/// Create the LLM provider described by the configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "groq" | "openai" | "local" | "ollama" => {
            Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
        }
        // Any other name is accepted as long as it points at a compatible endpoint.
        _ if config.base_url.is_some() => Ok(Arc::new(OpenAiCompatibleProvider::new(config)?)),
        other => Err(LlmError::UnknownProvider {
            provider: other.to_string(),
        }),
    }
}
