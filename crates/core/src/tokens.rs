//! Token counting capability.

use crate::error::TokenizeError;

/// Counts tokens for one specific model.
///
/// Implementations must be deterministic: the same text always yields the
/// same count, otherwise document assembly is not reproducible.
pub trait TokenCounter: Send + Sync {
    /// The model whose tokenizer this counter mirrors.
    fn model(&self) -> &str;

    /// Count the tokens in `text`.
    fn count(&self, text: &str) -> Result<usize, TokenizeError>;
}

impl<T: TokenCounter + ?Sized> TokenCounter for std::sync::Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        (**self).count(text)
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for &T {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn count(&self, text: &str) -> Result<usize, TokenizeError> {
        (**self).count(text)
    }
}
