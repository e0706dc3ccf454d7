//! Page markup and token costing.
//!
//! Every passage, gold or filler, becomes one page:
//!
//! ```text
//! <PAGE 3>
//! passage text
//! </PAGE 3>
//! ```
//!
//! The page number is only known at emission time, so assembly works with
//! [`PageTemplate`]s whose cost is measured once with a placeholder in place
//! of the number.

use reprompt_core::{TokenCounter, TokenizeError};
use serde::{Deserialize, Serialize};

/// Stands in for the page number while a page is not yet placed.
pub const PAGE_PLACEHOLDER: &str = "{PAGE}";

fn markup(body: &str, label: &str) -> String {
    format!("\n<PAGE {label}>\n{body}\n</PAGE {label}>\n")
}

/// A numbered, formatted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page text including open/close markers.
    pub text: String,
    pub token_count: usize,
}

/// A formatted page that has not been assigned a number yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTemplate {
    body: String,
    token_count: usize,
}

impl PageTemplate {
    /// The passage text inside the markup.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Token cost of the formatted page.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// The page markup with `page_number` filled in.
    pub fn render(&self, page_number: usize) -> String {
        markup(&self.body, &page_number.to_string())
    }

    /// The page markup with the placeholder left in.
    pub fn placeholder_text(&self) -> String {
        markup(&self.body, PAGE_PLACEHOLDER)
    }
}

/// Wraps passages in page markup and measures them with a [`TokenCounter`].
pub struct PageFormatter<C> {
    counter: C,
}

impl<C: TokenCounter> PageFormatter<C> {
    pub fn new(counter: C) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Format `text` as page `page_number`. Pure: numbering is the caller's job.
    pub fn format(&self, text: &str, page_number: usize) -> Result<Page, TokenizeError> {
        let text = markup(text, &page_number.to_string());
        let token_count = self.counter.count(&text)?;
        Ok(Page { text, token_count })
    }

    /// Format `text` without a page number, measuring the placeholder form.
    pub fn template(&self, text: &str) -> Result<PageTemplate, TokenizeError> {
        let token_count = self.counter.count(&markup(text, PAGE_PLACEHOLDER))?;
        Ok(PageTemplate {
            body: text.to_string(),
            token_count,
        })
    }
}
