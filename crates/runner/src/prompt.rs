//! Prompt construction.
//!
//! A prompt is laid out as
//!
//! ```text
//! instructions
//! [<QUESTION>..</QUESTION>]          repeat_at_beginning
//! <DOCUMENT>
//! page, [reminder], page, ...        reminders every repeat_interval tokens
//! </DOCUMENT>
//! <QUESTION>..</QUESTION>
//! answer format
//! ```
//!
//! A reminder never follows the last page, since the question comes next
//! anyway.

use reprompt_core::{MaterializedExample, TokenCounter, TokenizeError};
use tracing::debug;

use crate::strategy::Strategy;

const INSTRUCTIONS: &str = "You will be given a long document split into numbered pages, \
followed by a question. Answer the question using only the information in the document. \
Keep your answer short.";

const TAG_ONLY_INSTRUCTIONS: &str =
    "Whenever you see the tag <REMINDER />, remember the question you will be asked.";

const TAG_ONLY_REMINDER: &str = "<REMINDER />";

const ANSWER_FORMAT: &str = "Respond with a single JSON object of the form \
{\"answer\": \"<short answer>\", \"page\": <page number>}, where page is the number of the \
page containing the answer. If the document does not contain the answer, use \"n/a\" as \
the answer.";

const PAGE_FORMAT: &str = "Respond with a single JSON object of the form \
{\"page\": <page number>}, where page is the number of the page containing the answer to \
the question. Do not answer the question itself.";

/// A prompt ready to send, plus what the strategy did to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub prompt: String,
    /// Text the model's answer should start with.
    pub seed_text: String,
    /// Number of reminders inserted into the document.
    pub reminders: usize,
}

/// Lays out a materialized example according to a [`Strategy`].
///
/// The counter measures pages for reminder placement and should be the one
/// the document was assembled with.
pub struct PromptBuilder<'a> {
    counter: &'a dyn TokenCounter,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self { counter }
    }

    pub fn build(
        &self,
        example: &MaterializedExample,
        strategy: &Strategy,
    ) -> Result<BuiltPrompt, TokenizeError> {
        let question = example.question.trim();
        let mut sections = Vec::new();

        let mut instructions = INSTRUCTIONS.to_string();
        if strategy.reminder_interval().is_some() && strategy.repeat_tag_only {
            instructions.push(' ');
            instructions.push_str(TAG_ONLY_INSTRUCTIONS);
        }
        sections.push(instructions);

        if strategy.repeat_at_beginning {
            sections.push(question_block(question));
        }

        let (document, reminders) = self.document_block(example, strategy, question)?;
        sections.push(document);
        sections.push(question_block(question));
        sections.push(
            if strategy.return_page_only {
                PAGE_FORMAT
            } else {
                ANSWER_FORMAT
            }
            .to_string(),
        );

        let seed_text = if strategy.repeat_before_answer {
            format!("The question was: {question}\n")
        } else {
            String::new()
        };

        debug!(
            pages = example.page_count,
            reminders,
            page_only = strategy.return_page_only,
            "Built prompt"
        );

        Ok(BuiltPrompt {
            prompt: sections.join("\n\n"),
            seed_text,
            reminders,
        })
    }

    fn document_block(
        &self,
        example: &MaterializedExample,
        strategy: &Strategy,
        question: &str,
    ) -> Result<(String, usize), TokenizeError> {
        let pages = example.pages();
        let mut blocks = Vec::with_capacity(pages.len());
        let mut reminders = 0;
        let mut since_reminder = 0;

        for (i, page) in pages.iter().enumerate() {
            blocks.push(page.trim().to_string());

            let Some(interval) = strategy.reminder_interval() else {
                continue;
            };
            if i + 1 == pages.len() {
                break;
            }
            since_reminder += self.counter.count(page.trim())?;
            if since_reminder >= interval {
                blocks.push(if strategy.repeat_tag_only {
                    TAG_ONLY_REMINDER.to_string()
                } else {
                    format!("<REMINDER>The question is: {question}</REMINDER>")
                });
                reminders += 1;
                since_reminder = 0;
            }
        }

        let document = if blocks.is_empty() {
            "<DOCUMENT>\n</DOCUMENT>".to_string()
        } else {
            format!("<DOCUMENT>\n{}\n</DOCUMENT>", blocks.join("\n\n"))
        };
        Ok((document, reminders))
    }
}

fn question_block(question: &str) -> String {
    format!("<QUESTION>{question}</QUESTION>")
}
