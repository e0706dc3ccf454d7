//! Prompting strategies and run parameters.

use serde::{Deserialize, Serialize};

use reprompt_datasets::DatasetKind;

/// How the question is presented around the document.
///
/// The defaults are the baseline: the question is asked once, after the
/// document, and the model answers with both an answer and a page number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Insert reminders between pages.
    #[serde(default)]
    pub repeat_prompt: bool,
    /// Tokens of document between two reminders.
    #[serde(default)]
    pub repeat_interval: Option<usize>,
    /// Restate the question at the start of the answer.
    #[serde(default)]
    pub repeat_before_answer: bool,
    /// Also ask the question before the document.
    #[serde(default)]
    pub repeat_at_beginning: bool,
    /// Reminders are a bare tag instead of the full question.
    #[serde(default)]
    pub repeat_tag_only: bool,
    /// Ask for the page number only.
    #[serde(default)]
    pub return_page_only: bool,
}

impl Strategy {
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Reminders every `interval` tokens.
    pub fn reprompt(interval: usize) -> Self {
        Self {
            repeat_prompt: true,
            repeat_interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn with_repeat_before_answer(mut self) -> Self {
        self.repeat_before_answer = true;
        self
    }

    pub fn with_repeat_at_beginning(mut self) -> Self {
        self.repeat_at_beginning = true;
        self
    }

    pub fn with_repeat_tag_only(mut self) -> Self {
        self.repeat_tag_only = true;
        self
    }

    pub fn page_only(mut self) -> Self {
        self.return_page_only = true;
        self
    }

    /// The reminder interval when reminders are enabled.
    pub fn reminder_interval(&self) -> Option<usize> {
        if self.repeat_prompt {
            self.repeat_interval.filter(|&i| i > 0)
        } else {
            None
        }
    }
}

/// Everything that identifies one evaluation run.
///
/// Together with the model tag these fields determine the output path, so
/// running the same parameters twice addresses the same artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub dataset: DatasetKind,
    pub question_id: usize,
    /// Token offset of the gold passage; negative omits it.
    pub answer_position: i64,
    pub total_context: usize,
    /// Top-level results folder, e.g. `analysis/reprompt_tuning`.
    pub mode: String,
    /// Strategy folder below the context length, e.g. `5k`.
    #[serde(default)]
    pub subfolder: String,
    #[serde(default)]
    pub strategy: Strategy,
}

impl RunSpec {
    pub fn new(
        dataset: DatasetKind,
        question_id: usize,
        answer_position: i64,
        total_context: usize,
    ) -> Self {
        Self {
            dataset,
            question_id,
            answer_position,
            total_context,
            mode: "default".into(),
            subfolder: String::new(),
            strategy: Strategy::baseline(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}
