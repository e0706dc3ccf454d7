//! Context assembly: the core of the harness.
//!
//! Emits filler pages in dataset order, drops the gold page in at the first
//! page boundary whose cumulative token count reaches the requested answer
//! position, and stops once the token budget is spent.
//!
//! # Budget semantics
//!
//! The budget is checked only after a page has been emitted. Truncation
//! therefore never cuts inside a page, and a document may overshoot
//! `total_context` by at most the cost of the page that exhausted it.
//!
//! # Determinism
//!
//! Identical inputs always produce byte-identical documents. Filler order is
//! the dataset's natural order and is never shuffled.

use crate::page::{PageFormatter, PageTemplate};
use reprompt_core::{Answer, MaterializedExample, RawExample, TokenCounter, TokenizeError};
use tracing::{debug, warn};

/// A raw example with every passage formatted and measured once.
///
/// Filler the token counter cannot encode is dropped here, so it neither
/// shows up in the document nor counts toward the budget.
#[derive(Debug, Clone)]
pub struct PreparedExample {
    pub question: String,
    pub answer: Answer,
    pub gold: PageTemplate,
    pub filler: Vec<PageTemplate>,
    /// How many filler passages were dropped as untokenizable.
    pub dropped_filler: usize,
}

impl PreparedExample {
    /// Paginate `raw` with `formatter`.
    ///
    /// Fails only when the gold passage itself cannot be tokenized; a broken
    /// gold passage makes the example meaningless.
    pub fn prepare<C: TokenCounter>(
        raw: &RawExample,
        formatter: &PageFormatter<C>,
    ) -> Result<Self, TokenizeError> {
        let gold = formatter.template(&raw.gold_passage)?;

        let mut filler = Vec::with_capacity(raw.filler_passages.len());
        let mut dropped_filler = 0;
        for (index, passage) in raw.filler_passages.iter().enumerate() {
            match formatter.template(passage) {
                Ok(template) => filler.push(template),
                Err(e) => {
                    warn!(index, error = %e, "Dropping untokenizable filler passage");
                    dropped_filler += 1;
                }
            }
        }

        Ok(Self {
            question: raw.question.clone(),
            answer: raw.answer.clone(),
            gold,
            filler,
            dropped_filler,
        })
    }
}

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

/// Mutable state of one assembly pass.
struct Emission {
    document: String,
    page_ends: Vec<usize>,
    emitted_tokens: usize,
    page_counter: usize,
}

impl Emission {
    fn emit(&mut self, page: &PageTemplate) -> usize {
        let number = self.page_counter;
        self.document.push_str(&page.render(number));
        self.page_ends.push(self.document.len());
        self.emitted_tokens += page.token_count();
        self.page_counter += 1;
        number
    }

    fn reached(&self, position: i64) -> bool {
        i64::try_from(self.emitted_tokens).unwrap_or(i64::MAX) >= position
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Prepare and assemble in one step.
    pub fn assemble_raw<C: TokenCounter>(
        &self,
        raw: &RawExample,
        answer_position: i64,
        total_context: usize,
        counter: C,
    ) -> Result<MaterializedExample, TokenizeError> {
        let prepared = PreparedExample::prepare(raw, &PageFormatter::new(counter))?;
        Ok(self.assemble(&prepared, answer_position, total_context))
    }

    /// Build the document for one `(answer_position, total_context)` pair.
    ///
    /// A negative `answer_position` omits the gold passage entirely and
    /// replaces the answer with the `"n/a"` sentinel.
    pub fn assemble(
        &self,
        prepared: &PreparedExample,
        answer_position: i64,
        total_context: usize,
    ) -> MaterializedExample {
        let mut emission = Emission {
            document: String::new(),
            page_ends: Vec::new(),
            emitted_tokens: 0,
            page_counter: 1,
        };
        let mut gold_page: Option<usize> = None;
        let mut gold_pending = answer_position >= 0;

        // Position 0 puts the gold passage ahead of any filler.
        let mut exhausted = false;
        if gold_pending && emission.reached(answer_position) {
            gold_page = Some(emission.emit(&prepared.gold));
            gold_pending = false;
            exhausted = emission.emitted_tokens >= total_context;
        }

        if !exhausted {
            for filler in &prepared.filler {
                emission.emit(filler);

                if gold_pending && emission.reached(answer_position) {
                    gold_page = Some(emission.emit(&prepared.gold));
                    gold_pending = false;
                }

                if emission.emitted_tokens >= total_context {
                    break;
                }
            }
        }

        let page_count = emission.page_counter - 1;
        let gold_page_number = gold_page.unwrap_or(page_count);
        let answer = if answer_position < 0 {
            Answer::not_available()
        } else {
            prepared.answer.clone()
        };

        debug!(
            answer_position,
            total_context,
            page_count,
            gold_page_number,
            gold_inserted = gold_page.is_some(),
            emitted_tokens = emission.emitted_tokens,
            "Assembled context"
        );

        let document = emission.document.trim();
        let lead = emission.document.len() - emission.document.trim_start().len();
        let page_ends = emission
            .page_ends
            .iter()
            .map(|end| end.saturating_sub(lead).min(document.len()))
            .collect();

        MaterializedExample {
            question: prepared.question.clone(),
            answer,
            gold_page_number,
            document: document.to_string(),
            page_count,
            page_ends,
            emitted_tokens: emission.emitted_tokens,
            gold_inserted: gold_page.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PAGE_PLACEHOLDER;

    /// Gold pages cost 5 tokens, filler pages 3, "BAD" cannot be tokenized.
    struct FixedCounter;

    impl TokenCounter for FixedCounter {
        fn model(&self) -> &str {
            "fixed"
        }

        fn count(&self, text: &str) -> Result<usize, TokenizeError> {
            if text.contains("BAD") {
                Err(TokenizeError {
                    model: "fixed".into(),
                    len: text.len(),
                    reason: "unencodable".into(),
                })
            } else if text.contains("GOLD") {
                Ok(5)
            } else {
                Ok(3)
            }
        }
    }

    fn raw(filler: &[&str]) -> RawExample {
        RawExample {
            question: "Where is the gold?".into(),
            answer: Answer::from("here"),
            gold_passage: "GOLD".into(),
            filler_passages: filler.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn assemble(filler: &[&str], position: i64, budget: usize) -> MaterializedExample {
        ContextAssembler::new()
            .assemble_raw(&raw(filler), position, budget, FixedCounter)
            .unwrap()
    }

    fn gold_markup_count(doc: &str) -> usize {
        doc.matches("\nGOLD\n").count()
    }

    /// Page numbers in the order they appear as opening markers.
    fn page_numbers(doc: &str) -> Vec<usize> {
        doc.match_indices("<PAGE ")
            .map(|(i, _)| {
                let rest = &doc[i + "<PAGE ".len()..];
                let end = rest.find('>').unwrap();
                rest[..end].parse().unwrap()
            })
            .collect()
    }

    fn page_holding(doc: &str, body: &str) -> Option<usize> {
        let at = doc.find(&format!("\n{body}\n"))?;
        page_numbers(&doc[..at]).last().copied()
    }

    #[test]
    fn gold_inserted_after_reaching_position() {
        let out = assemble(&["F1", "F2", "F3"], 4, 100);
        assert_eq!(out.gold_page_number, 3);
        assert_eq!(out.page_count, 4);
        assert_eq!(out.emitted_tokens, 14);
        assert!(out.gold_inserted);
        assert_eq!(page_numbers(&out.document), vec![1, 2, 3, 4]);
        assert_eq!(page_holding(&out.document, "GOLD"), Some(3));
        assert_eq!(page_holding(&out.document, "F3"), Some(4));
        assert_eq!(out.answer, Answer::from("here"));
    }

    #[test]
    fn budget_stops_after_the_page_that_exhausts_it() {
        let out = assemble(&["F1", "F2", "F3"], 4, 8);
        assert_eq!(out.gold_page_number, 3);
        assert_eq!(out.page_count, 3);
        assert_eq!(out.emitted_tokens, 11);
        assert!(!out.document.contains("F3"));
    }

    #[test]
    fn negative_position_omits_gold() {
        let out = assemble(&["F1", "F2", "F3"], -1, 6);
        assert!(!out.gold_inserted);
        assert_eq!(gold_markup_count(&out.document), 0);
        assert!(out.answer.is_not_available());
        assert_eq!(out.gold_page_number, 2);
        assert_eq!(page_numbers(&out.document), vec![1, 2]);
    }

    #[test]
    fn negative_position_with_large_budget_uses_last_filler_page() {
        let out = assemble(&["F1", "F2", "F3"], -5, 1_000);
        assert_eq!(out.gold_page_number, 3);
        assert_eq!(out.page_count, 3);
        assert!(out.answer.is_not_available());
    }

    #[test]
    fn position_zero_puts_gold_first() {
        let out = assemble(&["F1", "F2"], 0, 100);
        assert_eq!(out.gold_page_number, 1);
        assert_eq!(page_holding(&out.document, "GOLD"), Some(1));
        assert_eq!(page_holding(&out.document, "F1"), Some(2));
        assert!(out.document.starts_with("<PAGE 1>\nGOLD"));
    }

    #[test]
    fn tiny_budget_still_emits_first_page() {
        let out = assemble(&["F1", "F2"], 50, 1);
        assert_eq!(out.page_count, 1);
        assert_eq!(out.emitted_tokens, 3);
        assert!(!out.gold_inserted);
        assert_eq!(out.gold_page_number, 1);
    }

    #[test]
    fn filler_exhaustion_before_position_never_inserts_gold() {
        let out = assemble(&["F1", "F2"], 100, 1_000);
        assert!(!out.gold_inserted);
        assert_eq!(gold_markup_count(&out.document), 0);
        assert_eq!(out.gold_page_number, 2);
        // The answer stays real: the gold passage was wanted, just not reached.
        assert_eq!(out.answer, Answer::from("here"));
    }

    #[test]
    fn gold_appears_exactly_once() {
        for position in [0, 1, 3, 4, 6, 7, 9] {
            let out = assemble(&["F1", "F2", "F3", "F4"], position, 10_000);
            assert_eq!(gold_markup_count(&out.document), 1, "position {position}");
            assert_eq!(
                page_holding(&out.document, "GOLD"),
                Some(out.gold_page_number),
                "position {position}"
            );
        }
    }

    #[test]
    fn page_numbers_are_contiguous() {
        for budget in [1, 5, 9, 12, 100] {
            let out = assemble(&["F1", "F2", "F3", "F4", "F5"], 7, budget);
            let pages = page_numbers(&out.document);
            let expected: Vec<usize> = (1..=out.page_count).collect();
            assert_eq!(pages, expected, "budget {budget}");
        }
    }

    #[test]
    fn closing_markers_match_opening_markers() {
        let out = assemble(&["F1", "F2", "F3"], 4, 100);
        for n in 1..=out.page_count {
            assert!(out.document.contains(&format!("</PAGE {n}>")));
        }
        assert!(!out.document.contains(PAGE_PLACEHOLDER));
    }

    #[test]
    fn page_ends_delimit_each_page() {
        let out = assemble(&["F1", "quotes </PAGE 1> inline", "F3"], 3, 100);
        let pages = out.pages();
        assert_eq!(out.page_ends.len(), out.page_count);
        assert_eq!(pages.len(), out.page_count);
        assert_eq!(pages.concat(), out.document);
        for (i, page) in pages.iter().enumerate() {
            let n = i + 1;
            let page = page.trim();
            assert!(page.starts_with(&format!("<PAGE {n}>")), "page {n}: {page}");
            assert!(page.ends_with(&format!("</PAGE {n}>")), "page {n}: {page}");
        }
        assert!(pages[2].contains("quotes </PAGE 1> inline"));
    }

    #[test]
    fn untokenizable_filler_is_dropped() {
        let prepared = PreparedExample::prepare(
            &raw(&["F1", "BAD passage", "F2"]),
            &PageFormatter::new(FixedCounter),
        )
        .unwrap();
        assert_eq!(prepared.filler.len(), 2);
        assert_eq!(prepared.dropped_filler, 1);

        let out = ContextAssembler::new().assemble(&prepared, -1, 100);
        assert!(!out.document.contains("BAD"));
        assert_eq!(out.emitted_tokens, 6);
        assert_eq!(out.page_count, 2);
    }

    #[test]
    fn untokenizable_gold_is_an_error() {
        let mut example = raw(&["F1"]);
        example.gold_passage = "BAD GOLD".into();
        let result = ContextAssembler::new().assemble_raw(&example, 0, 100, FixedCounter);
        assert!(result.is_err());
    }

    #[test]
    fn assembly_is_idempotent() {
        let prepared =
            PreparedExample::prepare(&raw(&["F1", "F2", "F3"]), &PageFormatter::new(FixedCounter))
                .unwrap();
        let a = ContextAssembler::new().assemble(&prepared, 4, 9);
        let b = ContextAssembler::new().assemble(&prepared, 4, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn larger_budget_only_appends_pages() {
        let prepared = PreparedExample::prepare(
            &raw(&["F1", "F2", "F3", "F4", "F5", "F6"]),
            &PageFormatter::new(FixedCounter),
        )
        .unwrap();
        let assembler = ContextAssembler::new();
        let mut previous = assembler.assemble(&prepared, 5, 1);
        for budget in 2..40 {
            let current = assembler.assemble(&prepared, 5, budget);
            assert!(
                current.document.starts_with(&previous.document),
                "budget {budget} removed content"
            );
            assert!(current.page_count >= previous.page_count);
            previous = current;
        }
    }

    #[test]
    fn empty_filler_with_positive_position_yields_empty_document() {
        let out = assemble(&[], 10, 100);
        assert!(out.document.is_empty());
        assert_eq!(out.page_count, 0);
        assert_eq!(out.gold_page_number, 0);
    }

    #[test]
    fn document_is_trimmed() {
        let out = assemble(&["F1"], -1, 100);
        assert!(out.document.starts_with("<PAGE 1>"));
        assert!(out.document.ends_with("</PAGE 1>"));
    }
}
