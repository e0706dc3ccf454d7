use std::path::Path;
use std::sync::Arc;

use reprompt_context::{ContextAssembler, MemoCache, PageFormatter, PreparedExample};
use reprompt_core::{
    DatasetError, ExampleKey, MaterializedExample, RawExample, Result, TokenCounter,
};
use tracing::debug;

use crate::corpus::Corpus;
use crate::kind::DatasetKind;

/// Serves materialized examples for one corpus and one tokenizer.
///
/// Both caches live exactly as long as the adapter. Prepared examples are
/// keyed by question id; materialized examples by the full [`ExampleKey`],
/// so a document is assembled at most once per parameter triple.
pub struct DatasetAdapter {
    corpus: Corpus,
    formatter: PageFormatter<Arc<dyn TokenCounter>>,
    assembler: ContextAssembler,
    prepared: MemoCache<usize, Arc<PreparedExample>>,
    materialized: MemoCache<ExampleKey, Arc<MaterializedExample>>,
}

impl DatasetAdapter {
    pub fn new(corpus: Corpus, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            corpus,
            formatter: PageFormatter::new(counter),
            assembler: ContextAssembler::new(),
            prepared: MemoCache::new(),
            materialized: MemoCache::new(),
        }
    }

    /// Load `kind` from `path` and wrap it.
    pub fn open(
        kind: DatasetKind,
        path: &Path,
        counter: Arc<dyn TokenCounter>,
    ) -> std::result::Result<Self, DatasetError> {
        Ok(Self::new(Corpus::load(kind, path)?, counter))
    }

    pub fn kind(&self) -> DatasetKind {
        self.corpus.kind()
    }

    /// Number of addressable question ids.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// The model whose tokenizer measures pages.
    pub fn tokenizer_model(&self) -> &str {
        self.formatter.counter().model()
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        self.formatter.counter()
    }

    pub fn raw_example(&self, question_id: usize) -> std::result::Result<RawExample, DatasetError> {
        self.corpus.raw_example(question_id)
    }

    /// The paginated form of question `question_id`, computed once.
    pub fn prepared(&self, question_id: usize) -> Result<Arc<PreparedExample>> {
        self.prepared.get_or_try_insert_with(&question_id, || {
            let raw = self.corpus.raw_example(question_id)?;
            let prepared = PreparedExample::prepare(&raw, &self.formatter)?;
            debug!(
                dataset = %self.kind(),
                question_id,
                filler = prepared.filler.len(),
                dropped = prepared.dropped_filler,
                "Prepared example"
            );
            Ok(Arc::new(prepared))
        })
    }

    /// The document for `(question_id, answer_position, total_context)`.
    pub fn get(
        &self,
        question_id: usize,
        answer_position: i64,
        total_context: usize,
    ) -> Result<Arc<MaterializedExample>> {
        let key = ExampleKey::new(question_id, answer_position, total_context);
        self.materialized.get_or_try_insert_with(&key, || {
            let prepared = self.prepared(question_id)?;
            Ok(Arc::new(self.assembler.assemble(
                &prepared,
                answer_position,
                total_context,
            )))
        })
    }

    /// Number of materialized documents held in memory.
    pub fn cached_documents(&self) -> usize {
        self.materialized.len()
    }
}
