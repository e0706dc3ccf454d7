//! # Reprompt Datasets
//!
//! Turns the supported QA corpora into [`RawExample`](reprompt_core::RawExample)s
//! and serves assembled documents through a caching [`DatasetAdapter`].
//!
//! | Corpus | Source | Gold passage |
//! |--------|--------|--------------|
//! | NQ | JSON lines, gzip optional | annotated long answer |
//! | SQuAD | v2 training JSON | first paragraph of the topic |
//! | HotPotQA | training JSON, hard split | supporting paragraphs |
//! | PubMed | built by [`builder`] | source abstract |

pub mod adapter;
pub mod builder;
pub mod corpus;
pub mod hotpotqa;
pub mod kind;
pub mod nq;
pub mod pubmed;
pub mod squad;

pub use adapter::DatasetAdapter;
pub use builder::{collect_abstracts, generate_questions};
pub use corpus::{configured_path, Corpus};
pub use kind::DatasetKind;
pub use pubmed::{PubMedAbstract, PubMedQuestion};
