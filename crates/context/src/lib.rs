//! Paginated context assembly.
//!
//! Builds a synthetic long document of a target token length out of filler
//! passages, injects the gold passage at a target token offset, and keeps the
//! bookkeeping needed for scoring (which page holds the gold passage, how many
//! tokens were emitted).
//!
//! | Piece | Role |
//! |-------|------|
//! | [`PageFormatter`] | Wraps a passage in numbered page markup and measures it |
//! | [`PreparedExample`] | A raw example with every passage formatted once |
//! | [`ContextAssembler`] | Emits pages until the budget is spent |
//! | [`MemoCache`] | Per-key memoization shared by concurrent runs |

pub mod assembler;
pub mod cache;
pub mod page;

pub use assembler::{ContextAssembler, PreparedExample};
pub use cache::MemoCache;
pub use page::{Page, PageFormatter, PageTemplate, PAGE_PLACEHOLDER};
