//! # Taproot In-Memory Document
//!
//! A small arena-backed tree that implements the
//! [`Document`](taproot_types::Document) port. It behaves like a browser
//! document as far as the binding runtime can observe:
//!
//! - mutations are queued per observer and only handed out by `take_records`,
//!   so several writes inside one turn arrive as one batch;
//! - removed subtrees stay intact while detached and can be re-appended;
//! - listeners are planned in capture, target, and bubble order, with `once`
//!   listeners removed as they are planned.
//!
//! It exists so the runtime can be exercised without a browser, and it is the
//! host used by the engine's integration tests.

mod document;
mod markup;

pub use document::MemoryDocument;
pub use markup::{MarkupError, MarkupNode, parse_fragment};
