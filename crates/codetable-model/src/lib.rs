//! Codetable data model
//!
//! This crate defines the shared vocabulary of the codebook platform:
//!
//! - [`Code`]: the short lookup key of an input-method entry (validated),
//! - [`Entry`]: one persisted codebook row,
//! - [`PendingOperation`]: one proposed edit inside a batch (tagged union —
//!   action-specific required fields are enforced at the type level, so a
//!   Change without an old word is unrepresentable rather than a runtime
//!   check),
//! - the line-oriented batch text format used by the chat/bot integration
//!   ([`batch_v1`]),
//! - versioned snapshot digests ([`digest`]).
//!
//! Everything here is serde-serializable with snake_case tags so the same
//! shapes serve the web API layer and the conversational-bot layer.

pub mod batch_v1;
pub mod digest;
pub mod entry;
pub mod op;

pub use entry::{Code, Entry, EntryStatus, EntryType, MAX_CODE_LEN};
pub use op::{DependencyEdge, OpAction, PendingOperation};

use thiserror::Error;

/// Errors produced while constructing or parsing model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("code cannot be empty")]
    EmptyCode,

    #[error("code `{code}` is too long ({len} chars, max 6)")]
    CodeTooLong { code: String, len: usize },

    #[error("code `{code}` contains invalid character `{ch}`")]
    InvalidCodeChar { code: String, ch: char },

    #[error("unknown entry type `{0}`")]
    UnknownEntryType(String),

    #[error("line {line}: {message}")]
    BatchText { line: usize, message: String },
}
