//! Error types for the document store.

use thiserror::Error;

/// Native errors reported by a [`DocumentStore`](super::DocumentStore).
///
/// These never cross the repository boundary; the repository translates them into
/// [`ResourceError`](crate::framework::ResourceError).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// No document at the requested key.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A document already occupies the key.
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// The store task is gone (mailbox closed).
    #[error("store unavailable")]
    Unavailable,

    /// The store accepted the request but dropped the response channel.
    #[error("store dropped response channel")]
    Dropped,

    /// Anything else the backend reports (bad operator, malformed write, ...).
    #[error("store failure: {0}")]
    Failure(String),
}
