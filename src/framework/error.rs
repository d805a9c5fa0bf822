//! # Pipeline Errors
//!
//! The error taxonomy shared by every resource pipeline. Store-native errors are
//! translated into [`ResourceError`] at the repository boundary and never travel
//! further up.

use std::fmt;

use thiserror::Error;

/// Every rule a value broke, in the order they were checked.
///
/// Renders as space-separated parenthesized reasons, e.g.
/// `(id: empty) (name: max 100 chars)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one reason. The surrounding parentheses are added here.
    pub fn push(&mut self, reason: impl fmt::Display) {
        self.0.push(format!("({})", reason));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn reasons(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Errors surfaced by the repository, service and controller layers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// A model failed domain validation before a write.
    #[error("invalid {resource}: {violations}")]
    InvalidModel {
        resource: &'static str,
        violations: Violations,
    },

    /// A partial update failed validation.
    #[error("invalid {resource} update: {violations}")]
    InvalidUpdate {
        resource: &'static str,
        violations: Violations,
    },

    /// One or more filter predicates failed validation.
    #[error("invalid query: {0}")]
    InvalidQuery(Violations),

    /// An operation keyed by id was called with an empty id.
    #[error("{resource} id empty")]
    EmptyId { resource: &'static str },

    /// The request payload could not be decoded.
    #[error("invalid request: {0}")]
    Decode(String),

    /// No record at the key.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Key collision on create.
    #[error("{resource} already exists: {id}")]
    AlreadyExists { resource: &'static str, id: String },

    /// The record exists but fails domain validation when read back.
    #[error("{resource} found, but invalid: {id}")]
    Corrupt { resource: &'static str, id: String },

    /// Opaque backend failure.
    #[error("store failure: {0}")]
    Store(String),

    /// The request deadline passed before the store answered.
    #[error("request cancelled: {0}")]
    Cancelled(String),
}

impl ResourceError {
    /// Map this error to an HTTP-style status code.
    ///
    /// Client faults are 4xx; backend faults are 5xx.
    pub fn status_code(&self) -> u16 {
        match self {
            ResourceError::InvalidModel { .. }
            | ResourceError::InvalidUpdate { .. }
            | ResourceError::InvalidQuery(_)
            | ResourceError::EmptyId { .. }
            | ResourceError::Decode(_)
            | ResourceError::Corrupt { .. } => 400,
            ResourceError::NotFound { .. } => 404,
            ResourceError::AlreadyExists { .. } => 409,
            ResourceError::Store(_) => 500,
            ResourceError::Cancelled(_) => 504,
        }
    }

    /// True for kinds that say "a record is stored at this key".
    ///
    /// Corrupt records count: updates and deletes may target them.
    pub fn implies_existence(&self) -> bool {
        matches!(self, ResourceError::Corrupt { .. })
    }
}
