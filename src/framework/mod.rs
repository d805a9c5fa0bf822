//! Generic CRUD pipeline for document-backed resources.
//!
//! This module provides the building blocks that turn a resource definition into a
//! complete REST endpoint: mapping, validation, persistence, orchestration and transport.
//!
//! # Main Components
//!
//! - [`Resource`], [`Mapper`], [`Validator`] - The capability set a resource implements
//! - [`Repository`] - Persistence through any [`DocumentStore`](crate::store::DocumentStore)
//! - [`Service`] - Validation, existence checks and corrupt-record handling
//! - [`controller`] - axum handlers and the status-code mapping
//! - [`ResourceError`] - The shared error taxonomy
//!
//! # Testing
//!
//! See [`crate::store::mock`] for a scripted store that needs no running actor.

pub mod context;
pub mod controller;
pub mod error;
pub mod query;
pub mod repository;
pub mod resource;
pub mod service;

pub use context::RequestContext;
pub use error::*;
pub use query::{FilterPredicate, Operator};
pub use repository::Repository;
pub use resource::*;
pub use service::Service;
