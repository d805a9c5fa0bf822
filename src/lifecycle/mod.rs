//! Runtime orchestration and lifecycle management.
//!
//! This module contains the infrastructure around the pipeline:
//!
//! - **Gateway lifecycle**: Starting the store, wiring services, serving HTTP, shutting down
//! - **Configuration**: Reading the process environment
//! - **Observability setup**: Initializing tracing and logging
//!
//! # Main Components
//!
//! - [`Gateway`] - Owns the store task and builds the HTTP router
//! - [`Config`] - Environment-driven settings
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod config;
pub mod gateway;
pub mod tracing;

pub use config::*;
pub use gateway::*;
pub use self::tracing::*;
