#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # User Gateway
//!
//! > **A generic three-layer CRUD pipeline, served over REST.**
//!
//! This crate exposes a `User` record stored in a document database through
//! create/read/update/delete/search endpoints. The interesting part is not the
//! User itself but the reusable pipeline underneath it: the same mapping,
//! validation, persistence and transport code serves any resource type.
//!
//! ## 🏗️ Design Philosophy
//!
//! Every resource has three representations:
//! - **DTO**: what travels over the wire (`UserDto`).
//! - **Model**: what business logic works with (`User`).
//! - **Entity**: what the store persists (`UserEntity`).
//!
//! A resource plugs into the pipeline by implementing a small capability set
//! ([`Resource`](framework::Resource), [`Mapper`](framework::Mapper),
//! [`Validator`](framework::Validator)) on a marker type. The
//! [`Repository`](framework::Repository), [`Service`](framework::Service) and
//! [`controller`](framework::controller) are written *once*.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Store-native errors ([`StoreError`](store::StoreError)) are translated at the
//! repository boundary into [`ResourceError`](framework::ResourceError), which the
//! controller maps to HTTP status codes. Nothing store-specific leaks upward.
//!
//! ### 2. Explicit Presence
//! Partial updates use `Option` per field: `None` means "leave it", `Some("")`
//! means "clear it". Protected fields (`created`, `updated`) are absent from the
//! DTO, so no request can ever write them.
//!
//! ### 3. Concurrency Model
//! Each request runs as its own task. The only shared state is the store handle.
//! The bundled store is a Tokio actor that processes requests sequentially, so a
//! multi-field update is one atomic mutation. Store calls run under a per-request
//! deadline ([`RequestContext`](framework::RequestContext)).
//!
//! ### 4. Observability
//! We use `tracing` everywhere with structured logging. See the
//! [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The generic pipeline and its error taxonomy.
//!
//! ### 2. The Storage ([`store`])
//! The [`DocumentStore`](store::DocumentStore) capability, its actor-backed
//! implementation and a scripted mock for tests.
//!
//! ### 3. The Resource ([`user`])
//! The User representations and their capability-set implementation.
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! Configuration, tracing setup and the [`Gateway`](lifecycle::Gateway) that wires
//! everything together.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! PORT=8080 cargo run
//!
//! curl -X POST localhost:8080/api/v1/user -H 'content-type: application/json' \
//!      -d '{"id":"u1","name":"Ann"}'
//! curl 'localhost:8080/api/v1/user?q=name,EQ,Ann'
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod framework;
pub mod lifecycle;
pub mod store;
pub mod user;
