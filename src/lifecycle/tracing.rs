//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide `tracing` subscriber. Call it once,
//! first thing in `main`; everything else only emits events and spans.
//!
//! ## Configuration
//!
//! - **Log level** comes from `RUST_LOG`, defaulting to `info`.
//! - **Compact format** with targets hidden: each event already carries a
//!   `resource` field from the span it runs in.
//!
//! ## What Gets Traced
//!
//! - **Store lifecycle**: startup, shutdown, document counts
//! - **Pipeline operations**: one span per service/repository call, with the
//!   arguments recorded as fields
//! - **Integrity problems**: corrupt records are logged at `error` with the full
//!   record; records dropped from search results at `warn`
//! - **HTTP access log**: one span per request with method, path, status and latency
//! - **Request outcomes**: rejections at `warn`, backend failures at `error`
//! - **Handler panics**: logged at `error`, answered with `500`
//!
//! ```bash
//! # Default
//! PORT=8080 cargo run
//!
//! # Full payloads and store traffic
//! RUST_LOG=debug PORT=8080 cargo run
//!
//! # Only the store
//! RUST_LOG=user_gateway::store=debug PORT=8080 cargo run
//! ```
use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
