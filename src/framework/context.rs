//! Per-request cancellation.
//!
//! Every store call made on behalf of a request runs under that request's
//! [`RequestContext`]. When the deadline passes the call is abandoned and the
//! operation fails with [`ResourceError::Cancelled`].
//!
//! A caller disconnect needs no extra plumbing: the HTTP server drops the handler
//! future, which drops the pending store call with it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::ResourceError;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// No deadline. For tests and internal maintenance work.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `fut` to completion unless the deadline passes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, ResourceError> {
        match self.deadline {
            None => Ok(fut.await),
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| ResourceError::Cancelled("deadline exceeded".to_string())),
        }
    }
}
