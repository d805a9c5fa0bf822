use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use super::config::{Config, ConfigError};
use crate::framework::controller;
use crate::store::{StoreActor, StoreClient};
use crate::user::{self, UserService, USER_PATH};

/// Errors raised while starting, serving or stopping the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    StoreTask(#[from] tokio::task::JoinError),
}

/// The running gateway: the store actor plus every resource pipeline on top of it.
///
/// `Gateway` is responsible for:
/// - **Lifecycle Management**: Starting the store task and stopping it again
/// - **Dependency Wiring**: Handing the shared store handle to each resource service
/// - **Routing**: Mounting every resource controller on one axum `Router`
///
/// # Example
///
/// ```ignore
/// let gateway = Gateway::new(&config);
/// let listener = TcpListener::bind(config.listen_addr()).await?;
/// gateway.serve(listener, shutdown_signal()).await?;
/// gateway.shutdown().await?;
/// ```
pub struct Gateway {
    /// The User pipeline.
    pub users: Arc<UserService<StoreClient>>,

    request_timeout: Duration,

    /// Store task handle (used for graceful shutdown)
    store_handle: JoinHandle<()>,
}

impl Gateway {
    /// Spawns the store actor and wires the resource services onto it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &Config) -> Self {
        let (store_actor, store) = StoreActor::new(config.store_buffer);
        let store_handle = tokio::spawn(store_actor.run());

        Self {
            users: Arc::new(user::new(store)),
            request_timeout: config.request_timeout,
            store_handle,
        }
    }

    /// Builds the complete HTTP surface, middleware included.
    pub fn router(&self) -> Router {
        let routes = Router::new()
            .route("/", get(pong))
            .merge(controller::router(
                USER_PATH,
                self.users.clone(),
                self.request_timeout,
            ));
        with_middleware(routes)
    }

    /// Serves HTTP on `listener` until `shutdown` resolves, then drains in-flight requests.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), GatewayError> {
        let addr = listener.local_addr()?;
        info!(%addr, "Listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Gracefully shuts down the store.
    ///
    /// Dropping the services closes the store's mailbox once no router built by
    /// [`Gateway::router`] is still alive; the store task then exits and is joined.
    pub async fn shutdown(self) -> Result<(), GatewayError> {
        info!("Shutting down gateway...");

        drop(self.users);

        if let Err(e) = self.store_handle.await {
            error!("Store task failed: {:?}", e);
            return Err(e.into());
        }

        info!("Gateway shutdown complete.");
        Ok(())
    }
}

/// Wraps `routes` with the access log (outermost) and panic recovery.
pub fn with_middleware(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(recover))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Turns a handler panic into a `500` with the uniform error body.
fn recover(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal server error".to_string()
    };
    error!(panic = %message, "Handler panicked");
    controller::error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// `GET /` liveness probe.
async fn pong() -> &'static str {
    "Pong!"
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
