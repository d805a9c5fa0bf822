use tokio::net::TcpListener;
use tracing::{error, info};
use user_gateway::lifecycle::{setup_tracing, shutdown_signal, Config, Gateway, GatewayError};

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Service starting");

    let config = Config::from_env().inspect_err(|e| error!(error = %e, "Invalid environment"))?;

    let gateway = Gateway::new(&config);
    let listener = TcpListener::bind(config.listen_addr()).await?;

    gateway.serve(listener, shutdown_signal()).await?;
    gateway.shutdown().await?;

    info!("Service stopped");
    Ok(())
}
