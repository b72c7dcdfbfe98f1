//! Binary entrypoint: loads config, sets up logging, builds the transport and
//! serves `/sendmail`.

use std::net::SocketAddr;

use dotenvy::dotenv;
use tracing::{info, warn};

use sendmail_api::{create_router, logger::set_logger, ApiConfig, EmailState, TransportKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Load environment (.env is optional)
    dotenv().ok();
    let config = ApiConfig::from_env()?;

    // 2) Logging
    set_logger(&config).map_err(|e| anyhow::anyhow!("failed to initialize logger: {e}"))?;

    // 3) Transport + addressing
    let state = EmailState::from_config(&config)?;
    match config.transport {
        TransportKind::Smtp => info!(
            "Transport: smtp via {}:{} ({:?})",
            config.smtp_host, config.smtp_port, config.smtp_tls
        ),
        TransportKind::File => warn!(
            "Transport: file, messages are written to {}/ and not delivered",
            config.outbox_dir
        ),
    }
    info!("Relaying from {} to {}", config.from_address, config.to_address);

    // 4) Router
    let app = create_router(state, config.body_limit);

    // 5) Serve
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
