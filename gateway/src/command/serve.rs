use axum_server::{Handle, Server};
use clap::Parser;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use common::url_utils::parse_socket_addr;

use crate::command::common::FleetArgs;
use crate::core::routes::router;
use crate::core::state::GatewayState;

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub fleet: FleetArgs,

    /// Address to listen on
    #[arg(long, env = "GATEWAY_LISTEN", default_value = "0.0.0.0:9090")]
    pub listen: String,

    /// Deadline for a whole request, fallback included (seconds)
    #[arg(long, env = "REQUEST_DEADLINE_SECS", default_value_t = 120)]
    pub request_deadline_secs: u64,

    /// Max accepted upload size in bytes (default: 1 GB)
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 1024 * 1024 * 1024usize)]
    pub max_upload_bytes: usize,

    /// Time allowed for in-flight requests to drain on shutdown (seconds)
    #[arg(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}

pub async fn serve(serve_args: ServeArgs) -> anyhow::Result<()> {
    let dispatcher = serve_args.fleet.dispatcher()?;
    let fleet_size = dispatcher.registry().len();

    let (shutdown_tx, shutdown_rx) = watch::channel::<bool>(false);

    let state = GatewayState {
        dispatcher,
        shutdown: shutdown_rx,
        request_deadline: Duration::from_secs(serve_args.request_deadline_secs),
        max_upload_bytes: serve_args.max_upload_bytes,
    };

    let app = router(state);

    let socket_addr = parse_socket_addr(&serve_args.listen)?;
    let handle = Handle::new();
    let server = Server::bind(socket_addr)
        .handle(handle.clone())
        .serve(app.into_make_service());

    info!(listen = %socket_addr, pairs = fleet_size, "gateway listening");

    // Graceful shutdown: ctrl+c cancels in-flight dispatches, then drains connections
    let grace = Duration::from_secs(serve_args.shutdown_grace_secs);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
            handle.graceful_shutdown(Some(grace));
        }
    });

    server.await?;

    info!("gateway stopped");
    Ok(())
}
