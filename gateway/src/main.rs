use clap::{Parser, Subcommand};
use tracing::{info, warn};

use common::telemetry::{LogFormat, init_telemetry};

use gateway::command::serve::{ServeArgs, serve};
use gateway::command::status::{StatusArgs, status};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Log output format: compact or json
    #[arg(long, global = true, env = "LOG_FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
enum Cmd {
    /// Run the HTTP gateway
    Serve(ServeArgs),
    /// Probe the configured fleet once and print its status
    Status(StatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; values already in the environment win.
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    init_telemetry("gateway", args.log_format, &args.log_level);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env file"),
    }

    match args.cmd {
        Cmd::Serve(serve_args) => {
            serve(serve_args).await?;
        }
        Cmd::Status(status_args) => {
            status(status_args).await?;
        }
    }

    Ok(())
}
