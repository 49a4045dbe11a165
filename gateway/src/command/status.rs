use clap::Parser;

use crate::command::common::FleetArgs;

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub fleet: FleetArgs,

    /// Pretty-print the JSON report
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

/// Probes every configured pair once and prints the report. Unreachable members are
/// part of the report, not a failure of the command.
pub async fn status(status_args: StatusArgs) -> anyhow::Result<()> {
    let dispatcher = status_args.fleet.dispatcher()?;
    let report = dispatcher.fleet_status().await;

    let out = if status_args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", out);

    Ok(())
}
