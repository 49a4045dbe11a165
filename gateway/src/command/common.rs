use anyhow::{Context, Result, bail};
use clap::Args;
use reqwest::Client;
use std::time::Duration;

use common::schemas::NodePair;
use common::url_utils::sanitize_url;

use crate::core::dispatch::Dispatcher;
use crate::core::registry::NodeRegistry;

/// Initial fleet and upstream client settings, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct FleetArgs {
    /// IPFS node API endpoints, in fallback order (repeat or comma-separate)
    #[arg(
        long = "node-url",
        env = "IPFS_NODE_URLS",
        value_delimiter = ',',
        required = true
    )]
    pub node_urls: Vec<String>,

    /// IPFS cluster API endpoints, positionally paired with --node-url
    #[arg(
        long = "cluster-url",
        env = "IPFS_CLUSTER_URLS",
        value_delimiter = ',',
        required = true
    )]
    pub cluster_urls: Vec<String>,

    /// Per-probe timeout for status checks (milliseconds)
    #[arg(long, env = "PROBE_TIMEOUT_MS", default_value_t = 2000)]
    pub probe_timeout_ms: u64,

    /// Timeout for a single upstream request (seconds)
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 300)]
    pub upstream_timeout_secs: u64,
}

impl FleetArgs {
    pub fn pairs(&self) -> Result<Vec<NodePair>> {
        if self.node_urls.len() != self.cluster_urls.len() {
            bail!(
                "got {} node urls but {} cluster urls; they are paired by position",
                self.node_urls.len(),
                self.cluster_urls.len()
            );
        }
        if self.node_urls.is_empty() {
            bail!("at least one node/cluster pair is required");
        }

        self.node_urls
            .iter()
            .zip(&self.cluster_urls)
            .map(|(node, cluster)| {
                Ok(NodePair {
                    node_url: sanitize_url(node)
                        .with_context(|| format!("invalid node url '{}'", node))?,
                    cluster_url: sanitize_url(cluster)
                        .with_context(|| format!("invalid cluster url '{}'", cluster))?,
                })
            })
            .collect()
    }

    pub fn http_client(&self) -> Result<Client> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(self.upstream_timeout_secs))
            .build()?;
        Ok(client)
    }

    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let registry = NodeRegistry::from_pairs(self.pairs()?)?;
        Ok(Dispatcher::new(
            self.http_client()?,
            registry,
            Duration::from_millis(self.probe_timeout_ms),
        ))
    }
}
