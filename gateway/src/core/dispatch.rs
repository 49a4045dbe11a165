use anyhow::anyhow;
use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::{Client, Method, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use common::constants::{
    CLUSTER_ADD_PATH, CLUSTER_HEALTH_PATH, CLUSTER_PINS_PATH, NODE_CAT_PATH, NODE_VERSION_PATH,
};
use common::error::{ApiError, CancelReason};
use common::schemas::{
    ClusterAddResponse, ClusterNodePairStatus, FleetStatus, NodePair, Pin, Status,
};
use common::trace_context::inject_trace_context;

use crate::core::cancel::Cancel;
use crate::core::probe::probe;
use crate::core::registry::{NodeRegistry, Registration};
use crate::core::upload::AssembledUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackError {
    Exhausted,
    Cancelled(CancelReason),
}

impl FallbackError {
    /// Maps running out of candidates onto the operation-specific error.
    fn or_exhausted(self, exhausted: ApiError) -> ApiError {
        match self {
            FallbackError::Exhausted => exhausted,
            FallbackError::Cancelled(reason) => ApiError::Cancelled(reason),
        }
    }
}

/// Tries `attempt` on each candidate in order until one succeeds.
///
/// Attempts are strictly sequential and never repeated. A failed attempt is logged
/// and the next candidate is tried. Cancellation is raced against every attempt: the
/// in-flight attempt is dropped and the whole operation stops.
pub async fn first_success<'a, T, I, F, Fut>(
    op: &'static str,
    candidates: I,
    cancel: &Cancel,
    mut attempt: F,
) -> Result<T, FallbackError>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    for endpoint in candidates {
        let outcome = tokio::select! {
            biased;
            reason = cancel.cancelled() => {
                warn!(op, endpoint, %reason, "operation cancelled");
                return Err(FallbackError::Cancelled(reason));
            }
            res = attempt(endpoint) => res,
        };

        match outcome {
            Ok(value) => {
                debug!(op, endpoint, "attempt succeeded");
                return Ok(value);
            }
            Err(e) => warn!(op, endpoint, error = %e, "attempt failed, trying next endpoint"),
        }
    }

    Err(FallbackError::Exhausted)
}

/// Runs gateway operations against the fleet in registry order.
#[derive(Clone)]
pub struct Dispatcher {
    http: Client,
    registry: NodeRegistry,
    probe_timeout: Duration,
}

impl Dispatcher {
    pub fn new(http: Client, registry: NodeRegistry, probe_timeout: Duration) -> Self {
        Self {
            http,
            registry,
            probe_timeout,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn register(&self, node_url: &str, cluster_url: &str) -> Result<Registration, ApiError> {
        self.registry.register(node_url, cluster_url)
    }

    pub async fn get_pins(&self, cancel: &Cancel) -> Result<Vec<Pin>, ApiError> {
        let fleet = self.registry.snapshot();

        let pins = first_success(
            "get_pins",
            fleet.iter().map(|p| p.cluster_url.as_str()).collect::<Vec<_>>(),
            cancel,
            |cluster| self.fetch_pins(cluster),
        )
        .await
        .map_err(|e| e.or_exhausted(ApiError::NoPinsAvailable))?;

        info!(count = pins.len(), "pins listed");
        Ok(pins)
    }

    async fn fetch_pins(&self, cluster: &str) -> Result<Vec<Pin>, ApiError> {
        let url = format!("{}{}", cluster, CLUSTER_PINS_PATH);
        let resp = inject_trace_context(self.http.get(&url))
            .send()
            .await
            .map_err(ApiError::UpstreamReq)?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ApiError::Any(anyhow!("cluster reported no pins")));
        }
        if !status.is_success() {
            return Err(ApiError::UpstreamStatus(status));
        }

        let body = resp.text().await.map_err(ApiError::UpstreamReq)?;
        let pins = parse_pins(cluster, &body);
        if pins.is_empty() {
            return Err(ApiError::Any(anyhow!("no valid pins in response")));
        }

        Ok(pins)
    }

    pub async fn get_file(&self, cid: &str, cancel: &Cancel) -> Result<Bytes, ApiError> {
        let fleet = self.registry.snapshot();

        let (node, bytes) = first_success(
            "get_file",
            fleet.iter().map(|p| p.node_url.as_str()).collect::<Vec<_>>(),
            cancel,
            |node| async move { self.cat(node, cid).await.map(|b| (node, b)) },
        )
        .await
        .map_err(|e| e.or_exhausted(ApiError::ContentUnavailable))?;

        info!(cid, node, size = bytes.len(), "file read from node");
        Ok(bytes)
    }

    async fn cat(&self, node: &str, cid: &str) -> Result<Bytes, ApiError> {
        let url = format!("{}{}", node, NODE_CAT_PATH);
        let resp = inject_trace_context(self.http.post(&url).query(&[("arg", cid)]))
            .send()
            .await
            .map_err(ApiError::UpstreamReq)?;

        if !resp.status().is_success() {
            return Err(ApiError::UpstreamStatus(resp.status()));
        }

        resp.bytes().await.map_err(ApiError::UpstreamReq)
    }

    pub async fn add_file(
        &self,
        upload: &AssembledUpload,
        cancel: &Cancel,
    ) -> Result<ClusterAddResponse, ApiError> {
        let fleet = self.registry.snapshot();

        let added = first_success(
            "add_file",
            fleet.iter().map(|p| p.cluster_url.as_str()).collect::<Vec<_>>(),
            cancel,
            |cluster| self.add_to_cluster(cluster, upload),
        )
        .await
        .map_err(|e| e.or_exhausted(ApiError::UploadFailed))?;

        info!(cid = %added.cid, filename = %upload.filename, "file added to cluster");
        Ok(added)
    }

    async fn add_to_cluster(
        &self,
        cluster: &str,
        upload: &AssembledUpload,
    ) -> Result<ClusterAddResponse, ApiError> {
        let url = format!("{}{}", cluster, CLUSTER_ADD_PATH);

        // Each attempt gets its own body built from the buffered payload.
        let req = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, &upload.content_type)
            .body(upload.payload.clone());

        let resp = inject_trace_context(req)
            .send()
            .await
            .map_err(ApiError::UpstreamReq)?;

        if !resp.status().is_success() {
            return Err(ApiError::UpstreamStatus(resp.status()));
        }

        let body = resp.text().await.map_err(ApiError::UpstreamReq)?;
        parse_add_response(&body)
            .ok_or_else(|| ApiError::Any(anyhow!("add response carried no cid")))
    }

    /// One entry per registry pair, in registry order. Never fails.
    pub async fn fleet_status(&self) -> FleetStatus {
        let fleet = self.registry.snapshot();

        let status = join_all(fleet.iter().map(|pair| self.pair_status(pair))).await;

        let alive = status
            .iter()
            .filter(|s| s.cluster.status == Status::Alive)
            .count();
        info!(pairs = status.len(), clusters_alive = alive, "fleet status computed");

        FleetStatus { status }
    }

    async fn pair_status(&self, pair: &NodePair) -> ClusterNodePairStatus {
        let cluster_url = format!("{}{}", pair.cluster_url, CLUSTER_HEALTH_PATH);
        let node_url = format!("{}{}", pair.node_url, NODE_VERSION_PATH);

        let (cluster, node) = tokio::join!(
            probe(&self.http, &cluster_url, Method::GET, self.probe_timeout),
            probe(&self.http, &node_url, Method::POST, self.probe_timeout),
        );

        ClusterNodePairStatus {
            cluster: cluster.into(),
            node: node.into(),
        }
    }
}

/// Parses a `/pins` NDJSON body line by line. Lines that do not decode are logged and
/// skipped.
pub fn parse_pins(cluster: &str, body: &str) -> Vec<Pin> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str::<Pin>(line) {
            Ok(pin) => Some(pin),
            Err(e) => {
                warn!(cluster, line = n + 1, error = %e, "skipping unparseable pin");
                None
            }
        })
        .collect()
}

/// Picks the first add result with a non-empty cid. Clusters may stream one JSON
/// object per line.
pub fn parse_add_response(body: &str) -> Option<ClusterAddResponse> {
    body.lines()
        .filter_map(|line| serde_json::from_str::<ClusterAddResponse>(line).ok())
        .find(|r| !r.cid.is_empty())
}
