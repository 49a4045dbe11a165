use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

// Cluster daemons encode absent collections as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Missing timestamps decode as the epoch, like a zero time on the cluster side.
fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

/// One line of the cluster `/pins` NDJSON stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pin {
    pub cid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub origins: Vec<String>,
    #[serde(with = "time::serde::rfc3339", default = "epoch")]
    pub created: OffsetDateTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub peer_map: HashMap<String, PeerStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PeerStatus {
    #[serde(default)]
    pub peername: String,
    #[serde(default)]
    pub ipfs_peer_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ipfs_peer_addresses: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(with = "time::serde::rfc3339", default = "epoch")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub priority_pin: bool,
}

/// Response of the cluster `/add` route for a single file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusterAddResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocations: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePair {
    pub node_url: String,
    pub cluster_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub node_url: String,
    pub cluster_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Alive,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub url: String,
    pub status: Status,
    #[serde(rename = "responseTime")]
    pub response_time: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusterNodePairStatus {
    pub cluster: EndpointStatus,
    pub node: EndpointStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetStatus {
    pub status: Vec<ClusterNodePairStatus>,
}
