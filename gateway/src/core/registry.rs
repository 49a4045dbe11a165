use anyhow::anyhow;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use common::error::ApiError;
use common::schemas::NodePair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyPresent,
}

/// Ordered fleet of node/cluster pairs. Insertion order is fallback priority.
///
/// Pairs are only ever appended. Readers copy the list out under the read lock and
/// do their network work on the copy.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    pairs: Arc<RwLock<Vec<NodePair>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = NodePair>) -> Result<Self, ApiError> {
        let registry = Self::new();
        for pair in pairs {
            if registry.register(&pair.node_url, &pair.cluster_url)?
                == Registration::AlreadyPresent
            {
                warn!(
                    node_url = %pair.node_url,
                    cluster_url = %pair.cluster_url,
                    "duplicate endpoint in fleet configuration, skipping"
                );
            }
        }
        Ok(registry)
    }

    /// Copy of the fleet in priority order.
    ///
    /// A writer that panicked cannot leave the list half-written (pushes only), so a
    /// poisoned lock is read through.
    pub fn snapshot(&self) -> Vec<NodePair> {
        self.pairs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Appends the pair unless its node endpoint or its cluster endpoint is already
    /// registered, in which case the registry is left untouched.
    pub fn register(&self, node_url: &str, cluster_url: &str) -> Result<Registration, ApiError> {
        let mut pairs = self
            .pairs
            .write()
            .map_err(|e| ApiError::Any(anyhow!("failed to acquire registry write lock: {}", e)))?;

        let known = pairs
            .iter()
            .any(|p| p.node_url == node_url || p.cluster_url == cluster_url);
        if known {
            return Ok(Registration::AlreadyPresent);
        }

        pairs.push(NodePair {
            node_url: node_url.to_string(),
            cluster_url: cluster_url.to_string(),
        });
        info!(node_url, cluster_url, position = pairs.len() - 1, "registered node pair");

        Ok(Registration::Added)
    }

    pub fn len(&self) -> usize {
        self.pairs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let pairs = self.pairs.clone();
        let _ = std::thread::spawn(move || {
            let _guard = pairs.write().unwrap();
            panic!("writer died holding the registry lock");
        })
        .join();
    }
}
