use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use common::schemas::{EndpointStatus, Status};
use common::trace_context::inject_trace_context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResult {
    pub endpoint: String,
    pub alive: bool,
    pub latency: Duration,
}

/// One bodiless request, no retry. Latency covers send up to the response headers, or
/// up to the failure. Any failure is reported as `alive == false`.
pub async fn probe(http: &Client, endpoint: &str, method: Method, timeout: Duration) -> HealthResult {
    let started = Instant::now();

    let req = inject_trace_context(http.request(method, endpoint).timeout(timeout));

    let alive = match req.send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) => {
            debug!(endpoint, status = %resp.status(), "probe got non-success status");
            false
        }
        Err(e) => {
            warn!(endpoint, error = %e, "probe failed");
            false
        }
    };

    HealthResult {
        endpoint: endpoint.to_string(),
        alive,
        latency: started.elapsed(),
    }
}

impl From<HealthResult> for EndpointStatus {
    fn from(r: HealthResult) -> Self {
        EndpointStatus {
            url: r.endpoint,
            status: if r.alive { Status::Alive } else { Status::Down },
            response_time: format!("{:?}", r.latency),
        }
    }
}
