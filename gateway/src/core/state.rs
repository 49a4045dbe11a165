use std::time::Duration;
use tokio::sync::watch;

use crate::core::cancel::Cancel;
use crate::core::dispatch::Dispatcher;

#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub shutdown: watch::Receiver<bool>,
    pub request_deadline: Duration,
    pub max_upload_bytes: usize,
}

impl GatewayState {
    /// Stop signal for one inbound request.
    pub fn cancel(&self) -> Cancel {
        Cancel::new(self.shutdown.clone(), self.request_deadline)
    }
}
