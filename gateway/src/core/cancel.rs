use std::future::pending;
use tokio::sync::watch;
use tokio::time::{Duration, Instant, sleep_until};

use common::error::CancelReason;

/// Caller-supplied stop signal for one dispatch: a deadline, the server shutdown
/// flag, both, or neither.
#[derive(Clone, Debug, Default)]
pub struct Cancel {
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancel {
    #[cfg(test)]
    pub fn never() -> Self {
        Self::default()
    }

    pub fn new(shutdown: watch::Receiver<bool>, timeout: Duration) -> Self {
        Self {
            shutdown: Some(shutdown),
            deadline: Some(Instant::now() + timeout),
        }
    }

    #[cfg(test)]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            shutdown: None,
            deadline: Some(Instant::now() + timeout),
        }
    }

    #[cfg(test)]
    pub fn with_shutdown(shutdown: watch::Receiver<bool>) -> Self {
        Self {
            shutdown: Some(shutdown),
            deadline: None,
        }
    }

    /// Resolves once the operation must stop. Pending forever when neither a deadline
    /// nor a shutdown flag is set.
    pub async fn cancelled(&self) -> CancelReason {
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };

        let shutdown = async {
            let Some(mut rx) = self.shutdown.clone() else {
                return pending::<()>().await;
            };
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                // sender gone without signalling: nobody can shut us down anymore
                if rx.changed().await.is_err() {
                    return pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = shutdown => CancelReason::Shutdown,
            _ = deadline => CancelReason::Deadline,
        }
    }
}
