//! Callback notification delivery.
//!
//! Status updates reach the caller through a dedicated delivery task per
//! job, fed by a channel of updates. That decouples progress sampling
//! cadence from delivery cadence: a slow or dead callback endpoint delays
//! its own queue, never the job's state machine.
//!
//! Delivery is at-most-N-attempts fire-and-forget. Once a terminal update
//! (done/error) has been sent, every later update for that job is dropped,
//! which keeps callbacks in non-decreasing lifecycle order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use wimc_core::contracts::UpdateEnvelope;
use wimc_core::job::{TransferState, WimcError};
use wimc_core::ports::CallbackTransport;

/// Buffered updates per delivery queue; overflow drops the oldest-pending
/// semantics in favour of dropping the new sample (the next tick resends).
const DELIVERY_QUEUE_DEPTH: usize = 32;

/// Production callback transport: one JSON POST per delivery.
pub struct HttpCallbackTransport {
    client: reqwest::Client,
}

impl HttpCallbackTransport {
    /// Create a transport with a bounded request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpCallbackTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn deliver(
        &self,
        callback_url: &str,
        payload: &UpdateEnvelope,
    ) -> Result<(), WimcError> {
        let response = self
            .client
            .post(callback_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WimcError::internal(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(WimcError::internal(format!(
                "callback endpoint answered {}",
                response.status()
            )))
        }
    }
}

/// Pushes job status updates to caller-supplied callback URLs.
pub struct CallbackNotifier {
    transport: Arc<dyn CallbackTransport>,
    attempts: u8,
    retry_delay: Duration,
}

impl CallbackNotifier {
    /// Create a notifier over a transport with an attempt budget.
    pub fn new(transport: Arc<dyn CallbackTransport>, attempts: u8) -> Self {
        Self {
            transport,
            attempts: attempts.max(1),
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Set the base delay between delivery attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Deliver one update, retrying up to the attempt budget.
    ///
    /// Failures are logged; the returned `NotificationFailure` is for the
    /// caller's bookkeeping and must never fail the job itself.
    pub async fn notify(
        &self,
        callback_url: &str,
        payload: &UpdateEnvelope,
    ) -> Result<(), WimcError> {
        for attempt in 1..=self.attempts {
            match self.transport.deliver(callback_url, payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        url = callback_url,
                        attempt,
                        attempts = self.attempts,
                        error = %e,
                        "callback delivery attempt failed"
                    );
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay * u32::from(attempt)).await;
                    }
                }
            }
        }

        Err(WimcError::NotificationFailure {
            attempts: self.attempts,
        })
    }

    /// Spawn a delivery task for one job's callback URL.
    #[must_use]
    pub fn spawn_delivery(self: &Arc<Self>, callback_url: String) -> DeliveryQueue {
        let (tx, mut rx) = mpsc::channel::<UpdateEnvelope>(DELIVERY_QUEUE_DEPTH);
        let notifier = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut terminal_sent = false;
            while let Some(envelope) = rx.recv().await {
                if terminal_sent {
                    tracing::debug!(
                        id = %envelope.update.id,
                        state = %envelope.update.transfer_state,
                        "suppressing update after terminal callback"
                    );
                    continue;
                }

                let is_terminal = envelope.state().is_some_and(TransferState::is_terminal);
                if let Err(e) = notifier.notify(&callback_url, &envelope).await {
                    tracing::warn!(id = %envelope.update.id, error = %e, "callback dropped");
                }
                if is_terminal {
                    terminal_sent = true;
                }
            }
        });

        DeliveryQueue { tx, task }
    }
}

/// Sending side of one job's delivery task.
pub struct DeliveryQueue {
    tx: mpsc::Sender<UpdateEnvelope>,
    task: JoinHandle<()>,
}

impl DeliveryQueue {
    /// Enqueue an update without blocking. A full queue drops this sample;
    /// the next one supersedes it anyway.
    pub fn push(&self, envelope: UpdateEnvelope) {
        if let Err(e) = self.tx.try_send(envelope) {
            tracing::warn!(error = %e, "delivery queue full, dropping status sample");
        }
    }

    /// Close the queue and wait for queued updates to drain.
    pub async fn close(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}
