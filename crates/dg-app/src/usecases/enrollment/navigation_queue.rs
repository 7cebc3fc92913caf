//! Single-consumer queue for wizard navigation.
//!
//! The wizard chrome emits intents; one consumer task applies them in order.
//! While a submission is in flight, newly emitted intents are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dg_core::enrollment::{NavigationIntent, StepInput, WizardEvent, WizardState};

use super::error::EnrollmentError;
use super::orchestrator::EnrollmentOrchestrator;

type Reply = oneshot::Sender<Result<WizardState, EnrollmentError>>;

struct Queued {
    event: WizardEvent,
    reply: Reply,
}

#[derive(Clone)]
pub struct NavigationQueue {
    tx: mpsc::UnboundedSender<Queued>,
    in_flight: Arc<AtomicBool>,
}

impl NavigationQueue {
    /// Create the queue and spawn its consumer.
    pub fn spawn(orchestrator: Arc<EnrollmentOrchestrator>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Queued>();
        let in_flight = Arc::new(AtomicBool::new(false));
        let consumer_flag = Arc::clone(&in_flight);

        let handle = tokio::spawn(async move {
            while let Some(Queued { event, reply }) = rx.recv().await {
                let result = orchestrator.dispatch(event).await;
                consumer_flag.store(false, Ordering::Release);
                if reply.send(result).is_err() {
                    debug!("navigation result dropped by caller");
                }
            }
            debug!("navigation queue closed");
        });

        (Self { tx, in_flight }, handle)
    }

    /// Queue `event`. Returns `None` when it was ignored because another
    /// one is still being processed.
    pub fn emit(
        &self,
        event: WizardEvent,
    ) -> Option<oneshot::Receiver<Result<WizardState, EnrollmentError>>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(event = ?event, "navigation ignored while a submission is in flight");
            return None;
        }

        let (reply, rx) = oneshot::channel();
        if self.tx.send(Queued { event, reply }).is_err() {
            warn!("navigation queue consumer is gone");
            self.in_flight.store(false, Ordering::Release);
            return None;
        }
        Some(rx)
    }

    pub fn advance(
        &self,
        input: StepInput,
    ) -> Option<oneshot::Receiver<Result<WizardState, EnrollmentError>>> {
        self.emit(WizardEvent::Navigate(NavigationIntent::Advance(input)))
    }

    pub fn retreat(&self) -> Option<oneshot::Receiver<Result<WizardState, EnrollmentError>>> {
        self.emit(WizardEvent::Navigate(NavigationIntent::Retreat))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Emit and wait for the result.
    pub async fn submit(&self, event: WizardEvent) -> Option<Result<WizardState, EnrollmentError>> {
        let rx = self.emit(event)?;
        Some(rx.await.unwrap_or(Err(EnrollmentError::QueueClosed)))
    }
}
