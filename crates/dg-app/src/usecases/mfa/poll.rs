//! Cancellable polling with a hard ceiling.
//!
//! One task owns both the poll interval and the overall deadline, so
//! stopping it stops both.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of a single check.
#[derive(Debug, PartialEq, Eq)]
pub enum PollStep<T, E> {
    Pending,
    Done(T),
    Failed(E),
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    Done(T),
    Failed(E),
    TimedOut,
    Cancelled,
}

/// Run `check` every `interval` until it settles, `ceiling` elapses or
/// `cancel` fires. The first check happens one interval after the start.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    ceiling: Duration,
    cancel: &CancellationToken,
    mut check: F,
) -> PollOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollStep<T, E>>,
{
    let start = Instant::now();
    let deadline = sleep_until(start + ceiling);
    tokio::pin!(deadline);
    let mut ticker = interval_at(start + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = &mut deadline => return PollOutcome::TimedOut,
            _ = ticker.tick() => {}
        }

        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = &mut deadline => return PollOutcome::TimedOut,
            step = check() => step,
        };

        match step {
            PollStep::Pending => continue,
            PollStep::Done(value) => return PollOutcome::Done(value),
            PollStep::Failed(err) => return PollOutcome::Failed(err),
        }
    }
}
