use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{metrics, worker::Worker, Result, ShipperError};

/// Pause after a failed tick before the next one starts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(3);

enum State {
    /// A new tick should be launched.
    Idle,
    Ticking(JoinHandle<Result<()>>),
    /// Last tick succeeded; nothing runs until the timer fires.
    Waiting,
}

enum Event {
    Interrupted,
    TickFinished(std::result::Result<Result<()>, JoinError>),
    TimerFired,
}

/// Drives [`Worker::tick`] on a fixed period until `shutdown` is cancelled.
///
/// At most one tick is in flight: a timer event that arrives while a tick is
/// still running is skipped. A failed tick is followed by [`RETRY_INTERVAL`]
/// of backoff and then a fresh tick. Fatal errors end the loop.
pub struct Scheduler {
    worker: Arc<Worker>,
    period: Duration,
    backoff: Duration,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(worker: Arc<Worker>, period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            worker,
            period,
            backoff: RETRY_INTERVAL,
            shutdown,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn launch(&self) -> JoinHandle<Result<()>> {
        let worker = self.worker.clone();
        tokio::spawn(async move { worker.tick().await })
    }

    pub async fn run(self) -> Result<()> {
        let mut timer = time::interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = State::Idle;

        loop {
            if matches!(state, State::Idle) {
                state = State::Ticking(self.launch());
            }

            let event = {
                let tick = async {
                    match &mut state {
                        State::Ticking(handle) => handle.await,
                        _ => std::future::pending().await,
                    }
                };
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => Event::Interrupted,
                    outcome = tick => Event::TickFinished(outcome),
                    _ = timer.tick() => Event::TimerFired,
                }
            };

            match event {
                Event::Interrupted => {
                    if matches!(state, State::Ticking(_)) {
                        info!("Leaving the in-flight tick to finish on its own");
                    }
                    info!("Worker has been stopped");
                    return Ok(());
                }
                Event::TimerFired => {
                    if matches!(state, State::Ticking(_)) {
                        warn!("Previous tick still running, skipping this interval");
                    } else {
                        state = State::Idle;
                    }
                }
                Event::TickFinished(outcome) => {
                    let outcome = outcome.unwrap_or_else(|e| {
                        Err(ShipperError::Internal(format!("tick task failed: {}", e)))
                    });
                    match outcome {
                        Ok(()) => {
                            info!(
                                "Awaits next tick (interval: {} seconds)",
                                self.period.as_secs()
                            );
                            state = State::Waiting;
                        }
                        Err(e) if e.is_fatal() => {
                            metrics::record_tick_failure();
                            error!("Worker failed fatally: {}", e);
                            return Err(e);
                        }
                        Err(e) => {
                            metrics::record_tick_failure();
                            error!("Worker failed: {}", e);
                            tokio::select! {
                                biased;
                                _ = self.shutdown.cancelled() => {
                                    info!("Worker has been stopped");
                                    return Ok(());
                                }
                                _ = time::sleep(self.backoff) => {}
                            }
                            state = State::Idle;
                        }
                    }
                }
            }
        }
    }
}
