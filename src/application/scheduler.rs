//! Start/stop controlled periodic driver for the dispatch pipeline.
//!
//! At most one batch cycle is ever in flight: the loop awaits each cycle's task
//! before taking the next tick, so a slow cycle delays the next tick instead of
//! overlapping with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::handlers::message_dispatcher::BatchProcessor;

/// Upper bound for a single batch cycle, independent of the tick interval.
pub const CYCLE_TIMEOUT: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
    /// Closed when the loop task exits.
    done: watch::Receiver<()>,
}

#[derive(Default)]
struct RunState {
    running: bool,
    generation: u64,
    active: Option<ActiveRun>,
}

pub struct Scheduler {
    processor: Arc<dyn BatchProcessor>,
    interval: Duration,
    batch_size: usize,
    cycle_timeout: Duration,
    state: Mutex<RunState>,
}

impl Scheduler {
    pub fn new(processor: Arc<dyn BatchProcessor>, interval: Duration, batch_size: usize) -> Self {
        Self {
            processor,
            interval: interval.max(Duration::from_millis(1)),
            batch_size,
            cycle_timeout: CYCLE_TIMEOUT,
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn with_cycle_timeout(mut self, cycle_timeout: Duration) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    /// Launches the loop and fires one cycle right away. Must be called inside a tokio runtime.
    pub fn start(&self) -> StartOutcome {
        let mut state = self.lock_state();
        if state.running {
            info!("scheduler is already running");
            return StartOutcome::AlreadyRunning;
        }

        state.generation += 1;
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(());

        let run_loop = RunLoop {
            processor: self.processor.clone(),
            interval: self.interval,
            batch_size: self.batch_size,
            cycle_timeout: self.cycle_timeout,
            cancel: cancel.clone(),
        };
        tokio::spawn(run_loop.run(done_tx));

        state.active = Some(ActiveRun {
            generation: state.generation,
            cancel,
            done: done_rx,
        });
        state.running = true;

        info!(
            interval = ?self.interval,
            batch_size = self.batch_size,
            "scheduler started"
        );
        StartOutcome::Started
    }

    /// Cancels the loop and waits until it has fully exited, including any in-flight cycle.
    pub async fn stop(&self) -> StopOutcome {
        let (generation, cancel, mut done) = {
            let state = self.lock_state();
            match state.active.as_ref() {
                Some(active) if state.running => (
                    active.generation,
                    active.cancel.clone(),
                    active.done.clone(),
                ),
                _ => {
                    info!("scheduler is not running");
                    return StopOutcome::NotRunning;
                }
            }
        };

        info!("stopping scheduler");
        cancel.cancel();
        while done.changed().await.is_ok() {}

        {
            let mut state = self.lock_state();
            if state
                .active
                .as_ref()
                .is_some_and(|active| active.generation == generation)
            {
                state.active = None;
                state.running = false;
            }
        }

        info!("scheduler stopped");
        StopOutcome::Stopped
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RunLoop {
    processor: Arc<dyn BatchProcessor>,
    interval: Duration,
    batch_size: usize,
    cycle_timeout: Duration,
    cancel: CancellationToken,
}

impl RunLoop {
    async fn run(self, _done: watch::Sender<()>) {
        // The first tick completes immediately, which gives the startup cycle.
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("scheduler loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("scheduler received stop signal");
                    break;
                }
                _ = ticker.tick() => self.run_cycle().await,
            }
        }
    }

    async fn run_cycle(&self) {
        info!(batch_size = self.batch_size, "processing batch");

        let processor = self.processor.clone();
        let cycle_cancel = self.cancel.child_token();
        let batch_size = self.batch_size;
        // Own task, so a panicking cycle comes back as a JoinError and the loop keeps ticking.
        let mut cycle =
            tokio::spawn(async move { processor.process_pending(&cycle_cancel, batch_size).await });

        tokio::select! {
            joined = &mut cycle => match joined {
                Ok(Ok(report)) => info!(
                    fetched = report.fetched,
                    sent = report.sent,
                    failed = report.failed,
                    skipped = report.skipped,
                    "batch finished"
                ),
                Ok(Err(err)) => {
                    error!(error = %format!("{err:#}"), "failed to process pending messages")
                }
                Err(err) => error!(error = %err, "batch cycle panicked"),
            },
            _ = time::sleep(self.cycle_timeout) => {
                cycle.abort();
                warn!(timeout = ?self.cycle_timeout, "batch cycle timed out");
            }
        }
    }
}
