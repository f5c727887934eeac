use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// At-most-one-in-flight guard for a periodic task.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

/// Held for the duration of one cycle; releases the slot on drop, including
/// when the cycle panics.
#[derive(Debug)]
pub struct FlightPermit {
    running: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Run `task` every `period` until `shutdown` flips to true.
///
/// A tick that arrives while the previous cycle is still running is skipped,
/// never queued. Cycle errors are logged and the schedule continues. On
/// shutdown the cycle already running is awaited, not aborted.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    task: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let flight = SingleFlight::new();
    // interval() panics on a zero period
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        task = name,
        period_ms = period.as_millis() as u64,
        "Periodic task started"
    );

    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let Some(permit) = flight.try_acquire() else {
            tracing::warn!(task = name, "Previous cycle still running, skipping tick");
            counter!("cycles_skipped_total", "task" => name).increment(1);
            continue;
        };

        let cycle = task();
        in_flight = Some(tokio::spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            if let Err(e) = cycle.await {
                tracing::error!(task = name, error = %e, "Cycle failed");
            }
            histogram!("cycle_duration_seconds", "task" => name)
                .record(started.elapsed().as_secs_f64());
        }));
    }

    // Stop ticking, but let the running cycle finish its I/O.
    if let Some(handle) = in_flight.filter(|h| !h.is_finished()) {
        tracing::info!(task = name, "Waiting for in-flight cycle");
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "In-flight cycle panicked");
        }
    }

    tracing::info!(task = name, "Periodic task stopped");
}
