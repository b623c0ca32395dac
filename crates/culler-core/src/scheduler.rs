//! Repeating timer that drives culling passes

use culler_api::MAX_CHECK_INTERVAL_MINUTES;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

/// Boxed future returned by a pass
pub type PassFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One culling pass, invoked on every tick
pub type PassFn = Arc<dyn Fn() -> PassFuture + Send + Sync>;

/// Attaches a pass to a repeating timer
pub trait Scheduler: Send + Sync {
    /// Start invoking `pass` every `period`. The first invocation happens
    /// one full period after attaching.
    fn attach(&self, period: Duration, pass: PassFn) -> Box<dyn ScheduledTask>;
}

/// Handle to an attached timer
pub trait ScheduledTask: Send {
    fn period(&self) -> Duration;

    /// Detach the timer. A pass that is already executing runs to completion.
    fn cancel(self: Box<Self>);
}

/// Scheduler backed by the tokio runtime.
///
/// Must be used from within a runtime. Each pass runs in its own task and is
/// awaited before the next tick, so passes never overlap and a panicking pass
/// does not stop the timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn attach(&self, period: Duration, pass: PassFn) -> Box<dyn ScheduledTask> {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("Culling timer fired");

                let run = pass();
                if let Err(e) = tokio::spawn(run).await
                    && e.is_panic()
                {
                    error!(error = %e, "Culling pass panicked");
                }
            }
        });

        Box::new(TokioTask { handle, period })
    }
}

struct TokioTask {
    handle: JoinHandle<()>,
    period: Duration,
}

impl ScheduledTask for TokioTask {
    fn period(&self) -> Duration {
        self.period
    }

    fn cancel(self: Box<Self>) {
        self.handle.abort();
    }
}

/// Convert the check interval setting to a timer period, clamped to
/// `1..=MAX_CHECK_INTERVAL_MINUTES` minutes
pub fn check_period(minutes: u64) -> Duration {
    let minutes = minutes.clamp(1, MAX_CHECK_INTERVAL_MINUTES);
    Duration::from_secs(minutes.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_pass(counter: Arc<AtomicUsize>) -> PassFn {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = TokioScheduler::new().attach(Duration::from_secs(60), counting_pass(counter.clone()));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        task.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = TokioScheduler::new().attach(Duration::from_secs(10), counting_pass(counter.clone()));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_pass_keeps_timer_alive() {
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = counter.clone();
        let pass: PassFn = Arc::new(move || {
            let counter = inner.clone();
            Box::pin(async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    panic!("first pass explodes");
                }
            })
        });

        let task = TokioScheduler::new().attach(Duration::from_secs(10), pass);
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        task.cancel();
    }

    #[test]
    fn period_is_whole_minutes() {
        assert_eq!(check_period(5), Duration::from_secs(300));
        assert_eq!(check_period(0), Duration::from_secs(60));
    }

    #[test]
    fn period_is_capped_at_one_year() {
        let year = Duration::from_secs(525_600 * 60);
        assert_eq!(check_period(u64::MAX), year);
        assert_eq!(check_period(200_000_000_000_000_000), year);
        assert!(Instant::now().checked_add(check_period(u64::MAX)).is_some());
    }
}
