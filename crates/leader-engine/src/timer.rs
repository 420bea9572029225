//! Cancelable one-shot timers.
//!
//! A [`Timer`] runs a closure once after a delay unless it is canceled first.
//! Dropping the handle cancels it, so replacing an `Option<Timer>` is enough to
//! guarantee at most one live timer per slot.

use std::time::Duration;

use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Handle to a scheduled one-shot callback.
#[derive(Debug)]
pub struct Timer {
    /// Name used in trace logs.
    name: &'static str,
    /// Cancels the pending sleep.
    token: CancellationToken,
    /// Task running the sleep; finished once fired or canceled.
    handle: JoinHandle<()>,
}

impl Timer {
    /// Schedule `on_fire` to run once after `delay`. Must be called within a tokio runtime.
    pub fn start<F>(name: &'static str, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancel = token.clone();
        trace!(timer = name, delay_ms = delay.as_millis(), "timer_start");
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {
                    trace!(timer = name, "timer_fired");
                    on_fire();
                }
                _ = cancel.cancelled() => {
                    trace!(timer = name, "timer_cancelled");
                }
            }
        });
        Self {
            name,
            token,
            handle,
        }
    }

    /// Cancel the timer. A callback that already ran is unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the timer has fired or finished canceling.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let n = Arc::new(AtomicUsize::new(0));
        let m = n.clone();
        (n, move || {
            m.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (n, f) = counter();
        let t = Timer::start("t", Duration::from_millis(100), f);
        time::sleep(Duration::from_millis(99)).await;
        assert_eq!(n.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert!(t.is_finished());
        assert_eq!(t.name(), "t");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_suppress_fire() {
        let (n, f) = counter();
        let t = Timer::start("a", Duration::from_millis(50), f);
        t.cancel();
        let (m, g) = counter();
        drop(Timer::start("b", Duration::from_millis(50), g));
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(n.load(Ordering::SeqCst), 0);
        assert_eq!(m.load(Ordering::SeqCst), 0);
    }
}
