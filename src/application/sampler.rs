//! Cancellable periodic sampling task

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{trace, warn};

/// Why a tick fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The interval elapsed
    Timer,
    /// The session's signal was notified (e.g. native end of media)
    Signal,
}

/// Handle to a running sampler loop.
///
/// The loop calls `tick` every interval until the tick breaks or the
/// sampler is cancelled. Dropping the handle cancels the loop without
/// waiting for it.
pub struct Sampler {
    label: &'static str,
    guard: DropGuard,
    handle: JoinHandle<()>,
}

impl Sampler {
    /// Spawn a loop on `runtime`.
    ///
    /// `interval` is read before every wait, so a changed setting applies on
    /// the next tick.
    pub fn spawn<I, F>(
        runtime: &Handle,
        label: &'static str,
        interval: I,
        signal: Option<Arc<Notify>>,
        mut tick: F,
    ) -> Self
    where
        I: Fn() -> Duration + Send + 'static,
        F: FnMut(Wake) -> ControlFlow<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = runtime.spawn(async move {
            loop {
                let wake = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = wait_for(signal.as_deref()) => Wake::Signal,
                    _ = tokio::time::sleep(interval()) => Wake::Timer,
                };
                if tick(wake).is_break() {
                    break;
                }
            }
            trace!(sampler = label, "Sampler loop finished");
        });

        Self {
            label,
            guard: token.drop_guard(),
            handle,
        }
    }

    /// The loop has exited on its own or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait until it has exited.
    pub async fn cancel(self) {
        let Self {
            label,
            guard,
            handle,
        } = self;
        drop(guard);

        if let Err(e) = handle.await {
            if e.is_panic() {
                warn!(sampler = label, "Sampler loop panicked");
            }
        }
    }
}

async fn wait_for(signal: Option<&Notify>) {
    match signal {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn ticks_until_cancelled() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let sampler = Sampler::spawn(
            &Handle::current(),
            "test",
            || Duration::from_millis(25),
            None,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            },
        );

        tokio::time::sleep(Duration::from_millis(110)).await;
        sampler.cancel().await;
        let after_cancel = ticks.load(Ordering::SeqCst);
        assert_eq!(after_cancel, 4);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn break_ends_loop() {
        let sampler = Sampler::spawn(
            &Handle::current(),
            "test",
            || Duration::from_millis(10),
            None,
            |_| ControlFlow::Break(()),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sampler.is_finished());
        sampler.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn signal_wakes_before_timer() {
        let signal = Arc::new(Notify::new());
        let wakes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&wakes);
        let sampler = Sampler::spawn(
            &Handle::current(),
            "test",
            || Duration::from_secs(60),
            Some(Arc::clone(&signal)),
            move |wake| {
                seen.lock().push(wake);
                ControlFlow::Break(())
            },
        );

        signal.notify_one();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(*wakes.lock(), vec![Wake::Signal]);
        sampler.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_applies_next_tick() {
        let interval = Arc::new(Mutex::new(Duration::from_millis(100)));
        let ticks = Arc::new(AtomicU32::new(0));

        let source = Arc::clone(&interval);
        let counter = Arc::clone(&ticks);
        let sampler = Sampler::spawn(
            &Handle::current(),
            "test",
            move || *source.lock(),
            None,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            },
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        *interval.lock() = Duration::from_millis(10);
        tokio::time::sleep(Duration::from_millis(100)).await;
        // one more tick at the old 100ms pace, then every 10ms
        assert!(ticks.load(Ordering::SeqCst) >= 5);

        sampler.cancel().await;
    }
}
