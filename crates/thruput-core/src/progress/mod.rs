//! Progress reporting.
//!
//! A transfer reports its completion percentage through a
//! [`ProgressObserver`]. Observers are called synchronously on the transfer
//! task after every chunk, so they should return quickly.
//!
//! Any `Fn(f64)` closure is an observer. [`WatchObserver`] forwards updates
//! into a `tokio::sync::watch` channel for consumers running on another task.

use tokio::sync::watch;

/// Receives completion percentages in `[0, 100]`.
pub trait ProgressObserver: Send + Sync {
    /// Called after each chunk with the percentage completed so far.
    fn update(&self, percent: f64);
}

impl<F> ProgressObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn update(&self, percent: f64) {
        self(percent);
    }
}

/// Observer publishing into a watch channel.
#[derive(Debug)]
pub struct WatchObserver {
    tx: watch::Sender<f64>,
}

impl WatchObserver {
    /// Create an observer and the receiver that follows it.
    #[must_use]
    pub fn channel() -> (Self, watch::Receiver<f64>) {
        let (tx, rx) = watch::channel(0.0);
        (Self { tx }, rx)
    }
}

impl ProgressObserver for WatchObserver {
    fn update(&self, percent: f64) {
        let _ = self.tx.send(percent);
    }
}

/// Per-transfer wrapper around an optional observer.
///
/// Keeps reported values inside `[0, 100]` and never lets them decrease.
pub(crate) struct ProgressReporter<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    last: f64,
    updates: u64,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self {
            observer,
            last: 0.0,
            updates: 0,
        }
    }

    pub(crate) fn report(&mut self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0).max(self.last);
        self.last = percent;
        self.updates += 1;
        if let Some(observer) = self.observer {
            observer.update(percent);
        }
    }

    pub(crate) const fn updates(&self) -> u64 {
        self.updates
    }
}
