use crate::task::ProbeResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An `Observer` is notified as the engine makes progress through a batch.
///
/// The engine calls `on_start` once with the number of submitted tasks, then
/// `on_result` exactly once for every result in the order results complete,
/// then `on_finish`. Observers drive progress indicators; they never influence
/// the results themselves.
///
/// A failing observer is logged and otherwise ignored, so a broken progress
/// display cannot abort a fuzzing run.
pub trait Observer: Send {
    /// Returns a static string name identifying the observer in log messages.
    fn name(&self) -> &'static str;

    /// Called by the engine once, before any task is admitted.
    ///
    /// # Arguments
    /// * `total`: The number of tasks in the batch. Exactly this many
    ///   `on_result` calls follow, so it can size a progress bar.
    ///
    /// # Returns
    /// `Ok(())` on success. An `Err` is logged by the engine and the run
    /// continues as if the call had succeeded.
    fn on_start(&mut self, total: usize) -> Result<(), anyhow::Error>;

    /// Called once per produced result, whether it carries a status or an error.
    ///
    /// Calls arrive in completion order, which need not match the order the
    /// paths were submitted in.
    ///
    /// # Arguments
    /// * `result`: The final `ProbeResult` of one task, after all of its attempts.
    ///
    /// # Returns
    /// `Ok(())` on success. An `Err` is logged; the result is still collected.
    fn on_result(&mut self, result: &ProbeResult) -> Result<(), anyhow::Error>;

    /// Called once after the last `on_result`, when the batch is finished.
    ///
    /// Observers should release anything they hold for display here (e.g. clear
    /// a progress bar). This is also called for an empty batch.
    fn on_finish(&mut self) -> Result<(), anyhow::Error>;
}

/// Observer that does nothing.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoOpObserver;

impl Observer for NoOpObserver {
    fn name(&self) -> &'static str {
        "NoOpObserver"
    }

    fn on_start(&mut self, _total: usize) -> Result<(), anyhow::Error> {
        Ok(())
    }

    fn on_result(&mut self, _result: &ProbeResult) -> Result<(), anyhow::Error> {
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Counts completed results.
///
/// The counter is shared, so another task can poll `progress()` on a clone of
/// the handle while the engine is running.
#[derive(Default, Debug, Clone)]
pub struct CountingObserver {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// `(completed, total)` as last seen by the engine.
    pub fn progress(&self) -> (usize, usize) {
        (self.completed(), self.total.load(Ordering::SeqCst))
    }
}

impl Observer for CountingObserver {
    fn name(&self) -> &'static str {
        "CountingObserver"
    }

    fn on_start(&mut self, total: usize) -> Result<(), anyhow::Error> {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn on_result(&mut self, _result: &ProbeResult) -> Result<(), anyhow::Error> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
