//! Bounded-concurrency probe engine.
//!
//! Every path becomes a [`ProbeTask`]; all tasks are submitted at once and an
//! admission gate (a counting semaphore) caps how many of them may be talking
//! to the network. A task holds its permit across all of its attempts and
//! gives it back only once it has a final [`ProbeResult`], so retries never
//! queue behind other pending tasks.
//!
//! Results are handed back in completion order. Callers must match results to
//! inputs through `path`/`url`, never by index.

use crate::observer::Observer;
use crate::task::{ProbeResult, ProbeTask};
use crate::transport::{Transport, TransportError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Read-only settings shared by every probe of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzConfig {
    /// Timeout applied to each individual request.
    pub timeout: Duration,
    /// Number of attempts per task, the first one included.
    pub max_retries: u32,
    /// Maximum number of requests in flight at any moment.
    pub concurrency_limit: usize,
}

impl FuzzConfig {
    /// A task always gets at least one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    fn gate_size(&self) -> usize {
        self.concurrency_limit.clamp(1, Semaphore::MAX_PERMITS)
    }
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            concurrency_limit: 10,
        }
    }
}

pub struct FuzzEngine<T: Transport> {
    transport: T,
    config: FuzzConfig,
}

impl<T: Transport> FuzzEngine<T> {
    pub fn new(transport: T, config: FuzzConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probes every path against `base_url` and returns one result per path,
    /// in the order the probes finished.
    pub async fn fuzz<S: AsRef<str>>(
        &self,
        base_url: &Url,
        paths: &[S],
        observer: &mut dyn Observer,
    ) -> Vec<ProbeResult> {
        let tasks = paths
            .iter()
            .map(|path| ProbeTask::new(base_url, path.as_ref()))
            .collect();
        self.run_tasks(tasks, observer).await
    }

    pub async fn run_tasks(
        &self,
        tasks: Vec<ProbeTask>,
        observer: &mut dyn Observer,
    ) -> Vec<ProbeResult> {
        let gate = Semaphore::new(self.config.gate_size());
        log::info!(
            "Probing {} paths ({} in flight, {} attempts each, {:?} timeout)",
            tasks.len(),
            self.config.gate_size(),
            self.config.attempts(),
            self.config.timeout
        );

        if let Err(e) = observer.on_start(tasks.len()) {
            log::warn!("Observer '{}' on_start failed: {e}", observer.name());
        }

        let mut pending: FuturesUnordered<_> =
            tasks.iter().map(|task| self.probe(task, &gate)).collect();
        let mut results = Vec::with_capacity(tasks.len());
        while let Some(result) = pending.next().await {
            if let Err(e) = observer.on_result(&result) {
                log::warn!("Observer '{}' on_result failed: {e}", observer.name());
            }
            results.push(result);
        }

        if let Err(e) = observer.on_finish() {
            log::warn!("Observer '{}' on_finish failed: {e}", observer.name());
        }
        results
    }

    async fn probe(&self, task: &ProbeTask, gate: &Semaphore) -> ProbeResult {
        let url = match task.target() {
            Ok(url) => url,
            Err(reason) => {
                log::warn!("Skipping unresolvable path {:?}: {reason}", task.path());
                return ProbeResult::failure(task, reason);
            }
        };

        // The gate is never closed while `run_tasks` owns it.
        let Ok(_permit) = gate.acquire().await else {
            return ProbeResult::failure(task, "admission gate closed");
        };

        let attempts = self.config.attempts();
        let mut last_error: Option<TransportError> = None;
        for attempt in 1..=attempts {
            match self.transport.get(url, self.config.timeout).await {
                Ok(status) => {
                    log::debug!("{url} -> {status} (attempt {attempt}/{attempts})");
                    return ProbeResult::response(task, status);
                }
                Err(e) => {
                    log::warn!("Request failed for {url} (attempt {attempt}/{attempts}): {e}");
                    last_error = Some(e);
                }
            }
        }

        let message = last_error.map(|e| e.to_string()).unwrap_or_default();
        ProbeResult::failure(task, message)
    }
}
