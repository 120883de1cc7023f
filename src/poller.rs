//! Periodic driver for the poll cycle.
//!
//! One background thread polls every registered feed, then sleeps for the
//! configured interval. The sleep is a `recv_timeout` on a stop channel, so
//! [`Poller::stop`] ends the loop right after the current cycle instead of
//! waiting out the interval.

use crate::registry::SourceRegistry;
use crate::source::{PollOutcome, SourceError, SourceKey};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Results of one poll cycle, sent to an optional observer.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub elapsed: Duration,
    pub results: Vec<(SourceKey, Result<PollOutcome, SourceError>)>,
}

impl CycleReport {
    pub fn changed(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(PollOutcome::Updated { .. } | PollOutcome::Reset)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// Handle on a running poller thread.
pub struct Poller {
    stop: Sender<()>,
    thread: JoinHandle<u64>,
}

impl Poller {
    /// Start polling `registry` every `interval`.
    ///
    /// The first cycle runs immediately. With `max_cycles` set, the thread
    /// exits on its own after that many cycles.
    pub fn spawn(
        registry: Arc<SourceRegistry>,
        interval: Duration,
        max_cycles: Option<u64>,
        events: Option<Sender<CycleReport>>,
    ) -> Self {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            let mut cycle = 0;
            loop {
                cycle += 1;
                let started = Instant::now();
                let results = registry.poll_all();
                let report = CycleReport {
                    cycle,
                    elapsed: started.elapsed(),
                    results,
                };
                debug!(
                    cycle,
                    changed = report.changed(),
                    failed = report.failed(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "poll cycle finished"
                );
                if let Some(tx) = &events {
                    // Observer gone is not a reason to stop polling.
                    tx.send(report).ok();
                }

                if max_cycles.is_some_and(|max| cycle >= max) {
                    break;
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!(cycles = cycle, "poller stopped");
            cycle
        });
        Self { stop, thread }
    }

    /// Stop after the current cycle; returns the number of cycles run.
    pub fn stop(self) -> u64 {
        self.stop.send(()).ok();
        self.join()
    }

    /// Wait for a poller started with a cycle limit to finish.
    pub fn join(self) -> u64 {
        self.thread.join().unwrap_or_else(|_| {
            error!("poller thread panicked");
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use crate::test_helpers::{test_repository, write_file};
    use tempfile::TempDir;

    #[test]
    fn runs_requested_number_of_cycles() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(SourceRegistry::new(test_repository(&tmp)));
        let feed = tmp.path().join("content");
        write_file(&feed, "a.jpg", b"a");
        let key = SourceKey::new(&feed, SourceKind::Info);
        registry.register(&key);

        let (tx, rx) = mpsc::channel();
        let poller = Poller::spawn(
            Arc::clone(&registry),
            Duration::from_millis(5),
            Some(2),
            Some(tx),
        );
        assert_eq!(poller.join(), 2);

        let reports: Vec<CycleReport> = rx.iter().collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].cycle, 1);
        assert_eq!(reports[0].changed(), 1);
        assert_eq!(reports[1].changed(), 0);
        assert_eq!(registry.content(&[&key]).serial, 1);
    }

    #[test]
    fn stop_interrupts_the_wait() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(SourceRegistry::new(test_repository(&tmp)));

        let poller = Poller::spawn(registry, Duration::from_secs(3600), None, None);
        let started = Instant::now();
        assert_eq!(poller.stop(), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(SourceRegistry::new(test_repository(&tmp)));
        registry.register(&SourceKey::new(tmp.path().join("missing"), SourceKind::Info));

        let (tx, rx) = mpsc::channel();
        let poller = Poller::spawn(registry, Duration::from_millis(1), Some(3), Some(tx));
        assert_eq!(poller.join(), 3);
        assert!(rx.iter().all(|r| r.failed() == 1));
    }
}
