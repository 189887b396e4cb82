use crate::config::MonitorConfig;
use crate::error::{Error, Result, Task};
use crate::net::ProbeSender;
use crate::probe::Probe;
use crate::registry::Registry;
use crate::retry::RetryPolicy;
use crate::types::Identifier;
use crossbeam::channel::tick;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::instrument;

/// Sends one echo request to every peer per probe interval.
pub struct Prober<S> {
    registry: Arc<Registry>,
    sender: S,
    identifier: Identifier,
    interval: Duration,
    retry: RetryPolicy,
    max_failed_rounds: usize,
    failed_rounds: Vec<usize>,
}

impl<S: ProbeSender> Prober<S> {
    #[must_use]
    pub fn new(registry: Arc<Registry>, sender: S, config: &MonitorConfig) -> Self {
        let failed_rounds = vec![0; registry.len()];
        Self {
            registry,
            sender,
            identifier: config.identifier,
            interval: config.probe_interval,
            retry: config.send_retry,
            max_failed_rounds: config.max_failed_rounds,
            failed_rounds,
        }
    }

    /// Probe every peer once per interval until a send failure persists.
    pub fn run(mut self) -> Result<()> {
        let ticker = tick(self.interval);
        loop {
            ticker
                .recv()
                .map_err(|err| Error::Other(err.to_string()))?;
            self.probe_round(SystemTime::now())?;
        }
    }

    /// Send one probe to every peer, recording `now` as the transmit time.
    ///
    /// An unreachable destination is not a failure: the probe is counted as
    /// sent and will be reported as lost. Any other send error is retried per
    /// the send policy and, if it persists for `max_failed_rounds` rounds in a
    /// row for the same peer, returned as [`Error::Persistent`].
    #[instrument(skip(self), level = "trace")]
    pub fn probe_round(&mut self, now: SystemTime) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        for (index, peer) in registry.iter().enumerate() {
            let sequence = peer.record_probe(now);
            let probe = Probe::new(peer.addr(), self.identifier, sequence, *peer.payload());
            match self.send_with_retry(probe) {
                Ok(()) => self.failed_rounds[index] = 0,
                Err(Error::ProbeFailed(err)) => {
                    self.failed_rounds[index] = 0;
                    tracing::info!(
                        addr = %peer.addr(),
                        sequence = sequence.0,
                        %err,
                        "destination unreachable"
                    );
                }
                Err(err) => {
                    self.failed_rounds[index] += 1;
                    let failures = self.failed_rounds[index];
                    tracing::warn!(addr = %peer.addr(), failures, %err, "failed to send probe");
                    if failures >= self.max_failed_rounds {
                        return Err(Error::Persistent {
                            task: Task::Prober,
                            failures,
                            source: Box::new(err),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn send_with_retry(&mut self, probe: Probe) -> Result<()> {
        let mut failures = 0;
        loop {
            match self.sender.send_probe(probe) {
                Err(err) if !matches!(err, Error::ProbeFailed(_)) => {
                    failures += 1;
                    if !self.retry.should_retry(failures) {
                        return Err(err);
                    }
                    let delay = self.retry.delay(failures);
                    tracing::debug!(addr = %probe.addr, failures, ?delay, %err, "retrying probe");
                    thread::sleep(delay);
                }
                result => return result,
            }
        }
    }
}
