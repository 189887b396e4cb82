use crate::config::MonitorConfig;
use crate::error::{Error, Result, Task};
use crate::net::ReplyReceiver;
use crate::peer::ReplyMatch;
use crate::probe::EchoReply;
use crate::registry::Registry;
use crate::retry::RetryPolicy;
use crate::sink::{MetricSink, RttSample, Sample};
use std::sync::Arc;
use std::thread;

/// Reads echo replies and matches them against the peers.
pub struct Listener<R> {
    registry: Arc<Registry>,
    receiver: R,
    metric_sink: Arc<dyn MetricSink>,
    retry: RetryPolicy,
}

impl<R: ReplyReceiver> Listener<R> {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        receiver: R,
        metric_sink: Arc<dyn MetricSink>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry,
            receiver,
            metric_sink,
            retry: config.recv_retry,
        }
    }

    /// Read and handle replies until a receive failure persists.
    ///
    /// Undecodable packets are dropped. Any other receive error is retried
    /// with backoff; once the receive policy is exhausted the failure is
    /// returned as [`Error::Persistent`].
    pub fn run(mut self) -> Result<()> {
        let mut failures = 0;
        loop {
            match self.receiver.recv_reply() {
                Ok(reply) => {
                    failures = 0;
                    if let Some(reply) = reply {
                        self.handle_reply(&reply);
                    }
                }
                Err(err @ (Error::PacketError(_) | Error::MissingAddr)) => {
                    tracing::debug!(%err, "dropping packet");
                }
                Err(err) => {
                    failures += 1;
                    if !self.retry.should_retry(failures) {
                        return Err(Error::Persistent {
                            task: Task::Listener,
                            failures,
                            source: Box::new(err),
                        });
                    }
                    let delay = self.retry.delay(failures);
                    tracing::warn!(failures, ?delay, %err, "failed to receive, backing off");
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Match a reply to its peer, update the counters and emit its round trip time.
    ///
    /// Replies from unknown hosts, or whose payload does not carry the peer's
    /// identity, are ignored and return `None`.
    pub fn handle_reply(&self, reply: &EchoReply) -> Option<ReplyMatch> {
        let Some(peer) = self.registry.lookup(reply.addr) else {
            tracing::trace!(addr = %reply.addr, "reply from unknown host");
            return None;
        };
        if !peer.payload().matches(&reply.payload) {
            tracing::trace!(addr = %reply.addr, "reply payload mismatch");
            return None;
        }
        let matched = peer.record_reply(reply.sequence);
        tracing::trace!(addr = %reply.addr, sequence = reply.sequence.0, ?matched);
        if let Some(sent) = matched.sent {
            match reply.received.duration_since(sent) {
                Ok(rtt) => self.metric_sink.emit(Sample::Rtt(RttSample {
                    host: reply.addr,
                    time: reply.received,
                    rtt,
                })),
                Err(err) => tracing::debug!(addr = %reply.addr, %err, "clock went backwards"),
            }
        }
        Some(matched)
    }
}
