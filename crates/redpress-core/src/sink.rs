use crate::error::Result;
use crate::report::{ReportRecord, ReportSink};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// A measurement produced by the monitor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Sample {
    /// Reachability counters for one peer and report window.
    Reach(ReachSample),
    /// The round trip time of one reply.
    Rtt(RttSample),
}

impl Sample {
    #[must_use]
    pub const fn host(&self) -> IpAddr {
        match self {
            Self::Reach(reach) => reach.host,
            Self::Rtt(rtt) => rtt.host,
        }
    }

    #[must_use]
    pub const fn time(&self) -> SystemTime {
        match self {
            Self::Reach(reach) => reach.time,
            Self::Rtt(rtt) => rtt.time,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReachSample {
    pub host: IpAddr,
    /// The end of the report window.
    pub time: SystemTime,
    pub send: u64,
    pub recv: u64,
    pub delayed: u64,
    pub lost: i64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RttSample {
    pub host: IpAddr,
    /// When the reply was received.
    pub time: SystemTime,
    pub rtt: Duration,
}

/// A destination for samples.
///
/// Called from the listener and reporter threads outside of any peer lock;
/// implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait MetricSink: Send + Sync {
    fn emit(&self, sample: Sample);
}

/// What a [`SampleQueue`] does when it is full.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    /// Discard the sample being emitted.
    #[default]
    DropNewest,
    /// Discard the oldest queued sample to make room.
    DropOldest,
}

/// A bounded queue of samples in front of a slow exporter.
///
/// Emitting never blocks; when the queue is full a sample is discarded
/// according to the [`OverflowPolicy`] and counted.
#[derive(Debug)]
pub struct SampleQueue {
    tx: Sender<Sample>,
    rx: Receiver<Sample>,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl SampleQueue {
    /// Create a queue holding at most `capacity` samples and the receiver
    /// an exporter should drain.
    #[must_use]
    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> (Self, Receiver<Sample>) {
        let (tx, rx) = bounded(capacity.max(1));
        let queue = Self {
            tx,
            rx: rx.clone(),
            policy,
            dropped: AtomicU64::new(0),
        };
        (queue, rx)
    }

    /// The number of samples discarded so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, sample: &Sample) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(
            host = %sample.host(),
            dropped,
            policy = ?self.policy,
            "sample queue full, sample dropped"
        );
    }
}

impl MetricSink for SampleQueue {
    fn emit(&self, sample: Sample) {
        match self.tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(sample)) => match self.policy {
                OverflowPolicy::DropNewest => self.record_drop(&sample),
                OverflowPolicy::DropOldest => {
                    if let Ok(oldest) = self.rx.try_recv() {
                        self.record_drop(&oldest);
                    }
                    if let Err(err) = self.tx.try_send(sample) {
                        self.record_drop(&err.into_inner());
                    }
                }
            },
            Err(TrySendError::Disconnected(sample)) => {
                tracing::debug!(host = %sample.host(), "sample queue disconnected");
            }
        }
    }
}

/// A sink which discards every sample and report record.
#[derive(Debug, Default)]
pub struct Discard;

impl MetricSink for Discard {
    fn emit(&self, sample: Sample) {
        tracing::trace!(?sample, "discarding sample");
    }
}

impl ReportSink for Discard {
    fn write_record(&mut self, _record: &ReportRecord) -> Result<()> {
        Ok(())
    }
}
