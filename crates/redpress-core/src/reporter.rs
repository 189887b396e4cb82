use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::report::{unix_secs, ReportRecord, ReportSink};
use crate::sink::{MetricSink, Sample};
use crossbeam::channel::tick;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

/// Closes a report window for every peer once per report interval.
pub struct Reporter {
    registry: Arc<Registry>,
    metric_sink: Arc<dyn MetricSink>,
    report_sink: Box<dyn ReportSink>,
    initial_delay: Duration,
    interval: Duration,
}

impl Reporter {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        metric_sink: Arc<dyn MetricSink>,
        report_sink: Box<dyn ReportSink>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry,
            metric_sink,
            report_sink,
            initial_delay: config.probe_interval / 2,
            interval: config.report_interval,
        }
    }

    /// Report every interval.
    ///
    /// The first tick is offset by half a probe interval so windows do not
    /// close at the instant a probe round starts.
    pub fn run(mut self) -> Result<()> {
        thread::sleep(self.initial_delay);
        let ticker = tick(self.interval);
        loop {
            ticker
                .recv()
                .map_err(|err| Error::Other(err.to_string()))?;
            self.report(SystemTime::now());
        }
    }

    /// Close the window ending at `now` for every peer.
    ///
    /// A failure to write one record is logged and does not stop the others.
    pub fn report(&mut self, now: SystemTime) {
        tracing::info!(at = unix_secs(now), peers = self.registry.len(), "report");
        for peer in self.registry.iter() {
            let window = peer.reset(now);
            let record = ReportRecord::new(peer.addr(), &window);
            if record.lost < 0 {
                tracing::warn!(
                    addr = %record.addr,
                    lost = record.lost,
                    "more replies than probes in window"
                );
            }
            tracing::info!(
                addr = %record.addr,
                sent = record.sent,
                recv_in_order = record.recv_in_order,
                recv_out_of_order = record.recv_out_of_order,
                lost = record.lost,
                "reach"
            );
            if let Err(err) = self.report_sink.write_record(&record) {
                tracing::error!(addr = %record.addr, %err, "failed to write report record");
            }
            self.metric_sink.emit(Sample::Reach(record.reach_sample()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation};
    use crate::peer::Peer;
    use crate::report::MockReportSink;
    use crate::sink::{MockMetricSink, ReachSample};
    use crate::types::IdentityPayload;
    use mockall::predicate;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};

    const ADDR_A: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
    const ADDR_B: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 11));

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn registry() -> Arc<Registry> {
        let peers =
            [ADDR_A, ADDR_B].map(|addr| Peer::new(addr, IdentityPayload::random(), 8, at(0)));
        Arc::new(Registry::new(peers).unwrap())
    }

    #[test]
    fn test_report_resets_every_peer() {
        let registry = registry();
        let peer_a = registry.lookup(ADDR_A).unwrap();
        for secs in 1..=5 {
            let sequence = peer_a.record_probe(at(secs));
            if secs != 3 {
                peer_a.record_reply(sequence);
            }
        }
        let mut report_sink = MockReportSink::new();
        report_sink
            .expect_write_record()
            .with(predicate::eq(ReportRecord {
                addr: ADDR_A,
                window_start: at(0),
                window_end: at(60),
                sent: 5,
                recv_in_order: 4,
                recv_out_of_order: 0,
                lost: 1,
            }))
            .times(1)
            .returning(|_| Ok(()));
        report_sink
            .expect_write_record()
            .with(predicate::function(|record: &ReportRecord| {
                record.addr == ADDR_B && record.sent == 0 && record.lost == 0
            }))
            .times(1)
            .returning(|_| Ok(()));
        let mut metric_sink = MockMetricSink::new();
        metric_sink
            .expect_emit()
            .with(predicate::eq(Sample::Reach(ReachSample {
                host: ADDR_A,
                time: at(60),
                send: 5,
                recv: 4,
                delayed: 0,
                lost: 1,
            })))
            .times(1)
            .return_const(());
        metric_sink
            .expect_emit()
            .with(predicate::function(|sample: &Sample| sample.host() == ADDR_B))
            .times(1)
            .return_const(());
        let mut reporter = Reporter::new(
            Arc::clone(&registry),
            Arc::new(metric_sink),
            Box::new(report_sink),
            &MonitorConfig::default(),
        );
        reporter.report(at(60));
        for peer in registry.iter() {
            let snapshot = peer.snapshot();
            assert_eq!(0, snapshot.counters.sent);
            assert_eq!(at(60), snapshot.last_reset);
        }
    }

    #[test]
    fn test_report_continues_after_write_failure() {
        let registry = registry();
        let mut report_sink = MockReportSink::new();
        report_sink.expect_write_record().times(2).returning(|_| {
            Err(Error::IoError(IoError::Other(
                io::Error::from(io::ErrorKind::Other),
                IoOperation::WriteReport,
            )))
        });
        let mut metric_sink = MockMetricSink::new();
        metric_sink.expect_emit().times(2).return_const(());
        let mut reporter = Reporter::new(
            registry,
            Arc::new(metric_sink),
            Box::new(report_sink),
            &MonitorConfig::default(),
        );
        reporter.report(at(60));
    }

    #[test]
    fn test_consecutive_windows_are_contiguous() {
        let registry = registry();
        let mut report_sink = MockReportSink::new();
        let mut windows = vec![];
        report_sink
            .expect_write_record()
            .with(predicate::function(|record: &ReportRecord| record.addr == ADDR_A))
            .returning(|_| Ok(()));
        report_sink
            .expect_write_record()
            .with(predicate::function(|record: &ReportRecord| record.addr == ADDR_B))
            .returning(|_| Ok(()));
        let mut metric_sink = MockMetricSink::new();
        metric_sink.expect_emit().return_const(());
        let mut reporter = Reporter::new(
            Arc::clone(&registry),
            Arc::new(metric_sink),
            Box::new(report_sink),
            &MonitorConfig::default(),
        );
        for end in [60, 120, 180] {
            reporter.report(at(end));
            windows.push(registry.lookup(ADDR_A).unwrap().snapshot().last_reset);
        }
        assert_eq!(vec![at(60), at(120), at(180)], windows);
    }

    #[test]
    fn test_initial_delay_is_half_probe_interval() {
        let config = MonitorConfig {
            probe_interval: Duration::from_secs(3),
            ..MonitorConfig::default()
        };
        let reporter = Reporter::new(
            registry(),
            Arc::new(crate::sink::Discard),
            Box::new(crate::sink::Discard),
            &config,
        );
        assert_eq!(Duration::from_millis(1500), reporter.initial_delay);
        assert_eq!(Duration::from_secs(60), reporter.interval);
    }
}
