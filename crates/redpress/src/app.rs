use crate::config::{InfluxDbConfig, LogFormat, RedpressConfig};
use crate::export::{self, InfluxDbWriter};
use crate::privilege::Privilege;
use crate::report::TsvReportSink;
use anyhow::Context;
use itertools::Itertools;
use redpress_core::{
    Builder, Discard, Identifier, MetricSink, Monitor, ProbeSender, ReplyReceiver, SampleQueue,
};
use std::sync::Arc;
use std::time::SystemTime;

/// Run the redpress application.
pub fn run_redpress(cfg: &RedpressConfig, pid: u16) -> anyhow::Result<()> {
    configure_logging(cfg);
    let (monitor, report_path) =
        start_monitor(cfg, pid, SystemTime::now(), Builder::open_channel)?;
    Privilege::drop_privileges()?;
    tracing::info!(
        hosts = %cfg.hosts.iter().join(", "),
        privilege_mode = %cfg.privilege_mode,
        probe_interval = ?cfg.probe_interval,
        report_interval = ?cfg.report_interval,
        history_size = cfg.history_size,
        report = %report_path,
        influxdb = cfg.influxdb.as_ref().map_or("disabled", |influxdb| influxdb.url.as_str()),
        "redpress started"
    );
    monitor.run().context("monitor stopped")
}

/// Open the channel with `connect`, then create the sinks and build the monitor.
///
/// Nothing is written to disk or exported unless the channel opens.
fn start_monitor<S, R, F>(
    cfg: &RedpressConfig,
    pid: u16,
    started: SystemTime,
    connect: F,
) -> anyhow::Result<(Monitor<S, R>, String)>
where
    S: ProbeSender,
    R: ReplyReceiver,
    F: FnOnce(&Builder) -> redpress_core::Result<(S, R)>,
{
    let builder = Builder::new(cfg.hosts.iter().copied())
        .privilege_mode(cfg.privilege_mode)
        .identifier(Identifier(pid))
        .probe_interval(cfg.probe_interval)
        .report_interval(cfg.report_interval)
        .history_size(cfg.history_size);
    let (sender, receiver) = connect(&builder).context("failed to open ICMP channel")?;
    let report_sink = TsvReportSink::create(&cfg.report_dir, started)?;
    let report_path = report_sink
        .path()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let metric_sink = make_metric_sink(cfg.influxdb.as_ref())?;
    let monitor = builder
        .metric_sink(metric_sink)
        .report_sink(Box::new(report_sink))
        .build_with(sender, receiver)
        .context("failed to start monitor")?;
    Ok((monitor, report_path))
}

/// Configure the global tracing subscriber.
fn configure_logging(cfg: &RedpressConfig) {
    match cfg.log_format {
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(&cfg.log_filter)
                .compact()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(&cfg.log_filter)
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(&cfg.log_filter)
                .json()
                .init();
        }
    }
}

/// Make the metric sink, a bounded queue in front of the exporter or a sink
/// which discards every sample.
fn make_metric_sink(influxdb: Option<&InfluxDbConfig>) -> anyhow::Result<Arc<dyn MetricSink>> {
    let Some(influxdb) = influxdb else {
        return Ok(Arc::new(Discard));
    };
    let (queue, samples) = SampleQueue::bounded(influxdb.queue_capacity, influxdb.queue_overflow);
    let writer = InfluxDbWriter::new(influxdb)?;
    export::spawn(samples, writer, source_hostname())?;
    Ok(Arc::new(queue))
}

/// The local hostname, used as the `source` tag of every exported sample.
#[cfg(unix)]
fn source_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname.to_string_lossy().into_owned(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read hostname");
            String::from("unknown")
        }
    }
}

#[cfg(not(unix))]
fn source_hostname() -> String {
    String::from("unknown")
}
