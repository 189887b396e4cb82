use crate::config::{ChannelConfig, MonitorConfig, PrivilegeMode};
use crate::constants::{MAX_HISTORY_SIZE, MIN_PROBE_INTERVAL_SECS, MIN_REPORT_INTERVAL_SECS};
use crate::error::{Error, IoError, IoOperation, Result, Task};
use crate::listener::Listener;
use crate::net::channel::{Channel, ChannelReceiver, ChannelSender};
use crate::net::{ProbeSender, ReplyReceiver, SocketImpl};
use crate::peer::Peer;
use crate::prober::Prober;
use crate::registry::Registry;
use crate::report::ReportSink;
use crate::reporter::Reporter;
use crate::retry::RetryPolicy;
use crate::sink::{Discard, MetricSink};
use crate::types::{IdentityPayload, Identifier};
use crossbeam::channel::{bounded, Sender};
use itertools::Itertools;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

/// Build a [`Monitor`].
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use redpress_core::{Builder, PrivilegeMode};
/// use std::net::IpAddr;
/// use std::str::FromStr;
///
/// let hosts = [IpAddr::from_str("192.0.2.1")?, IpAddr::from_str("192.0.2.2")?];
/// let monitor = Builder::new(hosts)
///     .privilege_mode(PrivilegeMode::Unprivileged)
///     .history_size(32)
///     .build()?;
/// monitor.run()?;
/// # Ok(())
/// # }
/// ```
pub struct Builder {
    hosts: Vec<IpAddr>,
    channel: ChannelConfig,
    config: MonitorConfig,
    metric_sink: Arc<dyn MetricSink>,
    report_sink: Box<dyn ReportSink>,
}

impl Builder {
    /// Create a builder monitoring `hosts` with default settings.
    pub fn new(hosts: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
            channel: ChannelConfig::default(),
            config: MonitorConfig::default(),
            metric_sink: Arc::new(Discard),
            report_sink: Box::new(Discard),
        }
    }

    #[must_use]
    pub fn privilege_mode(self, privilege_mode: PrivilegeMode) -> Self {
        Self {
            channel: ChannelConfig {
                privilege_mode,
                ..self.channel
            },
            ..self
        }
    }

    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            channel: ChannelConfig {
                read_timeout,
                ..self.channel
            },
            ..self
        }
    }

    /// The `ICMP` identifier to send; datagram sockets on Linux may replace it.
    #[must_use]
    pub fn identifier(self, identifier: Identifier) -> Self {
        Self {
            config: MonitorConfig {
                identifier,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn probe_interval(self, probe_interval: Duration) -> Self {
        Self {
            config: MonitorConfig {
                probe_interval,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn report_interval(self, report_interval: Duration) -> Self {
        Self {
            config: MonitorConfig {
                report_interval,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn history_size(self, history_size: usize) -> Self {
        Self {
            config: MonitorConfig {
                history_size,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn send_retry(self, send_retry: RetryPolicy) -> Self {
        Self {
            config: MonitorConfig {
                send_retry,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn recv_retry(self, recv_retry: RetryPolicy) -> Self {
        Self {
            config: MonitorConfig {
                recv_retry,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn max_failed_rounds(self, max_failed_rounds: usize) -> Self {
        Self {
            config: MonitorConfig {
                max_failed_rounds,
                ..self.config
            },
            ..self
        }
    }

    #[must_use]
    pub fn metric_sink(self, metric_sink: Arc<dyn MetricSink>) -> Self {
        Self { metric_sink, ..self }
    }

    #[must_use]
    pub fn report_sink(self, report_sink: Box<dyn ReportSink>) -> Self {
        Self { report_sink, ..self }
    }

    /// Validate the configuration and open the `ICMPv4` channel.
    ///
    /// In privileged mode this requires the `CAP_NET_RAW` capability on Linux.
    pub fn build(
        self,
    ) -> Result<Monitor<ChannelSender<SocketImpl>, ChannelReceiver<SocketImpl>>> {
        let (sender, receiver) = self.open_channel()?;
        self.build_with(sender, receiver)
    }

    /// Validate the configuration and open the `ICMPv4` channel without
    /// building the monitor.
    ///
    /// Pass the halves to [`Builder::build_with`] once any sinks which depend
    /// on a working channel have been created.
    pub fn open_channel(
        &self,
    ) -> Result<(ChannelSender<SocketImpl>, ChannelReceiver<SocketImpl>)> {
        self.validate()?;
        Ok(Channel::<SocketImpl>::connect(&self.channel)?.split())
    }

    /// Validate the configuration and build a monitor over the given network halves.
    pub fn build_with<S: ProbeSender, R: ReplyReceiver>(
        self,
        sender: S,
        receiver: R,
    ) -> Result<Monitor<S, R>> {
        self.validate()?;
        let started = SystemTime::now();
        let peers = self.hosts.iter().map(|&addr| {
            Peer::new(
                addr,
                IdentityPayload::random(),
                self.config.history_size,
                started,
            )
        });
        let registry = Arc::new(Registry::new(peers)?);
        Ok(Monitor {
            prober: Prober::new(Arc::clone(&registry), sender, &self.config),
            listener: Listener::new(
                Arc::clone(&registry),
                receiver,
                Arc::clone(&self.metric_sink),
                &self.config,
            ),
            reporter: Reporter::new(
                Arc::clone(&registry),
                self.metric_sink,
                self.report_sink,
                &self.config,
            ),
            registry,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(Error::BadConfig(String::from("no hosts to monitor")));
        }
        if let Some(&addr) = self.hosts.iter().find(|addr| !addr.is_ipv4()) {
            return Err(Error::UnsupportedAddress(addr));
        }
        if let Some(&addr) = self.hosts.iter().duplicates().next() {
            return Err(Error::DuplicateHost(addr));
        }
        let config = &self.config;
        if config.probe_interval < Duration::from_secs(MIN_PROBE_INTERVAL_SECS) {
            return Err(Error::BadConfig(format!(
                "probe interval {:?} is less than the minimum of {MIN_PROBE_INTERVAL_SECS}s",
                config.probe_interval
            )));
        }
        if config.report_interval < Duration::from_secs(MIN_REPORT_INTERVAL_SECS) {
            return Err(Error::BadConfig(format!(
                "report interval {:?} is less than the minimum of {MIN_REPORT_INTERVAL_SECS}s",
                config.report_interval
            )));
        }
        if config.report_interval <= config.probe_interval {
            return Err(Error::BadConfig(format!(
                "report interval {:?} must exceed probe interval {:?}",
                config.report_interval, config.probe_interval
            )));
        }
        if !(1..=MAX_HISTORY_SIZE).contains(&config.history_size) {
            return Err(Error::BadConfig(format!(
                "history size {} must be between 1 and {MAX_HISTORY_SIZE}",
                config.history_size
            )));
        }
        if config.send_retry.max_attempts == 0 || config.recv_retry.max_attempts == 0 {
            return Err(Error::BadConfig(String::from(
                "retry policies must allow at least one attempt",
            )));
        }
        if config.max_failed_rounds == 0 {
            return Err(Error::BadConfig(String::from(
                "max failed rounds must be at least 1",
            )));
        }
        Ok(())
    }
}

/// A running reachability monitor.
///
/// Owns the prober, listener and reporter tasks over a shared [`Registry`].
pub struct Monitor<S, R> {
    registry: Arc<Registry>,
    prober: Prober<S>,
    listener: Listener<R>,
    reporter: Reporter,
}

impl<S, R> Monitor<S, R>
where
    S: ProbeSender + 'static,
    R: ReplyReceiver + 'static,
{
    /// The monitored peers.
    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run the monitor tasks until one of them fails.
    ///
    /// Each task runs on its own named thread; the first task to fail stops
    /// the monitor and its error is returned. This never returns `Ok`.
    pub fn run(self) -> Result<()> {
        let (failure_tx, failure_rx) = bounded(3);
        let Self {
            prober,
            listener,
            reporter,
            ..
        } = self;
        spawn_task(Task::Listener, failure_tx.clone(), move || listener.run())?;
        spawn_task(Task::Prober, failure_tx.clone(), move || prober.run())?;
        spawn_task(Task::Reporter, failure_tx, move || reporter.run())?;
        match failure_rx.recv() {
            Ok(err) => Err(err),
            Err(_) => Err(Error::Other(String::from("all monitor tasks exited"))),
        }
    }
}

fn spawn_task<F>(task: Task, failures: Sender<Error>, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    thread::Builder::new()
        .name(format!("redpress-{task}"))
        .spawn(move || {
            tracing::debug!(%task, "started");
            let err = match f() {
                Ok(()) => Error::Other(format!("{task} exited")),
                Err(err) => err,
            };
            tracing::error!(%task, %err, "task failed");
            if failures.send(err).is_err() {
                tracing::debug!(%task, "monitor no longer running");
            }
        })
        .map_err(|err| Error::IoError(IoError::Other(err, IoOperation::SpawnThread)))?;
    Ok(())
}
