use crate::config::file::{ConfigFile, ConfigInfluxDb};
use crate::privilege::Privilege;
use anyhow::anyhow;
use clap::ValueEnum;
use itertools::Itertools;
use redpress_core::{defaults, OverflowPolicy, PrivilegeMode, MAX_HISTORY_SIZE};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// What to do with a sample when the export queue is full.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueOverflow {
    /// Discard the new sample.
    DropNewest,
    /// Discard the oldest queued sample.
    DropOldest,
}

impl From<QueueOverflow> for OverflowPolicy {
    fn from(value: QueueOverflow) -> Self {
        match value {
            QueueOverflow::DropNewest => Self::DropNewest,
            QueueOverflow::DropOldest => Self::DropOldest,
        }
    }
}

/// The `InfluxDB` export target.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InfluxDbConfig {
    pub url: String,
    pub bucket: String,
    pub org: String,
    pub token: String,
    pub queue_capacity: usize,
    pub queue_overflow: OverflowPolicy,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RedpressConfig {
    pub hosts: Vec<IpAddr>,
    pub probe_interval: Duration,
    pub report_interval: Duration,
    pub privilege_mode: PrivilegeMode,
    pub history_size: usize,
    pub report_dir: PathBuf,
    pub influxdb: Option<InfluxDbConfig>,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl RedpressConfig {
    pub fn from(args: Args, privilege: &Privilege) -> anyhow::Result<Self> {
        let cfg_file = file::read_config_file(&args.config_file)?;
        Self::build_config(args, cfg_file, privilege)
    }

    fn build_config(
        args: Args,
        cfg_file: ConfigFile,
        privilege: &Privilege,
    ) -> anyhow::Result<Self> {
        let cfg_file_log = cfg_file.log.unwrap_or_default();
        let hosts = parse_hosts(cfg_file.hosts.as_deref())?;
        let probe_interval = cfg_file
            .probe_interval
            .map_or(defaults::DEFAULT_PROBE_INTERVAL, Duration::from_secs);
        let report_interval = cfg_file
            .report_interval
            .map_or(defaults::DEFAULT_REPORT_INTERVAL, Duration::from_secs);
        let unprivileged = cfg_layer_bool_flag(
            args.unprivileged,
            cfg_file.unprivileged,
            defaults::DEFAULT_PRIVILEGE_MODE.is_unprivileged(),
        );
        let privilege_mode = if unprivileged {
            PrivilegeMode::Unprivileged
        } else {
            PrivilegeMode::Privileged
        };
        let history_size = cfg_file
            .history_size
            .unwrap_or(defaults::DEFAULT_HISTORY_SIZE);
        let report_dir = PathBuf::from(
            cfg_file
                .report_dir
                .unwrap_or_else(|| String::from(constants::DEFAULT_REPORT_DIR)),
        );
        let influxdb = cfg_file.influxdb.map(influxdb_config).transpose()?;
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_log.format,
            constants::DEFAULT_LOG_FORMAT,
        );
        let verbose_filter = args
            .verbose
            .then(|| String::from(constants::VERBOSE_LOG_FILTER));
        let log_filter = cfg_layer(
            args.log_filter.or(verbose_filter),
            cfg_file_log.filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        validate_privilege(privilege_mode, privilege.has_privileges())?;
        validate_hosts(&hosts)?;
        validate_intervals(probe_interval, report_interval)?;
        validate_history_size(history_size)?;
        Ok(Self {
            hosts,
            probe_interval,
            report_interval,
            privilege_mode,
            history_size,
            report_dir,
            influxdb,
            log_format,
            log_filter,
        })
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

/// Parse the host address literals.
fn parse_hosts(hosts: Option<&[String]>) -> anyhow::Result<Vec<IpAddr>> {
    hosts
        .ok_or_else(|| anyhow!("missing required setting `hosts`"))?
        .iter()
        .map(|host| {
            IpAddr::from_str(host.trim())
                .map_err(|_| anyhow!("invalid host address `{host}`: expected an IPv4 literal"))
        })
        .collect()
}

/// Build the export target, all of `url`, `bucket`, `org` and `token` are required.
///
/// A blank value counts as missing.
fn influxdb_config(cfg: ConfigInfluxDb) -> anyhow::Result<InfluxDbConfig> {
    let url = non_blank(cfg.url);
    let bucket = non_blank(cfg.bucket);
    let org = non_blank(cfg.org);
    let token = non_blank(cfg.token);
    let missing = [
        ("url", url.is_none()),
        ("bucket", bucket.is_none()),
        ("org", org.is_none()),
        ("token", token.is_none()),
    ]
    .into_iter()
    .filter_map(|(key, missing)| missing.then_some(key))
    .join(", ");
    let queue_capacity = cfg
        .queue_capacity
        .unwrap_or(constants::DEFAULT_QUEUE_CAPACITY);
    if queue_capacity == 0 {
        return Err(anyhow!("queue-capacity in [influxdb] section must be greater than 0"));
    }
    let queue_overflow = OverflowPolicy::from(
        cfg.queue_overflow
            .unwrap_or(constants::DEFAULT_QUEUE_OVERFLOW),
    );
    match (url, bucket, org, token) {
        (Some(url), Some(bucket), Some(org), Some(token)) => Ok(InfluxDbConfig {
            url,
            bucket,
            org,
            token,
            queue_capacity,
            queue_overflow,
        }),
        _ => Err(anyhow!(
            "incomplete [influxdb] section, missing required settings: {missing}"
        )),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Validate privileges.
fn validate_privilege(privilege_mode: PrivilegeMode, has_privileges: bool) -> anyhow::Result<()> {
    match (privilege_mode, has_privileges) {
        (PrivilegeMode::Privileged, false) => Err(anyhow!(
            "privileges are required for raw sockets (hint: set `unprivileged = true` or pass -u to use datagram ICMP sockets)"
        )),
        _ => Ok(()),
    }
}

/// Validate the monitored hosts.
fn validate_hosts(hosts: &[IpAddr]) -> anyhow::Result<()> {
    if hosts.is_empty() {
        Err(anyhow!("no hosts to monitor, `hosts` must not be empty"))
    } else if let Some(host) = hosts.iter().find(|host| host.is_ipv6()) {
        Err(anyhow!("IPv6 host {host} is not supported"))
    } else if let Some(host) = hosts.iter().duplicates().next() {
        Err(anyhow!("duplicate host {host}"))
    } else {
        Ok(())
    }
}

/// Validate `probe-interval` and `report-interval`.
fn validate_intervals(probe_interval: Duration, report_interval: Duration) -> anyhow::Result<()> {
    if probe_interval < Duration::from_secs(1) {
        Err(anyhow!(
            "probe-interval ({}s) must be at least 1s",
            probe_interval.as_secs()
        ))
    } else if report_interval < Duration::from_secs(60) {
        Err(anyhow!(
            "report-interval ({}s) must be at least 60s",
            report_interval.as_secs()
        ))
    } else if report_interval <= probe_interval {
        Err(anyhow!(
            "report-interval ({}s) must be greater than probe-interval ({}s)",
            report_interval.as_secs(),
            probe_interval.as_secs()
        ))
    } else {
        Ok(())
    }
}

/// Validate `history-size`.
fn validate_history_size(history_size: usize) -> anyhow::Result<()> {
    if (1..=MAX_HISTORY_SIZE).contains(&history_size) {
        Ok(())
    } else {
        Err(anyhow!(
            "history-size ({history_size}) must be between 1 and {MAX_HISTORY_SIZE}"
        ))
    }
}
