use crate::retry::RetryPolicy;
use crate::types::Identifier;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use crate::retry::RetryPolicy;
    use crate::PrivilegeMode;
    use std::time::Duration;

    /// The default value for `privilege-mode`.
    pub const DEFAULT_PRIVILEGE_MODE: PrivilegeMode = PrivilegeMode::Privileged;

    /// The default value for `probe-interval`.
    pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

    /// The default value for `report-interval`.
    pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(60);

    /// The default value for `history-size`.
    pub const DEFAULT_HISTORY_SIZE: usize = 16;

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// The default retry policy for sending a single probe.
    pub const DEFAULT_SEND_RETRY: RetryPolicy =
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50));

    /// The default retry policy for the receive loop.
    pub const DEFAULT_RECV_RETRY: RetryPolicy =
        RetryPolicy::new(8, Duration::from_millis(100), Duration::from_secs(5));

    /// The default number of consecutive failed probe rounds for a peer
    /// before the failure is escalated.
    pub const DEFAULT_MAX_FAILED_ROUNDS: usize = 5;
}

/// The privilege mode.
///
/// Privileged mode uses raw sockets, unprivileged mode uses `IPPROTO_ICMP`
/// datagram sockets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivilegeMode {
    Privileged,
    Unprivileged,
}

impl PrivilegeMode {
    #[must_use]
    pub const fn is_unprivileged(self) -> bool {
        matches!(self, Self::Unprivileged)
    }
}

impl Display for PrivilegeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Privileged => write!(f, "privileged"),
            Self::Unprivileged => write!(f, "unprivileged"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChannelConfig {
    pub privilege_mode: PrivilegeMode,
    pub read_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            privilege_mode: defaults::DEFAULT_PRIVILEGE_MODE,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Timing and failure policy shared by the monitor tasks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MonitorConfig {
    pub identifier: Identifier,
    pub probe_interval: Duration,
    pub report_interval: Duration,
    pub history_size: usize,
    pub send_retry: RetryPolicy,
    pub recv_retry: RetryPolicy,
    pub max_failed_rounds: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            identifier: Identifier::default(),
            probe_interval: defaults::DEFAULT_PROBE_INTERVAL,
            report_interval: defaults::DEFAULT_REPORT_INTERVAL,
            history_size: defaults::DEFAULT_HISTORY_SIZE,
            send_retry: defaults::DEFAULT_SEND_RETRY,
            recv_retry: defaults::DEFAULT_RECV_RETRY,
            max_failed_rounds: defaults::DEFAULT_MAX_FAILED_ROUNDS,
        }
    }
}
