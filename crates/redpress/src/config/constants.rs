use crate::config::{LogFormat, QueueOverflow};

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Compact;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "redpress=info";

/// The value for `log-filter` when `--verbose` is given.
pub const VERBOSE_LOG_FILTER: &str = "redpress=debug";

/// The default value for `report-dir`.
pub const DEFAULT_REPORT_DIR: &str = ".";

/// The default value for `queue-capacity`.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// The default value for `queue-overflow`.
pub const DEFAULT_QUEUE_OVERFLOW: QueueOverflow = QueueOverflow::DropNewest;
