/// The number of identity payload bytes carried by every probe.
pub const PAYLOAD_SIZE: usize = 16;

/// The maximum size of the IP packet we accept.
pub const MAX_PACKET_SIZE: usize = 1024;

/// The largest transmit history we allow.
pub const MAX_HISTORY_SIZE: usize = 1024;

/// The shortest probe interval we allow.
pub const MIN_PROBE_INTERVAL_SECS: u64 = 1;

/// The shortest report interval we allow.
pub const MIN_REPORT_INTERVAL_SECS: u64 = 60;
