use crate::error::Result;
use crate::peer::Window;
use crate::sink::ReachSample;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// The counters of one peer over one report window.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReportRecord {
    pub addr: IpAddr,
    pub window_start: SystemTime,
    pub window_end: SystemTime,
    pub sent: u64,
    pub recv_in_order: u64,
    pub recv_out_of_order: u64,
    pub lost: i64,
}

impl ReportRecord {
    #[must_use]
    pub const fn new(addr: IpAddr, window: &Window) -> Self {
        Self {
            addr,
            window_start: window.start,
            window_end: window.end,
            sent: window.counters.sent,
            recv_in_order: window.counters.recv_in_order,
            recv_out_of_order: window.counters.recv_out_of_order,
            lost: window.counters.lost(),
        }
    }

    /// The "reach" sample for this record.
    #[must_use]
    pub const fn reach_sample(&self) -> ReachSample {
        ReachSample {
            host: self.addr,
            time: self.window_end,
            send: self.sent,
            recv: self.recv_in_order,
            delayed: self.recv_out_of_order,
            lost: self.lost,
        }
    }
}

/// Seconds since the Unix epoch, or zero for earlier times.
#[must_use]
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// A destination for report records, one per peer per report window.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink: Send {
    fn write_record(&mut self, record: &ReportRecord) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Counters;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[test]
    fn test_record_from_window() {
        let window = Window {
            start: SystemTime::UNIX_EPOCH,
            end: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
            counters: Counters {
                sent: 10,
                recv_in_order: 7,
                recv_out_of_order: 2,
            },
        };
        let addr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7));
        let record = ReportRecord::new(addr, &window);
        assert_eq!(1, record.lost);
        assert_eq!(60, unix_secs(record.window_end));
        let reach = record.reach_sample();
        assert_eq!(
            ReachSample {
                host: addr,
                time: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
                send: 10,
                recv: 7,
                delayed: 2,
                lost: 1,
            },
            reach
        );
    }
}
