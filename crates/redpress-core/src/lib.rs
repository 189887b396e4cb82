//! Redpress - an ICMP reachability and latency monitor.
//!
//! This crate provides the probe engine used by the standalone
//! [Redpress](https://github.com/redpress-rs/redpress) agent.
//!
//! A [`Monitor`] sends one `ICMPv4` echo request to every configured host
//! per probe interval, matches the echo replies back to their hosts using a
//! random per-host payload, and once per report interval closes a window of
//! counters for every host: probes sent, replies received in order, replies
//! received out of order and probes lost.
//!
//! Each reply also yields a round trip time sample and each closed window a
//! reach sample; both are passed to a [`MetricSink`]. Closed windows are
//! written to a [`ReportSink`].
//!
//! # Example
//!
//! The following example monitors two hosts using unprivileged `ICMP`
//! sockets, exporting samples to a bounded queue:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! # use std::sync::Arc;
//! use redpress_core::{Builder, OverflowPolicy, PrivilegeMode, SampleQueue};
//!
//! let hosts = [IpAddr::from_str("192.0.2.1")?, IpAddr::from_str("192.0.2.2")?];
//! let (queue, samples) = SampleQueue::bounded(1024, OverflowPolicy::DropNewest);
//! std::thread::spawn(move || {
//!     for sample in samples {
//!         println!("{sample:?}");
//!     }
//! });
//! Builder::new(hosts)
//!     .privilege_mode(PrivilegeMode::Unprivileged)
//!     .metric_sink(Arc::new(queue))
//!     .build()?
//!     .run()?;
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Monitor`].
//! - [`Monitor::run`] - Run the monitor until a task fails.
//! - [`Builder::build_with`] - Build a monitor over a custom network.
//! - [`Prober`], [`Listener`] and [`Reporter`] - The monitor tasks, for driving by hand.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc
)]
#![deny(unsafe_code)]

mod config;
mod constants;
mod error;
mod history;
mod listener;
mod monitor;
mod net;
mod peer;
mod probe;
mod prober;
mod registry;
mod report;
mod reporter;
mod retry;
mod sink;
mod types;

pub use config::{defaults, ChannelConfig, MonitorConfig, PrivilegeMode};
pub use constants::{MAX_HISTORY_SIZE, PAYLOAD_SIZE};
pub use error::{Error, ErrorKind, IoError, IoOperation, Result, Task};
pub use listener::Listener;
pub use monitor::{Builder, Monitor};
pub use net::channel::{ChannelReceiver, ChannelSender};
pub use net::{ProbeSender, ReplyReceiver, SocketImpl};
pub use peer::{Counters, Peer, PeerSnapshot, ReplyMatch, ReplyOrder, Window};
pub use probe::{EchoReply, Probe};
pub use prober::Prober;
pub use registry::Registry;
pub use report::{unix_secs, ReportRecord, ReportSink};
pub use reporter::Reporter;
pub use retry::RetryPolicy;
pub use sink::{Discard, MetricSink, OverflowPolicy, ReachSample, RttSample, Sample, SampleQueue};
pub use types::{IdentityPayload, Identifier, Sequence};
