use crate::history::TransmitHistory;
use crate::types::{IdentityPayload, Sequence};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::time::SystemTime;

/// A monitored host and its probe state.
///
/// All mutable state is held behind a per-peer lock and is only reachable
/// through the methods below, each of which takes the lock exactly once.
#[derive(Debug)]
pub struct Peer {
    addr: IpAddr,
    payload: IdentityPayload,
    state: Mutex<PeerState>,
}

#[derive(Debug)]
struct PeerState {
    sequence: Sequence,
    history: TransmitHistory,
    counters: Counters,
    last_reset: SystemTime,
}

impl Peer {
    #[must_use]
    pub fn new(
        addr: IpAddr,
        payload: IdentityPayload,
        history_size: usize,
        started: SystemTime,
    ) -> Self {
        Self {
            addr,
            payload,
            state: Mutex::new(PeerState {
                sequence: Sequence::default(),
                history: TransmitHistory::new(history_size),
                counters: Counters::default(),
                last_reset: started,
            }),
        }
    }

    #[must_use]
    pub const fn addr(&self) -> IpAddr {
        self.addr
    }

    #[must_use]
    pub const fn payload(&self) -> &IdentityPayload {
        &self.payload
    }

    /// Record a probe transmitted at `sent` and return its sequence.
    pub fn record_probe(&self, sent: SystemTime) -> Sequence {
        let mut state = self.state.lock();
        state.sequence = state.sequence.next();
        state.history.push(sent);
        state.counters.sent += 1;
        state.sequence
    }

    /// Classify a reply carrying `sequence` and recover its transmit time.
    ///
    /// The ordering and the history lookup happen under the same lock so a
    /// concurrent probe cannot shift the history between them.
    pub fn record_reply(&self, sequence: Sequence) -> ReplyMatch {
        let mut state = self.state.lock();
        let distance = state.sequence.distance(sequence);
        let order = if distance == 0 {
            state.counters.recv_in_order += 1;
            ReplyOrder::InOrder
        } else {
            state.counters.recv_out_of_order += 1;
            ReplyOrder::OutOfOrder
        };
        let sent = state.history.get(usize::from(distance));
        ReplyMatch {
            order,
            distance,
            sent,
        }
    }

    /// Snapshot the counters for the window ending at `now` and start a new one.
    pub fn reset(&self, now: SystemTime) -> Window {
        let mut state = self.state.lock();
        let counters = std::mem::take(&mut state.counters);
        let start = std::mem::replace(&mut state.last_reset, now);
        Window {
            start,
            end: now,
            counters,
        }
    }

    /// A consistent copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PeerSnapshot {
        let state = self.state.lock();
        PeerSnapshot {
            sequence: state.sequence,
            history: state.history.iter().collect(),
            counters: state.counters,
            last_reset: state.last_reset,
        }
    }
}

/// Probe and reply counts accumulated over a report window.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Counters {
    pub sent: u64,
    pub recv_in_order: u64,
    pub recv_out_of_order: u64,
}

impl Counters {
    /// Probes sent without any reply.
    ///
    /// Negative when duplicate replies outnumber the probes sent.
    #[must_use]
    #[expect(clippy::cast_possible_wrap)]
    pub const fn lost(&self) -> i64 {
        self.sent as i64 - self.recv_in_order as i64 - self.recv_out_of_order as i64
    }
}

/// The counters of a closed report window.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Window {
    pub start: SystemTime,
    pub end: SystemTime,
    pub counters: Counters,
}

/// Whether a reply matched the most recent probe.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReplyOrder {
    InOrder,
    OutOfOrder,
}

/// The outcome of matching a reply against a peer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReplyMatch {
    pub order: ReplyOrder,
    pub distance: u16,
    /// The transmit time of the matched probe, if still in the history.
    pub sent: Option<SystemTime>,
}

/// A point in time copy of a peer's state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PeerSnapshot {
    pub sequence: Sequence,
    pub history: Vec<Option<SystemTime>>,
    pub counters: Counters,
    pub last_reset: SystemTime,
}
