#![allow(clippy::needless_pass_by_value)]

use redpress_core::{IdentityPayload, Peer, Sequence};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, SystemTime};
use test_case::test_case;

const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 42));

/// A scripted exchange of probes and replies with one peer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Simulation {
    name: String,
    history_size: usize,
    /// Probes answered in order before the first window opens.
    #[serde(default)]
    warmup: u32,
    window: Vec<Window>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Window {
    probes: Vec<Response>,
    #[serde(default = "default_repeat")]
    repeat: usize,
    expected: Expected,
}

const fn default_repeat() -> usize {
    1
}

/// How the peer responds to a probe.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Response {
    Reply,
    Lost,
    Duplicate,
    /// Reply once this many further probes have been sent.
    Delay(u64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Expected {
    sent: u64,
    recv_in_order: u64,
    recv_out_of_order: u64,
    lost: i64,
    /// Replies whose transmit time had already left the history.
    #[serde(default)]
    untimed: u64,
}

macro_rules! sim {
    ($path:expr) => {{
        let data = include_str!(concat!("resources/simulation/", $path));
        toml::from_str(data)?
    }};
}

#[test_case(sim!("ipv4_icmp.toml"))]
#[test_case(sim!("ipv4_icmp_lost.toml"))]
#[test_case(sim!("ipv4_icmp_ooo.toml"))]
#[test_case(sim!("ipv4_icmp_wrap.toml"))]
#[test_case(sim!("ipv4_icmp_dup.toml"))]
#[test_case(sim!("ipv4_icmp_min.toml"))]
fn test_simulation(simulation: Simulation) -> anyhow::Result<()> {
    let peer = Peer::new(
        ADDR,
        IdentityPayload::random(),
        simulation.history_size,
        at(0),
    );
    let mut clock = 0;
    for _ in 0..simulation.warmup {
        clock += 1;
        let sequence = peer.record_probe(at(clock));
        peer.record_reply(sequence);
    }
    peer.reset(at(clock));
    let mut round = 0;
    let mut pending: Vec<(u64, Sequence)> = vec![];
    for (index, window) in simulation.window.iter().enumerate() {
        let start = at(clock);
        let mut untimed = 0;
        for response in window.probes.iter().cycle().take(window.probes.len() * window.repeat) {
            round += 1;
            clock += 1;
            let sequence = peer.record_probe(at(clock));
            pending.retain(|&(due, delayed)| {
                if due <= round {
                    untimed += deliver(&peer, delayed, clock);
                    false
                } else {
                    true
                }
            });
            match response {
                Response::Reply => untimed += deliver(&peer, sequence, clock),
                Response::Duplicate => {
                    untimed += deliver(&peer, sequence, clock);
                    untimed += deliver(&peer, sequence, clock);
                }
                Response::Lost => {}
                Response::Delay(rounds) => pending.push((round + rounds, sequence)),
            }
        }
        let closed = peer.reset(at(clock));
        let name = &simulation.name;
        assert_eq!(start, closed.start, "{name} window {index} start");
        let counters = closed.counters;
        let expected = &window.expected;
        assert_eq!(expected.sent, counters.sent, "{name} window {index} sent");
        assert_eq!(
            expected.recv_in_order, counters.recv_in_order,
            "{name} window {index} recv in order"
        );
        assert_eq!(
            expected.recv_out_of_order, counters.recv_out_of_order,
            "{name} window {index} recv out of order"
        );
        assert_eq!(expected.lost, counters.lost(), "{name} window {index} lost");
        assert_eq!(expected.untimed, untimed, "{name} window {index} untimed");
    }
    Ok(())
}

/// Deliver a reply one second after `clock`, returning 1 if its transmit
/// time could not be recovered.
fn deliver(peer: &Peer, sequence: Sequence, clock: u64) -> u64 {
    let matched = peer.record_reply(sequence);
    match matched.sent {
        Some(sent) => {
            let rtt = at(clock + 1).duration_since(sent).unwrap_or_default();
            assert!(rtt >= Duration::from_secs(1));
            0
        }
        None => 1,
    }
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}
