use crate::config::ChannelConfig;
use crate::error::Result;
use crate::net::socket::Socket;
use crate::net::{ipv4, ProbeSender, ReplyReceiver};
use crate::probe::{EchoReply, Probe};
use std::time::Duration;
use tracing::instrument;

/// A channel for sending echo requests and receiving echo replies.
///
/// Both halves share one underlying socket: datagram `ICMP` sockets only
/// deliver the replies to requests sent on that same socket.
pub struct Channel<S: Socket> {
    sender: ChannelSender<S>,
    receiver: ChannelReceiver<S>,
}

impl<S: Socket> Channel<S> {
    /// Open an `ICMPv4` channel.
    ///
    /// In privileged mode this operation requires the `CAP_NET_RAW` capability on Linux.
    #[instrument(skip_all, level = "trace")]
    pub fn connect(config: &ChannelConfig) -> Result<Self> {
        tracing::debug!(?config);
        let raw = !config.privilege_mode.is_unprivileged();
        let send_socket = S::new_icmp_socket_ipv4(raw)?;
        let recv_socket = send_socket.try_clone()?;
        Ok(Self {
            sender: ChannelSender {
                socket: send_socket,
            },
            receiver: ChannelReceiver {
                socket: recv_socket,
                read_timeout: config.read_timeout,
                ip_header: reads_include_ip_header(raw),
            },
        })
    }

    /// Split into the halves used by the prober and listener threads.
    pub fn split(self) -> (ChannelSender<S>, ChannelReceiver<S>) {
        (self.sender, self.receiver)
    }
}

/// Raw sockets always deliver the IPv4 header; datagram sockets do so on
/// every platform except Linux.
const fn reads_include_ip_header(raw: bool) -> bool {
    raw || !cfg!(target_os = "linux")
}

/// The sending half of a [`Channel`].
pub struct ChannelSender<S: Socket> {
    socket: S,
}

impl<S: Socket + Send> ProbeSender for ChannelSender<S> {
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&mut self, probe: Probe) -> Result<()> {
        tracing::debug!(?probe);
        ipv4::dispatch_echo_request(&mut self.socket, probe)
    }
}

/// The receiving half of a [`Channel`].
pub struct ChannelReceiver<S: Socket> {
    socket: S,
    read_timeout: Duration,
    ip_header: bool,
}

impl<S: Socket + Send> ReplyReceiver for ChannelReceiver<S> {
    #[instrument(skip_all, level = "trace")]
    fn recv_reply(&mut self) -> Result<Option<EchoReply>> {
        if self.socket.is_readable(self.read_timeout)? {
            let reply = ipv4::recv_echo_reply(&mut self.socket, self.ip_header)?;
            if let Some(reply) = &reply {
                tracing::debug!(?reply);
            }
            Ok(reply)
        } else {
            Ok(None)
        }
    }
}
