//! PPP link engine
//!
//! A [`PppLink`] owns one automaton per control protocol plus the link
//! monitor and the PAP client. It is sans-IO: inbound frames, timer expiry
//! and administrative requests go in, [`LinkAction`]s come out. Layers talk
//! to each other only through typed messages on a FIFO queue, each processed
//! to completion before the next.

mod dcp;
mod driver;
mod fsm;
mod ipcp;
mod lcp;
mod options;
mod pap;
mod session;
mod timer;
mod tunnel;

pub use dcp::LinkMonitor;
pub use driver::{run, LinkOutcome, NetworkEvent};
pub use fsm::{transition, Actions, Automaton, ControlProtocol, Event, FsmConfig, State};
pub use ipcp::Ipcp;
pub use lcp::Lcp;
pub use options::{ConfOption, Negotiated, OptionFlags, OptionKind, OptionSet};
pub use pap::PapClient;
pub use session::PppLink;
pub use timer::Timers;
pub use tunnel::{Tunnel, TunnelConfig};

use crate::protocol::ppp::{protocols, PppBuilder};
use crate::telemetry::LinkStats;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Layers of the link, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    /// Link monitor (carrier and keepalive)
    Dcp,
    Lcp,
    /// Authentication (PAP)
    Auth,
    Ipcp,
    Ipv4,
}

impl ProtocolId {
    pub const COUNT: usize = 5;
    pub const ALL: [ProtocolId; Self::COUNT] = [
        ProtocolId::Dcp,
        ProtocolId::Lcp,
        ProtocolId::Auth,
        ProtocolId::Ipcp,
        ProtocolId::Ipv4,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn lower(self) -> Option<ProtocolId> {
        match self {
            ProtocolId::Dcp => None,
            ProtocolId::Lcp => Some(ProtocolId::Dcp),
            ProtocolId::Auth => Some(ProtocolId::Lcp),
            ProtocolId::Ipcp => Some(ProtocolId::Auth),
            ProtocolId::Ipv4 => Some(ProtocolId::Ipcp),
        }
    }

    pub fn upper(self) -> Option<ProtocolId> {
        match self {
            ProtocolId::Dcp => Some(ProtocolId::Lcp),
            ProtocolId::Lcp => Some(ProtocolId::Auth),
            ProtocolId::Auth => Some(ProtocolId::Ipcp),
            ProtocolId::Ipcp => Some(ProtocolId::Ipv4),
            ProtocolId::Ipv4 => None,
        }
    }

    /// PPP protocol number carried in the frame header
    pub fn number(self) -> Option<u16> {
        match self {
            ProtocolId::Dcp => None,
            ProtocolId::Lcp => Some(protocols::LCP),
            ProtocolId::Auth => Some(protocols::PAP),
            ProtocolId::Ipcp => Some(protocols::IPCP),
            ProtocolId::Ipv4 => Some(protocols::IP),
        }
    }

    pub fn from_number(number: u16) -> Option<ProtocolId> {
        match number {
            protocols::LCP => Some(ProtocolId::Lcp),
            protocols::PAP => Some(ProtocolId::Auth),
            protocols::IPCP => Some(ProtocolId::Ipcp),
            protocols::IP => Some(ProtocolId::Ipv4),
            _ => None,
        }
    }
}

/// Messages exchanged between layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerEvent {
    /// Lower layer is up
    LinkUp,
    /// Lower layer went down
    LinkDown,
    /// Upper layer wants the link (TLS)
    UlStarted,
    /// Upper layer is done with the link (TLF)
    UlFinished,
    /// Upper layer reached its opened state
    UpperUp,
    /// Upper layer left its opened state
    UpperDown,
    /// Peer answered a keepalive
    LinkAlive,
    /// Restart timer expired
    Timeout,
    /// Administrative open
    Open,
    /// Administrative close
    Close,
}

/// Whether a layer currently accepts traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    Down,
    Starting,
    Up,
}

/// Work for the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Transmit a complete PPP frame
    Send(Vec<u8>),
    /// Hand an IPv4 datagram to the network stack
    Deliver(Vec<u8>),
    /// Reconfigure the transport framing after LCP opened
    ConfigureTransport { mru: u16, tx_accm: u32, rx_accm: u32 },
    /// IPCP opened with these addresses
    NetworkUp { local: Ipv4Addr, peer: Ipv4Addr },
    NetworkDown,
    /// The peer refused our credentials
    AuthFailed(String),
    /// LCP finished; the link is unusable until reopened
    LinkFinished,
}

/// Link parameters not subject to negotiation
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub username: String,
    pub password: String,
    pub restart: Duration,
    pub max_configure: u8,
    pub max_terminate: u8,
    pub pap_retries: u8,
    /// Zero disables keepalives
    pub echo_interval: Duration,
    pub echo_failures: u8,
    pub tunnel: Option<TunnelConfig>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            restart: Duration::from_secs(3),
            max_configure: 10,
            max_terminate: 3,
            pap_retries: 3,
            echo_interval: Duration::from_secs(30),
            echo_failures: 3,
            tunnel: None,
        }
    }
}

impl LinkConfig {
    pub fn fsm(&self) -> FsmConfig {
        FsmConfig {
            restart: self.restart,
            max_configure: self.max_configure,
            max_terminate: self.max_terminate,
        }
    }
}

/// Shared state handed to every layer while a message is processed
#[derive(Debug)]
pub struct Context {
    pub now: Instant,
    pub timers: Timers,
    queue: VecDeque<(ProtocolId, LayerEvent)>,
    actions: Vec<LinkAction>,
    stats: Arc<LinkStats>,
}

impl Context {
    pub fn new(stats: Arc<LinkStats>) -> Self {
        Self {
            now: Instant::now(),
            timers: Timers::new(),
            queue: VecDeque::new(),
            actions: Vec::new(),
            stats,
        }
    }

    /// Queue a message for another layer
    pub fn notify(&mut self, target: ProtocolId, event: LayerEvent) {
        self.queue.push_back((target, event));
    }

    pub fn next_message(&mut self) -> Option<(ProtocolId, LayerEvent)> {
        self.queue.pop_front()
    }

    /// Frame `payload` with the HDLC header and queue it for transmission
    pub fn send(&mut self, protocol: u16, payload: &[u8]) {
        let frame = PppBuilder::new(protocol).payload(payload).build();
        self.stats.record_tx(frame.len());
        self.actions.push(LinkAction::Send(frame));
    }

    pub fn push_action(&mut self, action: LinkAction) {
        self.actions.push(action);
    }

    pub fn take_actions(&mut self) -> Vec<LinkAction> {
        std::mem::take(&mut self.actions)
    }

    /// Arm the timer of `id`
    pub fn schedule(&mut self, id: ProtocolId, after: Duration) {
        self.timers.schedule(id, self.now, after);
    }

    pub fn cancel(&mut self, id: ProtocolId) {
        self.timers.cancel(id);
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_chain() {
        assert_eq!(ProtocolId::Lcp.lower(), Some(ProtocolId::Dcp));
        assert_eq!(ProtocolId::Lcp.upper(), Some(ProtocolId::Auth));
        assert_eq!(ProtocolId::Auth.upper(), Some(ProtocolId::Ipcp));
        assert_eq!(ProtocolId::Ipcp.lower(), Some(ProtocolId::Auth));
        assert_eq!(ProtocolId::Ipcp.upper(), Some(ProtocolId::Ipv4));
        assert_eq!(ProtocolId::Ipv4.upper(), None);
    }

    #[test]
    fn test_protocol_numbers() {
        for id in ProtocolId::ALL {
            if let Some(number) = id.number() {
                assert_eq!(ProtocolId::from_number(number), Some(id));
            }
        }
        assert_eq!(ProtocolId::from_number(0x8057), None);
    }

    #[test]
    fn test_context_send_frames() {
        let mut cx = Context::new(Arc::new(LinkStats::new()));
        cx.send(protocols::LCP, &[0x09, 0x01, 0x00, 0x08, 0, 0, 0, 0]);
        let actions = cx.take_actions();
        assert_eq!(
            actions,
            vec![LinkAction::Send(vec![
                0xff, 0x03, 0xc0, 0x21, 0x09, 0x01, 0x00, 0x08, 0, 0, 0, 0
            ])]
        );
        assert_eq!(cx.stats().tx_frames.get(), 1);
        assert!(cx.take_actions().is_empty());
    }
}
