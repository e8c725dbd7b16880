//! One PPP link: dispatcher plus the layer stack

use super::dcp::LinkMonitor;
use super::fsm::{Automaton, State};
use super::ipcp::Ipcp;
use super::lcp::Lcp;
use super::pap::PapClient;
use super::tunnel::Tunnel;
use super::{Context, LayerEvent, LayerStatus, LinkAction, LinkConfig, ProtocolId};
use crate::protocol::control::CONTROL_HEADER_SIZE;
use crate::protocol::lcp as lcp_packet;
use crate::protocol::ppp::{protocols, PppFrame};
use crate::telemetry::LinkStats;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

/// A single PPP link and all protocol instances running on it
#[derive(Debug)]
pub struct PppLink {
    lcp: Automaton<Lcp>,
    ipcp: Automaton<Ipcp>,
    auth: PapClient,
    monitor: LinkMonitor,
    tunnel: Option<Tunnel>,
    network_up: bool,
    cx: Context,
    stats: Arc<LinkStats>,
}

impl PppLink {
    pub fn new(config: LinkConfig) -> Self {
        Self::with_stats(config, Arc::new(LinkStats::new()))
    }

    pub fn with_stats(config: LinkConfig, stats: Arc<LinkStats>) -> Self {
        let fsm = config.fsm();
        Self {
            lcp: Automaton::new(Lcp, fsm),
            ipcp: Automaton::new(Ipcp, fsm),
            auth: PapClient::new(
                config.username,
                config.password,
                config.restart,
                config.pap_retries,
            ),
            monitor: LinkMonitor::new(config.echo_interval, config.echo_failures),
            tunnel: config.tunnel.map(Tunnel::new),
            network_up: false,
            cx: Context::new(stats.clone()),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.stats
    }

    pub fn lcp(&self) -> &Automaton<Lcp> {
        &self.lcp
    }

    pub fn ipcp(&self) -> &Automaton<Ipcp> {
        &self.ipcp
    }

    pub fn is_network_up(&self) -> bool {
        self.network_up
    }

    /// Whether `id` is down, negotiating, or up
    pub fn layer_status(&self, id: ProtocolId) -> LayerStatus {
        fn automaton_status(state: State) -> LayerStatus {
            match state {
                State::Initial | State::Starting => LayerStatus::Down,
                State::Opened => LayerStatus::Up,
                _ => LayerStatus::Starting,
            }
        }

        match id {
            ProtocolId::Dcp if self.monitor.carrier() => LayerStatus::Up,
            ProtocolId::Dcp => LayerStatus::Down,
            ProtocolId::Lcp => automaton_status(self.lcp.state()),
            ProtocolId::Auth => self.auth.status(),
            ProtocolId::Ipcp => automaton_status(self.ipcp.state()),
            ProtocolId::Ipv4 if self.network_up => LayerStatus::Up,
            ProtocolId::Ipv4 => LayerStatus::Down,
        }
    }

    /// Administratively open LCP and IPCP
    pub fn open(&mut self, now: Instant) -> Vec<LinkAction> {
        info!("link: open");
        self.cx.now = now;
        self.cx.notify(ProtocolId::Lcp, LayerEvent::Open);
        self.cx.notify(ProtocolId::Ipcp, LayerEvent::Open);
        self.run()
    }

    /// Administratively close the link
    pub fn close(&mut self, now: Instant) -> Vec<LinkAction> {
        info!("link: close");
        self.cx.now = now;
        self.cx.notify(ProtocolId::Lcp, LayerEvent::Close);
        self.run()
    }

    pub fn carrier_up(&mut self, now: Instant) -> Vec<LinkAction> {
        self.cx.now = now;
        self.cx.notify(ProtocolId::Dcp, LayerEvent::LinkUp);
        self.run()
    }

    pub fn carrier_down(&mut self, now: Instant) -> Vec<LinkAction> {
        self.cx.now = now;
        self.cx.notify(ProtocolId::Dcp, LayerEvent::LinkDown);
        self.run()
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cx.timers.next_deadline()
    }

    /// Fire every timer due at `now`
    pub fn handle_timeouts(&mut self, now: Instant) -> Vec<LinkAction> {
        self.cx.now = now;
        for id in self.cx.timers.take_expired(now) {
            trace!("link: {:?} timer expired", id);
            self.cx.notify(id, LayerEvent::Timeout);
        }
        self.run()
    }

    /// Process one received frame
    pub fn process_frame(&mut self, frame: &[u8], now: Instant) -> Vec<LinkAction> {
        self.cx.now = now;
        self.stats.record_rx(frame.len());

        let ppp = match PppFrame::parse(frame) {
            Ok(ppp) => ppp,
            Err(e) => {
                debug!("link: dropping frame: {}", e);
                self.stats.record_rx_drop();
                return Vec::new();
            }
        };

        let payload = ppp.payload();
        let mru = self.lcp.negotiated().local_mru as usize;
        if payload.len() > mru {
            debug!("link: dropping {} byte frame above MRU {}", payload.len(), mru);
            self.stats.record_rx_drop();
            return Vec::new();
        }

        match ProtocolId::from_number(ppp.protocol()) {
            Some(id) if self.accepts(id) => self.dispatch(id, payload),
            Some(id) => {
                debug!(
                    "link: {:?} not accepting traffic ({:?})",
                    id,
                    self.layer_status(id)
                );
                self.stats.record_rx_drop();
            }
            None => self.reject_protocol(ppp.protocol(), payload),
        }

        self.run()
    }

    /// Queue an outbound IPv4 datagram
    pub fn send_ip(&mut self, datagram: &[u8], now: Instant) -> Result<Vec<LinkAction>> {
        if !self.network_up {
            return Err(Error::NetworkDown);
        }
        self.cx.now = now;

        let local_ip = self.ipcp.negotiated().local_ip;
        let payload = match self.tunnel.as_mut() {
            Some(tunnel) => tunnel.encapsulate(local_ip, datagram),
            None => datagram.to_vec(),
        };

        let peer_mru = self.lcp.negotiated().peer_mru as usize;
        if payload.len() > peer_mru {
            return Err(Error::InvalidPacket(format!(
                "{} byte datagram exceeds peer MRU {}",
                payload.len(),
                peer_mru
            )));
        }

        self.stats.ip_tx_packets.inc();
        self.cx.send(protocols::IP, &payload);
        Ok(self.run())
    }

    fn accepts(&self, id: ProtocolId) -> bool {
        let status = self.layer_status(id);
        match id {
            ProtocolId::Lcp | ProtocolId::Ipcp => status != LayerStatus::Down,
            ProtocolId::Auth => status == LayerStatus::Starting,
            ProtocolId::Ipv4 => status == LayerStatus::Up,
            ProtocolId::Dcp => false,
        }
    }

    fn dispatch(&mut self, id: ProtocolId, payload: &[u8]) {
        match id {
            ProtocolId::Lcp => self.lcp.receive(payload, &mut self.cx),
            ProtocolId::Ipcp => self.ipcp.receive(payload, &mut self.cx),
            ProtocolId::Auth => self.auth.receive(payload, &mut self.cx),
            ProtocolId::Ipv4 => self.deliver(payload),
            ProtocolId::Dcp => {}
        }
    }

    fn deliver(&mut self, packet: &[u8]) {
        let inner = self
            .tunnel
            .as_ref()
            .and_then(|tunnel| tunnel.decapsulate(packet))
            .unwrap_or(packet);
        self.stats.ip_rx_packets.inc();
        self.cx.push_action(LinkAction::Deliver(inner.to_vec()));
    }

    fn reject_protocol(&mut self, protocol: u16, payload: &[u8]) {
        self.stats.record_rx_drop();
        if self.lcp.state() != State::Opened {
            debug!("link: dropping unknown protocol 0x{:04x}", protocol);
            return;
        }

        // Protocol-Reject header plus the rejected protocol number must fit the peer's MRU
        let room = (self.lcp.negotiated().peer_mru as usize).saturating_sub(CONTROL_HEADER_SIZE + 2);
        let info = &payload[..payload.len().min(room)];
        let id = self.lcp.next_reject_id();
        debug!("link: sending Protocol-Reject id={} for 0x{:04x}", id, protocol);
        self.stats.protocol_rejects.inc();
        self.cx
            .send(protocols::LCP, &lcp_packet::protocol_reject(id, protocol, info));
    }

    fn handle_network(&mut self, event: LayerEvent) {
        match event {
            LayerEvent::LinkUp => {
                let negotiated = self.ipcp.negotiated();
                info!(
                    "link: network up, {} <-> {}",
                    negotiated.local_ip, negotiated.peer_ip
                );
                self.network_up = true;
                self.cx.push_action(LinkAction::NetworkUp {
                    local: negotiated.local_ip,
                    peer: negotiated.peer_ip,
                });
            }
            LayerEvent::LinkDown if self.network_up => {
                info!("link: network down");
                self.network_up = false;
                self.cx.push_action(LinkAction::NetworkDown);
            }
            other => trace!("IPV4: ignoring {:?}", other),
        }
    }

    /// Drain the message queue, then hand back the accumulated actions
    fn run(&mut self) -> Vec<LinkAction> {
        while let Some((target, event)) = self.cx.next_message() {
            trace!("link: {:?} <- {:?}", target, event);
            match target {
                ProtocolId::Dcp => self.monitor.handle(event, &mut self.cx),
                ProtocolId::Lcp => self.lcp.handle(event, &mut self.cx),
                ProtocolId::Auth => {
                    let required = self.lcp.negotiated().auth_required;
                    self.auth.handle(event, required, &mut self.cx)
                }
                ProtocolId::Ipcp => self.ipcp.handle(event, &mut self.cx),
                ProtocolId::Ipv4 => self.handle_network(event),
            }
        }
        self.cx.take_actions()
    }
}
