//! UDP/IPv4 tunnel
//!
//! Some carriers only pass UDP towards a fixed gateway. When configured, user
//! datagrams are wrapped in UDP/IPv4 addressed to the gateway before PPP
//! framing, and matching inbound datagrams are unwrapped.

use crate::protocol::ipv4::{Ipv4Builder, Ipv4Header};
use crate::protocol::udp::{self, UdpBuilder, UdpHeader};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::debug;

/// Tunnel endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TunnelConfig {
    /// Gateway address and port
    pub remote: SocketAddrV4,
    /// Our UDP source port
    pub local_port: u16,
}

#[derive(Debug)]
pub struct Tunnel {
    config: TunnelConfig,
    identification: u16,
}

impl Tunnel {
    pub fn new(config: TunnelConfig) -> Self {
        Self {
            config,
            identification: 0,
        }
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.config.remote
    }

    /// Wrap `datagram` for the gateway, sourced from our negotiated address
    pub fn encapsulate(&mut self, local_ip: Ipv4Addr, datagram: &[u8]) -> Vec<u8> {
        let remote = self.config.remote;
        let udp = UdpBuilder::new()
            .src_port(self.config.local_port)
            .dst_port(remote.port())
            .payload(datagram)
            .build(local_ip, *remote.ip());

        self.identification = self.identification.wrapping_add(1);
        Ipv4Builder::new()
            .identification(self.identification)
            .protocol(udp::PROTOCOL_NUMBER)
            .src_addr(local_ip)
            .dst_addr(*remote.ip())
            .payload(&udp)
            .build()
    }

    /// Inner datagram of a packet from the gateway; `None` if the packet is
    /// not tunnel traffic
    pub fn decapsulate<'a>(&self, packet: &'a [u8]) -> Option<&'a [u8]> {
        let ip = Ipv4Header::parse(packet).ok()?;
        if ip.protocol() != udp::PROTOCOL_NUMBER || ip.src_addr() != *self.config.remote.ip() {
            return None;
        }

        let udp = UdpHeader::parse(ip.payload()).ok()?;
        if udp.src_port() != self.config.remote.port() || udp.dst_port() != self.config.local_port
        {
            return None;
        }
        if !udp.validate_checksum(ip.src_addr(), ip.dst_addr()) {
            debug!("tunnel: bad UDP checksum from {}", self.config.remote);
            return None;
        }
        Some(udp.payload())
    }
}
