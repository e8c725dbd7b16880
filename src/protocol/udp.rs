//! UDP protocol - RFC 768
//!
//! Datagram parsing and building with the IPv4 pseudo-header checksum, used
//! by the tunnel adapter.

use super::ipv4::{fold, sum_words};
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// UDP header size (fixed)
pub const HEADER_SIZE: usize = 8;

/// UDP protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 17;

/// Parsed UDP datagram (zero-copy reference)
#[derive(Debug)]
pub struct UdpHeader<'a> {
    buffer: &'a [u8],
}

impl<'a> UdpHeader<'a> {
    /// Parse a datagram; the length field must fit the buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("UDP header too short".into()));
        }

        let header = Self { buffer };
        let length = header.length() as usize;
        if length < HEADER_SIZE || length > buffer.len() {
            return Err(Error::Parse("UDP length out of range".into()));
        }

        Ok(header)
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Length (header + data)
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// Checksum; 0 means not computed
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_SIZE..self.length() as usize]
    }

    /// Validate checksum with pseudo-header.
    /// A zero checksum (not computed) is accepted.
    pub fn validate_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> bool {
        if self.checksum() == 0 {
            return true;
        }
        udp_checksum(src_ip, dst_ip, &self.buffer[..self.length() as usize]) == 0
    }
}

/// Builder for UDP datagrams
#[derive(Debug, Default)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the datagram with its checksum computed over the pseudo-header
    pub fn build(self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
        let length = (HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = Vec::with_capacity(length as usize);

        buffer.extend_from_slice(&self.src_port.to_be_bytes());
        buffer.extend_from_slice(&self.dst_port.to_be_bytes());
        buffer.extend_from_slice(&length.to_be_bytes());
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.payload);

        let sum = udp_checksum(src_ip, dst_ip, &buffer);
        // 0 is reserved for "no checksum"
        let sum = if sum == 0 { 0xFFFF } else { sum };
        buffer[6..8].copy_from_slice(&sum.to_be_bytes());

        buffer
    }
}

/// UDP checksum over the IPv4 pseudo-header and the datagram
pub fn udp_checksum(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, udp_datagram: &[u8]) -> u16 {
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(&src_ip.octets());
    pseudo[4..8].copy_from_slice(&dst_ip.octets());
    pseudo[9] = PROTOCOL_NUMBER;
    pseudo[10..12].copy_from_slice(&(udp_datagram.len() as u16).to_be_bytes());

    let sum = sum_words(&pseudo, 0);
    !fold(sum_words(udp_datagram, sum))
}
