//! LCP protocol - RFC 1661
//!
//! Link Control Protocol constants and the LCP-only packets (Echo,
//! Discard, Protocol-Reject). The shared header/option codec lives in
//! [`super::control`].

use super::control::{codes, ControlBuilder, ControlPacket};

/// Default Maximum-Receive-Unit
pub const DEFAULT_MRU: u16 = 1500;

/// Largest MRU we accept from a peer
pub const MAX_MRU: u16 = 2000;

/// Default Async-Control-Character-Map (escape everything)
pub const DEFAULT_ACCM: u32 = 0xffff_ffff;

/// LCP option types
pub mod options {
    /// Maximum-Receive-Unit
    pub const MRU: u8 = 1;
    /// Async-Control-Character-Map
    pub const ACCM: u8 = 2;
    /// Authentication-Protocol
    pub const AUTH_PROTOCOL: u8 = 3;
    /// Quality-Protocol
    pub const QUALITY_PROTOCOL: u8 = 4;
    /// Magic-Number
    pub const MAGIC_NUMBER: u8 = 5;
    /// Protocol-Field-Compression
    pub const PFC: u8 = 7;
    /// Address-and-Control-Field-Compression
    pub const ACFC: u8 = 8;
}

/// Authentication protocol values for LCP option 3
pub mod auth {
    /// Password Authentication Protocol
    pub const PAP: u16 = 0xc023;
}

/// Build an Echo-Request carrying our magic number and optional data
pub fn echo_request(identifier: u8, magic: u32, data: &[u8]) -> Vec<u8> {
    echo(codes::ECHO_REQUEST, identifier, magic, data)
}

/// Build an Echo-Reply carrying our magic number and the echoed data
pub fn echo_reply(identifier: u8, magic: u32, data: &[u8]) -> Vec<u8> {
    echo(codes::ECHO_REPLY, identifier, magic, data)
}

fn echo(code: u8, identifier: u8, magic: u32, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + data.len());
    body.extend_from_slice(&magic.to_be_bytes());
    body.extend_from_slice(data);
    ControlBuilder::new(code, identifier).raw_data(&body).build()
}

/// Build a Protocol-Reject for `protocol`, quoting the rejected information field
pub fn protocol_reject(identifier: u8, protocol: u16, info: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + info.len());
    body.extend_from_slice(&protocol.to_be_bytes());
    body.extend_from_slice(info);
    ControlBuilder::new(codes::PROTOCOL_REJECT, identifier)
        .raw_data(&body)
        .build()
}

/// Rejected protocol number of a Protocol-Reject
pub fn rejected_protocol(packet: &ControlPacket) -> Option<u16> {
    let data = packet.data();
    if packet.code() != codes::PROTOCOL_REJECT || data.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([data[0], data[1]]))
}

/// Magic number and trailing data of an Echo-Request/Reply or Discard-Request
pub fn echo_parts<'a>(packet: &ControlPacket<'a>) -> Option<(u32, &'a [u8])> {
    let data = packet.data();
    if data.len() < 4 {
        return None;
    }
    let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    Some((magic, &data[4..]))
}
