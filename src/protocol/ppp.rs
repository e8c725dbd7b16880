//! PPP protocol - RFC 1661 / RFC 1662
//!
//! PPP frame parsing and building with HDLC-like address and control fields.
//! Byte stuffing and the frame check sequence belong to the transport below.

use crate::{Error, Result};

/// HDLC all-stations address
pub const HDLC_ADDRESS: u8 = 0xff;

/// HDLC unnumbered information control field
pub const HDLC_CONTROL: u8 = 0x03;

/// PPP header size (address + control + protocol)
pub const PPP_HEADER_SIZE: usize = 4;

/// PPP protocol numbers
pub mod protocols {
    /// Internet Protocol version 4
    pub const IP: u16 = 0x0021;
    /// Internet Protocol Control Protocol
    pub const IPCP: u16 = 0x8021;
    /// Link Control Protocol
    pub const LCP: u16 = 0xc021;
    /// Password Authentication Protocol
    pub const PAP: u16 = 0xc023;
}

/// Parsed PPP frame (zero-copy reference)
#[derive(Debug)]
pub struct PppFrame<'a> {
    buffer: &'a [u8],
}

impl<'a> PppFrame<'a> {
    /// Parse PPP frame from buffer, including the HDLC address and control bytes
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < PPP_HEADER_SIZE {
            return Err(Error::Parse("PPP frame too short".into()));
        }
        if buffer[0] != HDLC_ADDRESS || buffer[1] != HDLC_CONTROL {
            return Err(Error::Parse(format!(
                "bad HDLC header {:02x} {:02x}",
                buffer[0], buffer[1]
            )));
        }
        Ok(Self { buffer })
    }

    /// Protocol field
    pub fn protocol(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Information field (protocol-specific data)
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[PPP_HEADER_SIZE..]
    }
}

/// Builder for PPP frames
#[derive(Debug, Default)]
pub struct PppBuilder {
    protocol: u16,
    payload: Vec<u8>,
}

impl PppBuilder {
    /// Create a new PPP frame builder
    pub fn new(protocol: u16) -> Self {
        Self {
            protocol,
            payload: Vec::new(),
        }
    }

    /// Create builder for LCP
    pub fn lcp() -> Self {
        Self::new(protocols::LCP)
    }

    /// Create builder for PAP
    pub fn pap() -> Self {
        Self::new(protocols::PAP)
    }

    /// Create builder for IPCP
    pub fn ipcp() -> Self {
        Self::new(protocols::IPCP)
    }

    /// Create builder for IPv4 data
    pub fn ip() -> Self {
        Self::new(protocols::IP)
    }

    /// Set the payload
    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the PPP frame
    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(PPP_HEADER_SIZE + self.payload.len());
        frame.push(HDLC_ADDRESS);
        frame.push(HDLC_CONTROL);
        frame.extend_from_slice(&self.protocol.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}
