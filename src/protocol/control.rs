//! Control packet codec - RFC 1661 section 5
//!
//! The code/identifier/length header and Type-Length-Value option list shared
//! by LCP, IPCP and (header only) PAP.

use crate::{Error, Result};

/// Control packet header size (code + identifier + length)
pub const CONTROL_HEADER_SIZE: usize = 4;

/// Option header size (type + length)
pub const OPTION_HEADER_SIZE: usize = 2;

/// Control packet codes
pub mod codes {
    /// Configure-Request
    pub const CONFIGURE_REQUEST: u8 = 1;
    /// Configure-Ack
    pub const CONFIGURE_ACK: u8 = 2;
    /// Configure-Nak
    pub const CONFIGURE_NAK: u8 = 3;
    /// Configure-Reject
    pub const CONFIGURE_REJECT: u8 = 4;
    /// Terminate-Request
    pub const TERMINATE_REQUEST: u8 = 5;
    /// Terminate-Ack
    pub const TERMINATE_ACK: u8 = 6;
    /// Code-Reject
    pub const CODE_REJECT: u8 = 7;
    /// Protocol-Reject (LCP only)
    pub const PROTOCOL_REJECT: u8 = 8;
    /// Echo-Request (LCP only)
    pub const ECHO_REQUEST: u8 = 9;
    /// Echo-Reply (LCP only)
    pub const ECHO_REPLY: u8 = 10;
    /// Discard-Request (LCP only)
    pub const DISCARD_REQUEST: u8 = 11;

    /// Human readable code name for logs
    pub fn name(code: u8) -> &'static str {
        match code {
            CONFIGURE_REQUEST => "Configure-Request",
            CONFIGURE_ACK => "Configure-Ack",
            CONFIGURE_NAK => "Configure-Nak",
            CONFIGURE_REJECT => "Configure-Reject",
            TERMINATE_REQUEST => "Terminate-Request",
            TERMINATE_ACK => "Terminate-Ack",
            CODE_REJECT => "Code-Reject",
            PROTOCOL_REJECT => "Protocol-Reject",
            ECHO_REQUEST => "Echo-Request",
            ECHO_REPLY => "Echo-Reply",
            DISCARD_REQUEST => "Discard-Request",
            _ => "Unknown",
        }
    }
}

/// Parsed control packet (zero-copy reference)
#[derive(Debug, Clone, Copy)]
pub struct ControlPacket<'a> {
    buffer: &'a [u8],
}

impl<'a> ControlPacket<'a> {
    /// Parse a control packet from buffer.
    ///
    /// The length field must cover the buffer exactly; a packet with
    /// trailing bytes is as malformed as a truncated one.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < CONTROL_HEADER_SIZE {
            return Err(Error::Parse("control packet too short".into()));
        }

        let packet = Self { buffer };

        let length = packet.length() as usize;
        if length < CONTROL_HEADER_SIZE {
            return Err(Error::Parse("control packet length too small".into()));
        }
        if buffer.len() < length {
            return Err(Error::Parse("control packet truncated".into()));
        }
        if buffer.len() > length {
            return Err(Error::Parse(format!(
                "{} trailing bytes after control packet",
                buffer.len() - length
            )));
        }

        Ok(packet)
    }

    /// Code field
    pub fn code(&self) -> u8 {
        self.buffer[0]
    }

    /// Identifier field (for matching requests and responses)
    pub fn identifier(&self) -> u8 {
        self.buffer[1]
    }

    /// Length field (total packet length including header)
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Data (options for Configure-*, or payload for the other codes)
    pub fn data(&self) -> &'a [u8] {
        &self.buffer[CONTROL_HEADER_SIZE..]
    }

    /// Collect all options, failing if the option list is malformed
    pub fn options(&self) -> Result<Vec<ControlOption<'a>>> {
        parse_options(self.data())
    }

    /// Get the raw packet
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buffer
    }
}

/// A configuration option during iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOption<'a> {
    /// Option type
    pub opt_type: u8,
    /// Option data (excluding type and length bytes)
    pub data: &'a [u8],
}

impl ControlOption<'_> {
    /// Wire length of the option including its header
    pub fn wire_len(&self) -> usize {
        OPTION_HEADER_SIZE + self.data.len()
    }

    /// Append the option in TLV form
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.opt_type);
        out.push(self.wire_len() as u8);
        out.extend_from_slice(self.data);
    }
}

/// Parse a complete TLV option list
pub fn parse_options(data: &[u8]) -> Result<Vec<ControlOption<'_>>> {
    let mut iter = OptionIterator { data, offset: 0 };
    let options: Vec<_> = iter.by_ref().collect();
    if iter.offset != data.len() {
        return Err(Error::Parse(format!(
            "malformed option at offset {}",
            iter.offset
        )));
    }
    Ok(options)
}

/// Iterator over TLV options
pub struct OptionIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for OptionIterator<'a> {
    type Item = ControlOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // Need at least 2 bytes for option header (type + length)
        if self.offset + OPTION_HEADER_SIZE > self.data.len() {
            return None;
        }

        let opt_type = self.data[self.offset];
        let opt_len = self.data[self.offset + 1] as usize;

        // Option length includes type and length bytes
        if opt_len < OPTION_HEADER_SIZE || self.offset + opt_len > self.data.len() {
            return None;
        }

        let data_start = self.offset + OPTION_HEADER_SIZE;
        let data_end = self.offset + opt_len;

        let opt = ControlOption {
            opt_type,
            data: &self.data[data_start..data_end],
        };

        self.offset = data_end;
        Some(opt)
    }
}

/// Builder for control packets
#[derive(Debug, Default)]
pub struct ControlBuilder {
    code: u8,
    identifier: u8,
    data: Vec<u8>,
}

impl ControlBuilder {
    /// Create a new control packet builder
    pub fn new(code: u8, identifier: u8) -> Self {
        Self {
            code,
            identifier,
            data: Vec::new(),
        }
    }

    /// Create Configure-Request builder
    pub fn configure_request(identifier: u8) -> Self {
        Self::new(codes::CONFIGURE_REQUEST, identifier)
    }

    /// Create Configure-Ack builder
    pub fn configure_ack(identifier: u8) -> Self {
        Self::new(codes::CONFIGURE_ACK, identifier)
    }

    /// Create Configure-Nak builder
    pub fn configure_nak(identifier: u8) -> Self {
        Self::new(codes::CONFIGURE_NAK, identifier)
    }

    /// Create Configure-Reject builder
    pub fn configure_reject(identifier: u8) -> Self {
        Self::new(codes::CONFIGURE_REJECT, identifier)
    }

    /// Create Terminate-Request builder
    pub fn terminate_request(identifier: u8) -> Self {
        Self::new(codes::TERMINATE_REQUEST, identifier)
    }

    /// Create Terminate-Ack builder
    pub fn terminate_ack(identifier: u8) -> Self {
        Self::new(codes::TERMINATE_ACK, identifier)
    }

    /// Create Code-Reject builder
    pub fn code_reject(identifier: u8) -> Self {
        Self::new(codes::CODE_REJECT, identifier)
    }

    /// Add a raw option
    pub fn add_option(mut self, opt_type: u8, data: &[u8]) -> Self {
        let opt_len = (OPTION_HEADER_SIZE + data.len()) as u8;
        self.data.push(opt_type);
        self.data.push(opt_len);
        self.data.extend_from_slice(data);
        self
    }

    /// Set raw data (for echoing options or wrapping rejected packets)
    pub fn raw_data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    /// Build the control packet; the length field is always recomputed
    pub fn build(self) -> Vec<u8> {
        let length = (CONTROL_HEADER_SIZE + self.data.len()) as u16;
        let mut packet = Vec::with_capacity(length as usize);

        packet.push(self.code);
        packet.push(self.identifier);
        packet.extend_from_slice(&length.to_be_bytes());
        packet.extend_from_slice(&self.data);

        packet
    }
}
