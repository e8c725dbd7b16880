//! PAP protocol - RFC 1334
//!
//! Password Authentication Protocol. PAP reuses the control packet header
//! but carries length-prefixed strings instead of options.

use super::control::{ControlBuilder, ControlPacket};
use crate::{Error, Result};

/// PAP packet codes
pub mod codes {
    /// Authenticate-Request
    pub const AUTHENTICATE_REQUEST: u8 = 1;
    /// Authenticate-Ack (success)
    pub const AUTHENTICATE_ACK: u8 = 2;
    /// Authenticate-Nak (failure)
    pub const AUTHENTICATE_NAK: u8 = 3;
}

/// Longest Peer-ID or Password that fits the one-byte length prefix
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Parsed PAP packet
#[derive(Debug)]
pub struct PapPacket<'a> {
    inner: ControlPacket<'a>,
}

impl<'a> PapPacket<'a> {
    /// Parse PAP packet from buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let inner = ControlPacket::parse(buffer)?;
        Ok(Self { inner })
    }

    /// Code field
    pub fn code(&self) -> u8 {
        self.inner.code()
    }

    /// Identifier field
    pub fn identifier(&self) -> u8 {
        self.inner.identifier()
    }

    /// Peer-ID and Password of an Authenticate-Request
    #[cfg(test)]
    pub fn credentials(&self) -> Option<(&'a [u8], &'a [u8])> {
        if self.code() != codes::AUTHENTICATE_REQUEST {
            return None;
        }
        let data = self.inner.data();
        let (peer_id, rest) = split_prefixed(data)?;
        let (password, _) = split_prefixed(rest)?;
        Some((peer_id, password))
    }

    /// Message of an Authenticate-Ack/Nak; a missing or short message reads as empty
    pub fn message(&self) -> Option<&'a [u8]> {
        if !self.is_success() && !self.is_failure() {
            return None;
        }
        Some(split_prefixed(self.inner.data()).map_or(&[][..], |(msg, _)| msg))
    }

    /// Check if this is an authentication success
    pub fn is_success(&self) -> bool {
        self.code() == codes::AUTHENTICATE_ACK
    }

    /// Check if this is an authentication failure
    pub fn is_failure(&self) -> bool {
        self.code() == codes::AUTHENTICATE_NAK
    }
}

fn split_prefixed(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = data.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

/// Build an Authenticate-Request
pub fn authenticate_request(identifier: u8, peer_id: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    if peer_id.len() > MAX_FIELD_LEN || password.len() > MAX_FIELD_LEN {
        return Err(Error::InvalidPacket(
            "PAP peer-id or password longer than 255 bytes".into(),
        ));
    }

    let mut data = Vec::with_capacity(2 + peer_id.len() + password.len());
    data.push(peer_id.len() as u8);
    data.extend_from_slice(peer_id);
    data.push(password.len() as u8);
    data.extend_from_slice(password);

    Ok(ControlBuilder::new(codes::AUTHENTICATE_REQUEST, identifier)
        .raw_data(&data)
        .build())
}

/// Build an Authenticate-Ack or Authenticate-Nak (authenticator side)
#[cfg(test)]
pub fn authenticate_reply(success: bool, identifier: u8, message: &str) -> Vec<u8> {
    let code = if success {
        codes::AUTHENTICATE_ACK
    } else {
        codes::AUTHENTICATE_NAK
    };
    let msg = &message.as_bytes()[..message.len().min(MAX_FIELD_LEN)];
    let mut data = Vec::with_capacity(1 + msg.len());
    data.push(msg.len() as u8);
    data.extend_from_slice(msg);
    ControlBuilder::new(code, identifier).raw_data(&data).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authenticate_request() {
        // PAP Authenticate-Request: user="test", password="pass"
        let data = [
            0x01, // Code: Authenticate-Request
            0x01, // Identifier
            0x00, 0x0e, // Length=14
            0x04, // Peer-ID length=4
            b't', b'e', b's', b't', // Peer-ID
            0x04, // Password length=4
            b'p', b'a', b's', b's', // Password
        ];

        let packet = PapPacket::parse(&data).unwrap();
        assert_eq!(packet.code(), codes::AUTHENTICATE_REQUEST);
        assert_eq!(packet.identifier(), 1);
        assert_eq!(
            packet.credentials(),
            Some((b"test".as_slice(), b"pass".as_slice()))
        );
    }

    #[test]
    fn test_build_authenticate_request_bytes() {
        let packet = authenticate_request(7, b"ab", b"").unwrap();
        assert_eq!(packet, vec![0x01, 0x07, 0x00, 0x08, 0x02, b'a', b'b', 0x00]);
    }

    #[test]
    fn test_request_field_too_long() {
        let long = vec![b'x'; 256];
        assert!(authenticate_request(1, &long, b"pw").is_err());
    }

    #[test]
    fn test_parse_authenticate_nak() {
        let data = [0x03, 0x01, 0x00, 0x09, 0x04, b'F', b'A', b'I', b'L'];

        let packet = PapPacket::parse(&data).unwrap();
        assert!(!packet.is_success());
        assert!(packet.is_failure());
        assert_eq!(packet.message(), Some(b"FAIL".as_slice()));
    }

    #[test]
    fn test_ack_without_message() {
        let data = [0x02, 0x01, 0x00, 0x04];
        let packet = PapPacket::parse(&data).unwrap();
        assert!(packet.is_success());
        assert_eq!(packet.message(), Some(b"".as_slice()));
    }

    #[test]
    fn test_reply_roundtrip() {
        let packet = authenticate_reply(true, 9, "Welcome");
        let parsed = PapPacket::parse(&packet).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.identifier(), 9);
        assert_eq!(parsed.message(), Some(b"Welcome".as_slice()));
    }

    #[test]
    fn test_credentials_wrong_code() {
        let data = [0x02, 0x01, 0x00, 0x05, 0x00];
        let packet = PapPacket::parse(&data).unwrap();
        assert_eq!(packet.credentials(), None);
    }

    #[test]
    fn test_credentials_truncated() {
        // Password length claims 4 bytes, only 1 present
        let data = [0x01, 0x01, 0x00, 0x09, 0x02, b'u', b'1', 0x04, b'p'];
        let packet = PapPacket::parse(&data).unwrap();
        assert_eq!(packet.credentials(), None);
    }
}
