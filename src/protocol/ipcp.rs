//! IPCP protocol - RFC 1332
//!
//! Internet Protocol Control Protocol constants. IPCP uses the LCP packet
//! format with codes 1 through 7 only.

use std::net::Ipv4Addr;

/// IPCP option types
pub mod options {
    /// IP-Addresses (deprecated, RFC 1172)
    pub const IP_ADDRESSES: u8 = 1;
    /// IP-Compression-Protocol
    pub const IP_COMPRESSION: u8 = 2;
    /// IP-Address
    pub const IP_ADDRESS: u8 = 3;
}

/// Decode a 4-byte option value as an IPv4 address
pub fn option_addr(data: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = data.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_addr() {
        assert_eq!(
            option_addr(&[0xc0, 0xa8, 0x01, 0x64]),
            Some(Ipv4Addr::new(192, 168, 1, 100))
        );
        assert_eq!(option_addr(&[0xc0, 0xa8, 0x01]), None);
        assert_eq!(option_addr(&[0; 5]), None);
    }
}
