//! Configuration option registry
//!
//! Each negotiated option is a [`ConfOption`] descriptor whose behaviour
//! (validate, build_nak, apply) is selected by its [`OptionKind`]. The
//! automaton only ever talks to options through these three operations and
//! [`OptionSet::get_conf_by_code`].

use crate::protocol::control::ControlOption;
use crate::protocol::{ipcp, lcp};
use bitflags::bitflags;
use std::net::Ipv4Addr;

bitflags! {
    /// Descriptor flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OptionFlags: u8 {
        /// We include the option in our Configure-Request
        const ENABLED = 0x01;
        /// A peer Configure-Request lacking the option is unacceptable
        const REQUIRED = 0x02;
    }
}

/// Per-variant option behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// LCP Maximum-Receive-Unit
    Mru,
    /// LCP Async-Control-Character-Map
    Accm,
    /// LCP Authentication-Protocol
    AuthProtocol,
    /// IPCP IP-Address
    IpAddress,
}

/// Values committed by [`ConfOption::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// MRU we advertised and the peer acked
    pub local_mru: u16,
    /// MRU the peer advertised (upper bound for what we send)
    pub peer_mru: u16,
    /// ACCM the peer expects us to honour when receiving
    pub rx_accm: u32,
    /// ACCM the peer asked us to use when sending
    pub tx_accm: u32,
    /// Authentication protocol the peer demands from us
    pub auth_required: Option<u16>,
    /// Our IPv4 address as acked by the peer
    pub local_ip: Ipv4Addr,
    /// Peer IPv4 address from its Configure-Request
    pub peer_ip: Ipv4Addr,
}

impl Default for Negotiated {
    fn default() -> Self {
        Self {
            local_mru: lcp::DEFAULT_MRU,
            peer_mru: lcp::DEFAULT_MRU,
            rx_accm: lcp::DEFAULT_ACCM,
            tx_accm: lcp::DEFAULT_ACCM,
            auth_required: None,
            local_ip: Ipv4Addr::UNSPECIFIED,
            peer_ip: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl Negotiated {
    /// Forget what the peer requested
    pub fn reset_peer(&mut self) {
        let defaults = Self::default();
        self.peer_mru = defaults.peer_mru;
        self.tx_accm = defaults.tx_accm;
        self.auth_required = defaults.auth_required;
        self.peer_ip = defaults.peer_ip;
    }

    /// Forget what the peer acked from us
    pub fn reset_local(&mut self) {
        let defaults = Self::default();
        self.local_mru = defaults.local_mru;
        self.rx_accm = defaults.rx_accm;
        self.local_ip = defaults.local_ip;
    }
}

/// Configuration option descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfOption {
    pub kind: OptionKind,
    pub type_code: u8,
    /// Current value, encoded big-endian in `size` bytes on the wire
    pub value: u32,
    pub default: u32,
    pub size: usize,
    pub flags: OptionFlags,
    default_flags: OptionFlags,
}

impl ConfOption {
    pub fn new(kind: OptionKind, default: u32, flags: OptionFlags) -> Self {
        let (type_code, size) = match kind {
            OptionKind::Mru => (lcp::options::MRU, 2),
            OptionKind::Accm => (lcp::options::ACCM, 4),
            OptionKind::AuthProtocol => (lcp::options::AUTH_PROTOCOL, 2),
            OptionKind::IpAddress => (ipcp::options::IP_ADDRESS, 4),
        };
        Self {
            kind,
            type_code,
            value: default,
            default,
            size,
            flags,
            default_flags: flags,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(OptionFlags::ENABLED)
    }

    pub fn is_required(&self) -> bool {
        self.flags.contains(OptionFlags::REQUIRED)
    }

    /// Restore value and flags to the registry defaults
    pub fn reset(&mut self) {
        self.value = self.default;
        self.flags = self.default_flags;
    }

    /// Current value in wire form
    pub fn encode(&self) -> Vec<u8> {
        encode_value(self.value, self.size)
    }

    /// Whether `data` is an acceptable value for this option
    pub fn validate(&self, data: &[u8]) -> bool {
        let Some(value) = decode_value(data, self.size) else {
            return false;
        };
        match self.kind {
            OptionKind::Mru => value <= lcp::MAX_MRU as u32,
            OptionKind::AuthProtocol => value == lcp::auth::PAP as u32,
            OptionKind::Accm | OptionKind::IpAddress => true,
        }
    }

    /// Value to suggest in a Configure-Nak; `received` is `None` when the
    /// option was missing from the request
    pub fn build_nak(&self, received: Option<&[u8]>) -> Vec<u8> {
        let suggested = match self.kind {
            OptionKind::Mru => lcp::DEFAULT_MRU as u32,
            OptionKind::AuthProtocol => lcp::auth::PAP as u32,
            OptionKind::Accm | OptionKind::IpAddress => match received {
                Some(data) if self.validate(data) => return data.to_vec(),
                _ => self.value,
            },
        };
        encode_value(suggested, self.size)
    }

    /// Commit a negotiated value. `peer` selects whether the value came from
    /// the peer's request or from the peer acking ours.
    pub fn apply(&self, data: &[u8], peer: bool, negotiated: &mut Negotiated) {
        let Some(value) = decode_value(data, self.size) else {
            return;
        };
        match (self.kind, peer) {
            (OptionKind::Mru, true) => negotiated.peer_mru = value as u16,
            (OptionKind::Mru, false) => negotiated.local_mru = value as u16,
            (OptionKind::Accm, true) => negotiated.tx_accm = value,
            (OptionKind::Accm, false) => negotiated.rx_accm = value,
            (OptionKind::AuthProtocol, true) => negotiated.auth_required = Some(value as u16),
            (OptionKind::AuthProtocol, false) => {}
            (OptionKind::IpAddress, true) => negotiated.peer_ip = Ipv4Addr::from(value),
            (OptionKind::IpAddress, false) => negotiated.local_ip = Ipv4Addr::from(value),
        }
    }

    /// Adopt a value the peer suggested in a Configure-Nak
    pub fn adopt(&mut self, data: &[u8]) -> bool {
        if !self.validate(data) {
            return false;
        }
        match decode_value(data, self.size) {
            Some(value) => {
                self.value = value;
                true
            }
            None => false,
        }
    }
}

/// Ordered option list of one protocol
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: Vec<ConfOption>,
}

impl OptionSet {
    pub fn new(options: Vec<ConfOption>) -> Self {
        Self { options }
    }

    pub fn get_conf_by_code(&self, type_code: u8) -> Option<&ConfOption> {
        self.options.iter().find(|opt| opt.type_code == type_code)
    }

    pub fn get_conf_by_code_mut(&mut self, type_code: u8) -> Option<&mut ConfOption> {
        self.options.iter_mut().find(|opt| opt.type_code == type_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfOption> {
        self.options.iter()
    }

    pub fn reset(&mut self) {
        self.options.iter_mut().for_each(ConfOption::reset);
    }

    /// Enabled options serialized in registry order
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for opt in self.options.iter().filter(|opt| opt.is_enabled()) {
            let data = opt.encode();
            ControlOption {
                opt_type: opt.type_code,
                data: &data,
            }
            .write_to(&mut out);
        }
        out
    }

    /// Whether a received request is acceptable as a whole: every option is
    /// known and valid and no REQUIRED option is missing
    pub fn accepts(&self, received: &[ControlOption]) -> bool {
        let all_valid = received.iter().all(|opt| {
            self.get_conf_by_code(opt.opt_type)
                .is_some_and(|conf| conf.validate(opt.data))
        });
        all_valid && self.missing_required(received).is_empty()
    }

    /// REQUIRED options absent from a received request
    pub fn missing_required(&self, received: &[ControlOption]) -> Vec<&ConfOption> {
        self.options
            .iter()
            .filter(|opt| {
                opt.is_required() && !received.iter().any(|r| r.opt_type == opt.type_code)
            })
            .collect()
    }
}

fn encode_value(value: u32, size: usize) -> Vec<u8> {
    value.to_be_bytes()[4 - size.min(4)..].to_vec()
}

fn decode_value(data: &[u8], size: usize) -> Option<u32> {
    if data.len() != size || size > 4 {
        return None;
    }
    Some(data.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mru() -> ConfOption {
        ConfOption::new(OptionKind::Mru, 1500, OptionFlags::ENABLED)
    }

    #[test]
    fn test_mru_validate() {
        let opt = mru();
        assert!(opt.validate(&[0x05, 0xdc]));
        assert!(opt.validate(&[0x07, 0xd0])); // 2000
        assert!(!opt.validate(&[0x07, 0xd1])); // 2001
        assert!(!opt.validate(&[0x05])); // wrong size
    }

    #[test]
    fn test_auth_only_pap() {
        let opt = ConfOption::new(OptionKind::AuthProtocol, 0xc023, OptionFlags::empty());
        assert!(opt.validate(&[0xc0, 0x23]));
        assert!(!opt.validate(&[0xc2, 0x23]));
        assert_eq!(opt.build_nak(Some(&[0xc2, 0x23, 0x05])), vec![0xc0, 0x23]);
    }

    #[test]
    fn test_mru_nak_suggests_default() {
        assert_eq!(mru().build_nak(Some(&[0xff, 0xff])), vec![0x05, 0xdc]);
    }

    #[test]
    fn test_apply_sides() {
        let accm = ConfOption::new(OptionKind::Accm, 0xffff_ffff, OptionFlags::ENABLED);
        let mut negotiated = Negotiated::default();
        accm.apply(&[0, 0, 0, 0], true, &mut negotiated);
        assert_eq!(negotiated.tx_accm, 0);
        assert_eq!(negotiated.rx_accm, 0xffff_ffff);

        let ip = ConfOption::new(OptionKind::IpAddress, 0, OptionFlags::ENABLED);
        ip.apply(&[10, 0, 0, 2], false, &mut negotiated);
        assert_eq!(negotiated.local_ip, Ipv4Addr::new(10, 0, 0, 2));

        negotiated.reset_peer();
        assert_eq!(negotiated.tx_accm, 0xffff_ffff);
        assert_eq!(negotiated.local_ip, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn test_serialize_enabled_only() {
        let set = OptionSet::new(vec![
            mru(),
            ConfOption::new(OptionKind::Accm, 0, OptionFlags::ENABLED),
            ConfOption::new(OptionKind::AuthProtocol, 0xc023, OptionFlags::empty()),
        ]);
        assert_eq!(
            set.serialize(),
            vec![0x01, 0x04, 0x05, 0xdc, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_accepts_and_required() {
        let mut required = mru();
        required.flags |= OptionFlags::REQUIRED;
        let set = OptionSet::new(vec![required]);

        assert!(!set.accepts(&[]));
        let mru_opt = ControlOption {
            opt_type: 1,
            data: &[0x05, 0xdc],
        };
        assert!(set.accepts(&[mru_opt]));
        let unknown = ControlOption {
            opt_type: 5,
            data: &[0, 0, 0, 1],
        };
        assert!(!set.accepts(&[mru_opt, unknown]));
    }

    #[test]
    fn test_adopt_and_reset() {
        let mut opt = mru();
        assert!(opt.adopt(&[0x05, 0x78]));
        assert_eq!(opt.value, 1400);
        assert!(!opt.adopt(&[0xff, 0xff]));
        opt.flags.remove(OptionFlags::ENABLED);
        opt.reset();
        assert_eq!(opt.value, 1500);
        assert!(opt.is_enabled());
    }
}
