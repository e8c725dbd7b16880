//! IPCP adapter
//!
//! We request 0.0.0.0 and let the peer assign our address through the
//! Configure-Nak cycle.

use super::fsm::{code_mask, ControlProtocol};
use super::options::{ConfOption, Negotiated, OptionFlags, OptionKind, OptionSet};
use super::{Context, ProtocolId};
use crate::protocol::control::codes;
use crate::protocol::ppp::protocols;
use tracing::info;

#[derive(Debug, Default)]
pub struct Ipcp;

impl ControlProtocol for Ipcp {
    const ID: ProtocolId = ProtocolId::Ipcp;
    const NUMBER: u16 = protocols::IPCP;
    const NAME: &'static str = "IPCP";
    const SUPPORTED_CODES: u16 = code_mask(codes::CONFIGURE_REQUEST, codes::CODE_REJECT);

    fn options(&self) -> OptionSet {
        OptionSet::new(vec![ConfOption::new(
            OptionKind::IpAddress,
            0,
            OptionFlags::ENABLED,
        )])
    }

    fn layer_up(&mut self, negotiated: &Negotiated, _cx: &mut Context) {
        info!(
            "IPCP: opened, local {} peer {}",
            negotiated.local_ip, negotiated.peer_ip
        );
    }

    fn layer_down(&mut self, _cx: &mut Context) {
        info!("IPCP: closed");
    }
}
