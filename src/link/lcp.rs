//! LCP adapter
//!
//! Option registry and layer hooks of the Link Control Protocol.

use super::fsm::{code_mask, ControlProtocol};
use super::options::{ConfOption, Negotiated, OptionFlags, OptionKind, OptionSet};
use super::{Context, LayerEvent, LinkAction, ProtocolId};
use crate::protocol::control::codes;
use crate::protocol::lcp;
use crate::protocol::ppp::protocols;
use tracing::info;

#[derive(Debug, Default)]
pub struct Lcp;

impl ControlProtocol for Lcp {
    const ID: ProtocolId = ProtocolId::Lcp;
    const NUMBER: u16 = protocols::LCP;
    const NAME: &'static str = "LCP";
    const SUPPORTED_CODES: u16 = code_mask(codes::CONFIGURE_REQUEST, codes::DISCARD_REQUEST);

    fn options(&self) -> OptionSet {
        OptionSet::new(vec![
            ConfOption::new(OptionKind::Mru, lcp::DEFAULT_MRU as u32, OptionFlags::ENABLED),
            ConfOption::new(OptionKind::Accm, lcp::DEFAULT_ACCM, OptionFlags::ENABLED),
            // Accepted from the peer, never requested by us
            ConfOption::new(
                OptionKind::AuthProtocol,
                lcp::auth::PAP as u32,
                OptionFlags::empty(),
            ),
        ])
    }

    fn layer_up(&mut self, negotiated: &Negotiated, cx: &mut Context) {
        info!(
            "LCP: opened, peer MRU {} tx ACCM 0x{:08x}, auth {}",
            negotiated.peer_mru,
            negotiated.tx_accm,
            negotiated.auth_required.map_or("none", |_| "PAP")
        );
        cx.push_action(LinkAction::ConfigureTransport {
            mru: negotiated.peer_mru,
            tx_accm: negotiated.tx_accm,
            rx_accm: negotiated.rx_accm,
        });
        cx.notify(ProtocolId::Dcp, LayerEvent::UpperUp);
    }

    fn layer_down(&mut self, cx: &mut Context) {
        cx.notify(ProtocolId::Dcp, LayerEvent::UpperDown);
    }
}
