//! PAP authentication layer - RFC 1334
//!
//! Sits between LCP and IPCP. When the peer demanded PAP during LCP
//! negotiation we send our credentials and hold IPCP back until the peer
//! acks them; otherwise LINKUP passes straight through.

use super::{Context, LayerEvent, LayerStatus, LinkAction, ProtocolId};
use crate::protocol::lcp;
use crate::protocol::pap::{self, PapPacket};
use crate::protocol::ppp::protocols;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Debug)]
pub struct PapClient {
    username: String,
    password: String,
    restart: Duration,
    max_attempts: u8,
    attempts: u8,
    identifier: u8,
    status: LayerStatus,
    /// Whether IPCP has been told the link is up
    upper_up: bool,
}

impl PapClient {
    pub fn new(username: String, password: String, restart: Duration, max_attempts: u8) -> Self {
        Self {
            username,
            password,
            restart,
            max_attempts,
            attempts: 0,
            identifier: 0,
            status: LayerStatus::Down,
            upper_up: false,
        }
    }

    pub fn status(&self) -> LayerStatus {
        self.status
    }

    /// Handle a layer message. `auth_required` is what LCP negotiated.
    pub fn handle(&mut self, event: LayerEvent, auth_required: Option<u16>, cx: &mut Context) {
        match event {
            LayerEvent::LinkUp => match auth_required {
                Some(lcp::auth::PAP) => {
                    info!("PAP: authenticating as {}", self.username);
                    self.status = LayerStatus::Starting;
                    self.attempts = 0;
                    self.send_request(cx);
                }
                Some(other) => {
                    warn!("PAP: unsupported authentication protocol 0x{:04x}", other);
                    self.fail("unsupported authentication protocol".into(), cx);
                }
                None => {
                    debug!("PAP: not required, passing link up");
                    self.succeed(cx);
                }
            },
            LayerEvent::LinkDown => {
                self.status = LayerStatus::Down;
                cx.cancel(ProtocolId::Auth);
                if self.upper_up {
                    self.upper_up = false;
                    cx.notify(ProtocolId::Ipcp, LayerEvent::LinkDown);
                }
            }
            LayerEvent::Timeout if self.status == LayerStatus::Starting => {
                if self.attempts >= self.max_attempts {
                    warn!("PAP: no answer after {} requests", self.attempts);
                    self.fail("authentication timed out".into(), cx);
                } else {
                    self.send_request(cx);
                }
            }
            LayerEvent::UlFinished => {
                // No network protocol left to carry: take the link down
                info!("PAP: IPCP finished, closing LCP");
                cx.notify(ProtocolId::Lcp, LayerEvent::Close);
            }
            other => trace!("PAP: ignoring {:?}", other),
        }
    }

    /// Handle a received PAP packet
    pub fn receive(&mut self, data: &[u8], cx: &mut Context) {
        let packet = match PapPacket::parse(data) {
            Ok(p) => p,
            Err(e) => {
                debug!("PAP: dropping packet: {}", e);
                return;
            }
        };

        if packet.identifier() != self.identifier {
            debug!(
                "PAP: identifier mismatch (got {}, expected {})",
                packet.identifier(),
                self.identifier
            );
            return;
        }

        let message = packet
            .message()
            .map(|m| String::from_utf8_lossy(m).into_owned())
            .unwrap_or_default();

        if packet.is_success() {
            info!("PAP: authentication succeeded: {}", message);
            cx.cancel(ProtocolId::Auth);
            self.succeed(cx);
        } else if packet.is_failure() {
            warn!("PAP: authentication failed: {}", message);
            self.fail(message, cx);
        } else {
            debug!("PAP: ignoring code {}", packet.code());
        }
    }

    fn send_request(&mut self, cx: &mut Context) {
        self.attempts += 1;
        self.identifier = self.identifier.wrapping_add(1);

        match pap::authenticate_request(
            self.identifier,
            self.username.as_bytes(),
            self.password.as_bytes(),
        ) {
            Ok(packet) => {
                debug!(
                    "PAP: sending Authenticate-Request id={} (attempt {})",
                    self.identifier, self.attempts
                );
                cx.send(protocols::PAP, &packet);
                cx.schedule(ProtocolId::Auth, self.restart);
            }
            Err(e) => {
                warn!("PAP: cannot build request: {}", e);
                self.fail(e.to_string(), cx);
            }
        }
    }

    fn succeed(&mut self, cx: &mut Context) {
        self.status = LayerStatus::Up;
        self.upper_up = true;
        cx.notify(ProtocolId::Ipcp, LayerEvent::LinkUp);
    }

    /// Report the failure and force LCP down
    fn fail(&mut self, reason: String, cx: &mut Context) {
        self.status = LayerStatus::Down;
        cx.cancel(ProtocolId::Auth);
        cx.push_action(LinkAction::AuthFailed(reason));
        cx.notify(ProtocolId::Lcp, LayerEvent::LinkDown);
    }
}
