//! Link monitor
//!
//! The bottom of the layer chain. Tracks the transport carrier, releases
//! LCP once it has asked for the link, and keeps an opened link honest with
//! periodic LCP Echo-Requests.

use super::{Context, LayerEvent, LinkAction, ProtocolId};
use crate::protocol::lcp;
use crate::protocol::ppp::protocols;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Debug)]
pub struct LinkMonitor {
    carrier: bool,
    /// LCP signalled This-Layer-Started
    lcp_started: bool,
    /// LCP is opened and keepalives are running
    echoing: bool,
    echo_interval: Duration,
    max_misses: u8,
    misses: u8,
    echo_id: u8,
}

impl LinkMonitor {
    pub fn new(echo_interval: Duration, max_misses: u8) -> Self {
        Self {
            carrier: false,
            lcp_started: false,
            echoing: false,
            echo_interval,
            max_misses,
            misses: 0,
            echo_id: 0,
        }
    }

    pub fn carrier(&self) -> bool {
        self.carrier
    }

    /// Unanswered Echo-Requests since the last sign of life
    pub fn misses(&self) -> u8 {
        self.misses
    }

    pub fn handle(&mut self, event: LayerEvent, cx: &mut Context) {
        match event {
            LayerEvent::LinkUp => {
                info!("link: carrier up");
                self.carrier = true;
                if self.lcp_started {
                    cx.notify(ProtocolId::Lcp, LayerEvent::LinkUp);
                }
            }
            LayerEvent::LinkDown => {
                info!("link: carrier down");
                self.carrier = false;
                self.stop_echo(cx);
                cx.notify(ProtocolId::Lcp, LayerEvent::LinkDown);
            }
            LayerEvent::UlStarted => {
                self.lcp_started = true;
                if self.carrier {
                    cx.notify(ProtocolId::Lcp, LayerEvent::LinkUp);
                } else {
                    debug!("link: LCP started, waiting for carrier");
                }
            }
            LayerEvent::UlFinished => {
                self.lcp_started = false;
                self.stop_echo(cx);
                cx.push_action(LinkAction::LinkFinished);
            }
            LayerEvent::UpperUp => {
                self.misses = 0;
                if !self.echo_interval.is_zero() {
                    self.echoing = true;
                    cx.schedule(ProtocolId::Dcp, self.echo_interval);
                }
            }
            LayerEvent::UpperDown => self.stop_echo(cx),
            LayerEvent::LinkAlive => {
                trace!("link: alive");
                self.misses = 0;
            }
            LayerEvent::Timeout if self.echoing => self.on_echo_timer(cx),
            other => trace!("link: ignoring {:?}", other),
        }
    }

    fn on_echo_timer(&mut self, cx: &mut Context) {
        if self.misses >= self.max_misses {
            warn!("link: {} echo requests unanswered, restarting LCP", self.misses);
            self.stop_echo(cx);
            cx.notify(ProtocolId::Lcp, LayerEvent::LinkDown);
            if self.carrier {
                cx.notify(ProtocolId::Lcp, LayerEvent::LinkUp);
            }
            return;
        }

        self.echo_id = self.echo_id.wrapping_add(1);
        self.misses += 1;
        debug!("link: sending Echo-Request id={}", self.echo_id);
        cx.send(protocols::LCP, &lcp::echo_request(self.echo_id, 0, &[]));
        cx.schedule(ProtocolId::Dcp, self.echo_interval);
    }

    fn stop_echo(&mut self, cx: &mut Context) {
        self.echoing = false;
        self.misses = 0;
        cx.cancel(ProtocolId::Dcp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::LinkStats;
    use std::sync::Arc;

    fn monitor() -> (LinkMonitor, Context) {
        (
            LinkMonitor::new(Duration::from_secs(30), 3),
            Context::new(Arc::new(LinkStats::new())),
        )
    }

    fn messages(cx: &mut Context) -> Vec<(ProtocolId, LayerEvent)> {
        std::iter::from_fn(|| cx.next_message()).collect()
    }

    #[test]
    fn test_up_needs_carrier_and_start() {
        let (mut dcp, mut cx) = monitor();
        dcp.handle(LayerEvent::UlStarted, &mut cx);
        assert!(messages(&mut cx).is_empty());

        dcp.handle(LayerEvent::LinkUp, &mut cx);
        assert_eq!(messages(&mut cx), vec![(ProtocolId::Lcp, LayerEvent::LinkUp)]);
    }

    #[test]
    fn test_carrier_first() {
        let (mut dcp, mut cx) = monitor();
        dcp.handle(LayerEvent::LinkUp, &mut cx);
        assert!(messages(&mut cx).is_empty());
        dcp.handle(LayerEvent::UlStarted, &mut cx);
        assert_eq!(messages(&mut cx), vec![(ProtocolId::Lcp, LayerEvent::LinkUp)]);
    }

    #[test]
    fn test_finished_reported() {
        let (mut dcp, mut cx) = monitor();
        dcp.handle(LayerEvent::UlFinished, &mut cx);
        assert_eq!(cx.take_actions(), vec![LinkAction::LinkFinished]);
    }

    #[test]
    fn test_echo_and_dead_link() {
        let (mut dcp, mut cx) = monitor();
        dcp.handle(LayerEvent::LinkUp, &mut cx);
        dcp.handle(LayerEvent::UpperUp, &mut cx);
        assert!(cx.timers.is_armed(ProtocolId::Dcp));

        for expected in 1..=3 {
            dcp.handle(LayerEvent::Timeout, &mut cx);
            assert_eq!(dcp.misses(), expected);
        }
        assert_eq!(cx.take_actions().len(), 3);

        dcp.handle(LayerEvent::Timeout, &mut cx);
        assert_eq!(
            messages(&mut cx),
            vec![
                (ProtocolId::Lcp, LayerEvent::LinkDown),
                (ProtocolId::Lcp, LayerEvent::LinkUp)
            ]
        );
        assert!(!cx.timers.is_armed(ProtocolId::Dcp));
    }

    #[test]
    fn test_alive_resets_misses() {
        let (mut dcp, mut cx) = monitor();
        dcp.handle(LayerEvent::UpperUp, &mut cx);
        dcp.handle(LayerEvent::Timeout, &mut cx);
        dcp.handle(LayerEvent::Timeout, &mut cx);
        dcp.handle(LayerEvent::LinkAlive, &mut cx);
        assert_eq!(dcp.misses(), 0);
    }

    #[test]
    fn test_zero_interval_disables_echo() {
        let mut dcp = LinkMonitor::new(Duration::ZERO, 3);
        let mut cx = Context::new(Arc::new(LinkStats::new()));
        dcp.handle(LayerEvent::UpperUp, &mut cx);
        assert!(!cx.timers.is_armed(ProtocolId::Dcp));
    }
}
