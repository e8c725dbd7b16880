//! Async driver
//!
//! Merges transport input, the earliest protocol timer, outbound IPv4
//! traffic and the shutdown signal into one serialized stream of calls on a
//! [`PppLink`], and performs the actions the link hands back.

use super::fsm::State;
use super::{LinkAction, PppLink};
use crate::telemetry::LinkStats;
use crate::transport::{Transport, MAX_FRAME_SIZE};
use crate::{Error, Result};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Why the driver returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// LCP gave up on the link
    Finished,
    /// The peer refused our credentials
    AuthFailed(String),
    /// Closed on request
    Shutdown,
}

/// What the network stack sees of the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Up { local: Ipv4Addr, peer: Ipv4Addr },
    Down,
    Datagram(Vec<u8>),
}

/// Run `link` over `transport` until it finishes, authentication fails or
/// `shutdown` resolves and the close handshake completes.
pub async fn run<T, S>(
    mut link: PppLink,
    mut transport: T,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    network: mpsc::Sender<NetworkEvent>,
    shutdown: S,
) -> Result<LinkOutcome>
where
    T: Transport,
    S: Future<Output = ()>,
{
    let stats = link.stats().clone();
    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    let mut closing = false;
    tokio::pin!(shutdown);

    let now = Instant::now().into_std();
    let mut actions = link.open(now);
    actions.extend(link.carrier_up(now));

    loop {
        let mut finished = false;
        for action in actions.drain(..) {
            match action {
                LinkAction::Send(frame) => {
                    if let Err(e) = transport.send(&frame).await {
                        warn!("transport: send failed: {}", e);
                        stats.record_tx_error();
                    }
                }
                LinkAction::Deliver(datagram) => {
                    notify(&network, NetworkEvent::Datagram(datagram)).await;
                }
                LinkAction::ConfigureTransport {
                    mru,
                    tx_accm,
                    rx_accm,
                } => {
                    info!(
                        "transport: peer MRU {}, tx ACCM 0x{:08x}, rx ACCM 0x{:08x}",
                        mru, tx_accm, rx_accm
                    );
                    transport.configure(mru, tx_accm, rx_accm);
                }
                LinkAction::NetworkUp { local, peer } => {
                    notify(&network, NetworkEvent::Up { local, peer }).await;
                }
                LinkAction::NetworkDown => notify(&network, NetworkEvent::Down).await,
                LinkAction::AuthFailed(reason) => {
                    error!("link: authentication failed: {}", reason);
                    log_stats(&stats);
                    return Ok(LinkOutcome::AuthFailed(reason));
                }
                LinkAction::LinkFinished => finished = true,
            }
        }

        if finished {
            log_stats(&stats);
            return Ok(if closing {
                LinkOutcome::Shutdown
            } else {
                LinkOutcome::Finished
            });
        }

        let deadline = link.next_deadline();
        let sleep = sleep_until(
            deadline
                .map(Instant::from_std)
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)),
        );

        tokio::select! {
            result = transport.recv(&mut buf) => match result {
                Ok(len) => actions = link.process_frame(&buf[..len], Instant::now().into_std()),
                Err(Error::TransportClosed) => {
                    // A peer that finished terminating may hang up before our timer runs out
                    let state = link.lcp().state();
                    link.carrier_down(Instant::now().into_std());
                    log_stats(&stats);
                    if closing {
                        info!("transport: closed during shutdown");
                        return Ok(LinkOutcome::Shutdown);
                    }
                    if matches!(state, State::Closing | State::Stopping) {
                        info!("transport: closed after LCP terminate");
                        return Ok(LinkOutcome::Finished);
                    }
                    warn!("transport: closed");
                    return Err(Error::TransportClosed);
                }
                Err(e) => error!("transport: receive error: {}", e),
            },
            _ = sleep, if deadline.is_some() => {
                actions = link.handle_timeouts(Instant::now().into_std());
            }
            Some(datagram) = outbound.recv() => {
                match link.send_ip(&datagram, Instant::now().into_std()) {
                    Ok(sent) => actions = sent,
                    Err(e) => debug!("link: dropping outbound datagram: {}", e),
                }
            }
            _ = &mut shutdown, if !closing => {
                info!("link: shutting down");
                closing = true;
                actions = link.close(Instant::now().into_std());
            }
        }
    }
}

async fn notify(network: &mpsc::Sender<NetworkEvent>, event: NetworkEvent) {
    if network.send(event).await.is_err() {
        debug!("link: network receiver gone");
    }
}

fn log_stats(stats: &LinkStats) {
    for (name, value) in stats.export() {
        debug!("stats: {} = {}", name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkConfig;
    use crate::protocol::control::codes;
    use crate::protocol::lcp::DEFAULT_ACCM;
    use crate::protocol::ppp::{protocols, PppBuilder, PppFrame};
    use crate::transport::ChannelTransport;
    use std::future::pending;
    use std::sync::{Arc, Mutex};

    /// Channel transport that remembers every `configure` call
    struct RecordingTransport {
        inner: ChannelTransport,
        configured: Arc<Mutex<Vec<(u16, u32, u32)>>>,
    }

    impl Transport for RecordingTransport {
        async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.inner.recv(buf).await
        }

        async fn send(&mut self, frame: &[u8]) -> Result<usize> {
            self.inner.send(frame).await
        }

        fn configure(&mut self, mru: u16, tx_accm: u32, rx_accm: u32) {
            self.configured.lock().unwrap().push((mru, tx_accm, rx_accm));
        }
    }

    async fn recv_lcp(peer: &mut ChannelTransport, code: u8) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        loop {
            let len = peer.recv(&mut buf).await.unwrap();
            let frame = PppFrame::parse(&buf[..len]).unwrap();
            if frame.protocol() == protocols::LCP && frame.payload()[0] == code {
                return frame.payload().to_vec();
            }
        }
    }

    async fn send_lcp(peer: &mut ChannelTransport, payload: &[u8]) {
        peer.send(&PppBuilder::lcp().payload(payload).build())
            .await
            .unwrap();
    }

    /// Ack the link's request, send `request`, and wait for the link's ack
    async fn open_lcp(peer: &mut ChannelTransport, request: &[u8]) {
        let mut ours = recv_lcp(peer, codes::CONFIGURE_REQUEST).await;
        ours[0] = codes::CONFIGURE_ACK;
        send_lcp(peer, &ours).await;
        send_lcp(peer, request).await;
        recv_lcp(peer, codes::CONFIGURE_ACK).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_finishes() {
        let (local, _peer) = ChannelTransport::pair();
        let (_ip_tx, ip_rx) = mpsc::channel(8);
        let (net_tx, _net_rx) = mpsc::channel(8);

        let link = PppLink::new(LinkConfig::default());
        let stats = link.stats().clone();
        let outcome = run(link, local, ip_rx, net_tx, pending()).await.unwrap();

        assert_eq!(outcome, LinkOutcome::Finished);
        assert_eq!(stats.tx_frames.get(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_open() {
        let (local, _peer) = ChannelTransport::pair();
        let (_ip_tx, ip_rx) = mpsc::channel(8);
        let (net_tx, _net_rx) = mpsc::channel(8);

        let link = PppLink::new(LinkConfig::default());
        let outcome = run(link, local, ip_rx, net_tx, async {}).await.unwrap();
        assert_eq!(outcome, LinkOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_transport_closed() {
        let (local, peer) = ChannelTransport::pair();
        drop(peer);
        let (_ip_tx, ip_rx) = mpsc::channel(8);
        let (net_tx, _net_rx) = mpsc::channel(8);

        let link = PppLink::new(LinkConfig::default());
        let result = run(link, local, ip_rx, net_tx, pending()).await;
        assert!(matches!(result, Err(Error::TransportClosed)));
    }

    #[tokio::test]
    async fn test_peer_hangs_up_after_terminate() {
        let (local, mut peer) = ChannelTransport::pair();
        let (_ip_tx, ip_rx) = mpsc::channel(8);
        let (net_tx, _net_rx) = mpsc::channel(8);
        let task = tokio::spawn(run(
            PppLink::new(LinkConfig::default()),
            local,
            ip_rx,
            net_tx,
            pending(),
        ));

        open_lcp(&mut peer, &[0x01, 0x01, 0x00, 0x04]).await;
        send_lcp(&mut peer, &[0x05, 0x02, 0x00, 0x04]).await;
        assert_eq!(
            recv_lcp(&mut peer, codes::TERMINATE_ACK).await,
            vec![0x06, 0x02, 0x00, 0x04]
        );

        // The link now sits in Stopping; the peer goes away
        drop(peer);
        assert_eq!(task.await.unwrap().unwrap(), LinkOutcome::Finished);
    }

    #[tokio::test]
    async fn test_negotiated_values_reach_transport() {
        let (local, mut peer) = ChannelTransport::pair();
        let configured = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            inner: local,
            configured: configured.clone(),
        };
        let (_ip_tx, ip_rx) = mpsc::channel(8);
        let (net_tx, _net_rx) = mpsc::channel(8);
        let task = tokio::spawn(run(
            PppLink::new(LinkConfig::default()),
            transport,
            ip_rx,
            net_tx,
            pending(),
        ));

        // Peer asks for MRU 1400
        open_lcp(&mut peer, &[0x01, 0x01, 0x00, 0x08, 0x01, 0x04, 0x05, 0x78]).await;
        assert_eq!(
            *configured.lock().unwrap(),
            vec![(1400, DEFAULT_ACCM, DEFAULT_ACCM)]
        );
        task.abort();
    }
}
