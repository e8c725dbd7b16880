//! A link against a hand-scripted peer: PAP and IPCP address assignment

use pppos::link::{self, LinkConfig, LinkOutcome, NetworkEvent, PppLink, TunnelConfig};
use pppos::protocol::ipv4::Ipv4Header;
use pppos::protocol::pap::PapPacket;
use pppos::protocol::ppp::{protocols, PppBuilder, PppFrame};
use pppos::protocol::udp::UdpHeader;
use pppos::transport::{ChannelTransport, Transport};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn recv_frame(peer: &mut ChannelTransport) -> (u16, Vec<u8>) {
    let mut buf = [0u8; 2048];
    let len = timeout(Duration::from_secs(2), peer.recv(&mut buf))
        .await
        .expect("link went quiet")
        .unwrap();
    let frame = PppFrame::parse(&buf[..len]).unwrap();
    (frame.protocol(), frame.payload().to_vec())
}

async fn send_frame(peer: &mut ChannelTransport, protocol: u16, payload: &[u8]) {
    peer.send(&PppBuilder::new(protocol).payload(payload).build())
        .await
        .unwrap();
}

/// Authenticate-Ack (code 2) or Authenticate-Nak (code 3) carrying `message`
fn pap_reply(code: u8, id: u8, message: &str) -> Vec<u8> {
    let mut packet = vec![code, id, 0, 0, message.len() as u8];
    packet.extend_from_slice(message.as_bytes());
    let len = packet.len() as u16;
    packet[2..4].copy_from_slice(&len.to_be_bytes());
    packet
}

/// Peer-ID and Password of an Authenticate-Request
fn peer_credentials(request: &[u8]) -> (Vec<u8>, Vec<u8>) {
    assert_eq!(request[0], 0x01);
    let data = &request[4..];
    let id_len = data[0] as usize;
    let peer_id = data[1..1 + id_len].to_vec();
    let rest = &data[1 + id_len..];
    let password = rest[1..1 + rest[0] as usize].to_vec();
    (peer_id, password)
}

fn credentials() -> LinkConfig {
    LinkConfig {
        username: "user".into(),
        password: "secret".into(),
        ..LinkConfig::default()
    }
}

/// Open LCP with a peer that demands PAP; returns the Authenticate-Request
async fn open_lcp_with_pap(peer: &mut ChannelTransport) -> Vec<u8> {
    let (protocol, mut request) = recv_frame(peer).await;
    assert_eq!(protocol, protocols::LCP);
    request[0] = 0x02;
    send_frame(peer, protocols::LCP, &request).await;
    send_frame(
        peer,
        protocols::LCP,
        &[0x01, 0x01, 0x00, 0x08, 0x03, 0x04, 0xc0, 0x23],
    )
    .await;

    let (protocol, ack) = recv_frame(peer).await;
    assert_eq!(protocol, protocols::LCP);
    assert_eq!(ack, vec![0x02, 0x01, 0x00, 0x08, 0x03, 0x04, 0xc0, 0x23]);

    let (protocol, auth) = recv_frame(peer).await;
    assert_eq!(protocol, protocols::PAP);
    auth
}

#[tokio::test]
async fn test_pap_rejected() {
    let (local, mut peer) = ChannelTransport::pair();
    let (_ip_tx, ip_rx) = mpsc::channel(8);
    let (net_tx, _net_rx) = mpsc::channel(8);
    let task = tokio::spawn(link::run(
        PppLink::new(credentials()),
        local,
        ip_rx,
        net_tx,
        std::future::pending(),
    ));

    let auth = open_lcp_with_pap(&mut peer).await;
    let request = PapPacket::parse(&auth).unwrap();
    assert_eq!(
        peer_credentials(&auth),
        (b"user".to_vec(), b"secret".to_vec())
    );

    let nak = pap_reply(0x03, request.identifier(), "bad password");
    send_frame(&mut peer, protocols::PAP, &nak).await;

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, LinkOutcome::AuthFailed("bad password".into()));
}

#[tokio::test]
async fn test_address_assigned_and_tunnelled() {
    let (local, mut peer) = ChannelTransport::pair();
    let (ip_tx, ip_rx) = mpsc::channel(8);
    let (net_tx, mut net_rx) = mpsc::channel(8);
    let config = LinkConfig {
        tunnel: Some(TunnelConfig {
            remote: "198.51.100.7:4500".parse().unwrap(),
            local_port: 4501,
        }),
        ..credentials()
    };
    let _task = tokio::spawn(link::run(
        PppLink::new(config),
        local,
        ip_rx,
        net_tx,
        std::future::pending(),
    ));

    let auth = open_lcp_with_pap(&mut peer).await;
    let id = PapPacket::parse(&auth).unwrap().identifier();
    send_frame(&mut peer, protocols::PAP, &pap_reply(0x02, id, "welcome")).await;

    // IPCP: Nak the unspecified address, then ack the assigned one
    let (protocol, request) = recv_frame(&mut peer).await;
    assert_eq!(protocol, protocols::IPCP);
    assert_eq!(request, vec![0x01, 0x01, 0x00, 0x0a, 0x03, 0x06, 0, 0, 0, 0]);
    send_frame(
        &mut peer,
        protocols::IPCP,
        &[0x03, 0x01, 0x00, 0x0a, 0x03, 0x06, 10, 0, 0, 2],
    )
    .await;

    let (_, mut request) = recv_frame(&mut peer).await;
    assert_eq!(&request[6..], &[10, 0, 0, 2]);
    send_frame(
        &mut peer,
        protocols::IPCP,
        &[0x01, 0x07, 0x00, 0x0a, 0x03, 0x06, 10, 0, 0, 1],
    )
    .await;
    let (_, ack) = recv_frame(&mut peer).await;
    assert_eq!(ack[0], 0x02);
    request[0] = 0x02;
    send_frame(&mut peer, protocols::IPCP, &request).await;

    assert_eq!(
        net_rx.recv().await,
        Some(NetworkEvent::Up {
            local: Ipv4Addr::new(10, 0, 0, 2),
            peer: Ipv4Addr::new(10, 0, 0, 1),
        })
    );

    ip_tx.send(b"payload".to_vec()).await.unwrap();
    let (protocol, packet) = recv_frame(&mut peer).await;
    assert_eq!(protocol, protocols::IP);
    let ip = Ipv4Header::parse(&packet).unwrap();
    assert_eq!(ip.src_addr(), Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(ip.dst_addr(), Ipv4Addr::new(198, 51, 100, 7));
    let udp = UdpHeader::parse(ip.payload()).unwrap();
    assert_eq!(udp.dst_port(), 4500);
    assert_eq!(udp.payload(), b"payload");
}

#[tokio::test]
async fn test_unknown_protocol_rejected() {
    let (local, mut peer) = ChannelTransport::pair();
    let (_ip_tx, ip_rx) = mpsc::channel(8);
    let (net_tx, _net_rx) = mpsc::channel(8);
    let _task = tokio::spawn(link::run(
        PppLink::new(LinkConfig::default()),
        local,
        ip_rx,
        net_tx,
        std::future::pending(),
    ));

    let (_, mut request) = recv_frame(&mut peer).await;
    request[0] = 0x02;
    send_frame(&mut peer, protocols::LCP, &request).await;
    send_frame(&mut peer, protocols::LCP, &[0x01, 0x01, 0x00, 0x04]).await;
    let (_, ack) = recv_frame(&mut peer).await;
    assert_eq!(ack, vec![0x02, 0x01, 0x00, 0x04]);
    let (protocol, _) = recv_frame(&mut peer).await;
    assert_eq!(protocol, protocols::IPCP);

    // IPv6CP is not supported
    send_frame(&mut peer, 0x8057, &[0x01, 0x01, 0x00, 0x04]).await;
    let (protocol, reject) = recv_frame(&mut peer).await;
    assert_eq!(protocol, protocols::LCP);
    assert_eq!(
        reject,
        vec![0x08, 0x01, 0x00, 0x0a, 0x80, 0x57, 0x01, 0x01, 0x00, 0x04]
    );
}
