//! UDP datagram transport

use super::Transport;
use crate::Result;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// PPP frames carried one per UDP datagram to a fixed peer
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind `local` and exchange frames with `peer` only
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        info!("transport: udp {} <-> {}", socket.local_addr()?, peer);
        Ok(Self { socket, peer })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.socket.recv(buf).await?;
        debug!("transport: received {} bytes", len);
        Ok(len)
    }

    async fn send(&mut self, frame: &[u8]) -> Result<usize> {
        Ok(self.socket.send(frame).await?)
    }
}
