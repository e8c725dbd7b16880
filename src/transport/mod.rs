//! Frame transports
//!
//! The link engine needs whole PPP frames in and out; HDLC escaping and the
//! frame check sequence live beneath this interface.
//! - UDP: one PPP frame per datagram, for modem and radio gateways
//! - Channel: in-memory pair for tests and loopback

mod channel;
mod udp;

pub use channel::ChannelTransport;
pub use udp::UdpTransport;

use crate::Result;
use std::future::Future;

/// Largest frame a transport must be able to carry (MRU 2000 plus header)
pub const MAX_FRAME_SIZE: usize = 2048;

/// Frame transport trait
///
/// All transports must implement this trait to be driven by [`crate::link::run`].
pub trait Transport: Send {
    /// Receive one frame into the provided buffer, returning its length
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;

    /// Send one frame
    fn send(&mut self, frame: &[u8]) -> impl Future<Output = Result<usize>> + Send;

    /// Apply what LCP negotiated: the peer's MRU and the async control
    /// character maps for each direction. Framings without character
    /// escaping have nothing to do.
    fn configure(&mut self, _mru: u16, _tx_accm: u32, _rx_accm: u32) {}
}
