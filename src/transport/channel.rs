//! In-memory transport over tokio channels

use super::Transport;
use crate::{Error, Result};
use tokio::sync::mpsc;

const CHANNEL_DEPTH: usize = 64;

/// One end of an in-memory frame pipe
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Two connected ends; frames sent on one arrive on the other
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (b_tx, a_rx) = mpsc::channel(CHANNEL_DEPTH);
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

impl Transport for ChannelTransport {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let frame = self.rx.recv().await.ok_or(Error::TransportClosed)?;
        if frame.len() > buf.len() {
            return Err(Error::InvalidPacket(format!(
                "{} byte frame exceeds {} byte buffer",
                frame.len(),
                buf.len()
            )));
        }
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    async fn send(&mut self, frame: &[u8]) -> Result<usize> {
        self.tx
            .send(frame.to_vec())
            .await
            .map_err(|_| Error::TransportClosed)?;
        Ok(frame.len())
    }
}
