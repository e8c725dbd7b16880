//! Per-link traffic counters.
//!
//! Counters are shared between the link engine and whoever reports them, so
//! they are plain relaxed atomics behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Statistics for one PPP link.
#[derive(Debug, Default)]
pub struct LinkStats {
    /// PPP frames received from the transport.
    pub rx_frames: Counter,
    pub rx_bytes: Counter,
    /// PPP frames handed to the transport.
    pub tx_frames: Counter,
    pub tx_bytes: Counter,
    /// Frames dropped before reaching a layer.
    pub rx_drops: Counter,
    /// Protocol-Reject packets sent for unknown protocols.
    pub protocol_rejects: Counter,
    /// IPv4 datagrams delivered to the network stack.
    pub ip_rx_packets: Counter,
    /// IPv4 datagrams accepted from the network stack.
    pub ip_tx_packets: Counter,
    /// Transport send failures.
    pub tx_errors: Counter,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received frame.
    pub fn record_rx(&self, bytes: usize) {
        self.rx_frames.inc();
        self.rx_bytes.add(bytes as u64);
    }

    /// Records a transmitted frame.
    pub fn record_tx(&self, bytes: usize) {
        self.tx_frames.inc();
        self.tx_bytes.add(bytes as u64);
    }

    pub fn record_rx_drop(&self) {
        self.rx_drops.inc();
    }

    pub fn record_tx_error(&self) {
        self.tx_errors.inc();
    }

    /// Exports all counters as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("rx_frames".into(), self.rx_frames.get()),
            ("rx_bytes".into(), self.rx_bytes.get()),
            ("tx_frames".into(), self.tx_frames.get()),
            ("tx_bytes".into(), self.tx_bytes.get()),
            ("rx_drops".into(), self.rx_drops.get()),
            ("protocol_rejects".into(), self.protocol_rejects.get()),
            ("ip_rx_packets".into(), self.ip_rx_packets.get()),
            ("ip_tx_packets".into(), self.ip_tx_packets.get()),
            ("tx_errors".into(), self.tx_errors.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_link_stats() {
        let stats = LinkStats::new();
        stats.record_rx(100);
        stats.record_rx(20);
        stats.record_tx(48);
        stats.record_rx_drop();

        assert_eq!(stats.rx_frames.get(), 2);
        assert_eq!(stats.rx_bytes.get(), 120);
        assert_eq!(stats.tx_frames.get(), 1);
        assert_eq!(stats.tx_bytes.get(), 48);
        assert_eq!(stats.rx_drops.get(), 1);
    }

    #[test]
    fn test_export() {
        let stats = LinkStats::new();
        stats.protocol_rejects.inc();
        let exported = stats.export();
        assert!(exported.contains(&("protocol_rejects".to_string(), 1)));
        assert!(exported.contains(&("tx_errors".to_string(), 0)));
        assert_eq!(exported.len(), 9);
    }
}
