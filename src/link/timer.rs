//! Per-protocol single-shot timers
//!
//! Every protocol owns at most one deadline. Arming replaces the previous
//! deadline; the driver sleeps until [`Timers::next_deadline`] and hands the
//! expired ones back through [`Timers::take_expired`].

use super::ProtocolId;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: [Option<Instant>; ProtocolId::COUNT],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `id` to fire `after` from `now`, cancelling any pending deadline
    pub fn schedule(&mut self, id: ProtocolId, now: Instant, after: Duration) {
        self.deadlines[id.index()] = Some(now + after);
    }

    pub fn cancel(&mut self, id: ProtocolId) {
        self.deadlines[id.index()] = None;
    }

    pub fn is_armed(&self, id: ProtocolId) -> bool {
        self.deadlines[id.index()].is_some()
    }

    pub fn deadline(&self, id: ProtocolId) -> Option<Instant> {
        self.deadlines[id.index()]
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_expired(&mut self, now: Instant) -> Vec<ProtocolId> {
        let mut expired: Vec<(Instant, ProtocolId)> = ProtocolId::ALL
            .iter()
            .filter_map(|&id| match self.deadlines[id.index()] {
                Some(deadline) if deadline <= now => Some((deadline, id)),
                _ => None,
            })
            .collect();
        expired.sort_by_key(|(deadline, _)| *deadline);

        for (_, id) in &expired {
            self.cancel(*id);
        }
        expired.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_replaces_previous() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(ProtocolId::Lcp, now, Duration::from_secs(3));
        timers.schedule(ProtocolId::Lcp, now, Duration::from_secs(1));
        assert_eq!(timers.deadline(ProtocolId::Lcp), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_next_deadline_and_expiry_order() {
        let now = Instant::now();
        let mut timers = Timers::new();
        assert_eq!(timers.next_deadline(), None);

        timers.schedule(ProtocolId::Ipcp, now, Duration::from_secs(2));
        timers.schedule(ProtocolId::Lcp, now, Duration::from_secs(1));
        timers.schedule(ProtocolId::Dcp, now, Duration::from_secs(30));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_secs(1)));

        let expired = timers.take_expired(now + Duration::from_secs(5));
        assert_eq!(expired, vec![ProtocolId::Lcp, ProtocolId::Ipcp]);
        assert!(!timers.is_armed(ProtocolId::Lcp));
        assert!(timers.is_armed(ProtocolId::Dcp));
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(ProtocolId::Auth, now, Duration::ZERO);
        timers.cancel(ProtocolId::Auth);
        assert!(timers.take_expired(now).is_empty());
    }
}
