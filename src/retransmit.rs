//! Keyed store of unacknowledged outbound packets.
//!
//! This is the sender's half of the reliability engine; see
//! [`crate::ack_bitmap`] for the receiver's half.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::ack_bitmap::WINDOW_BITS;
use crate::error::{Error, Result};
use crate::sequence::precedes;

/// A single outstanding outbound packet awaiting acknowledgment.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub sequence: u64,
    pub payload: Vec<u8>,
    pub first_sent: Instant,
    pub last_sent: Instant,
    pub retry_count: u32,
}

impl PendingPacket {
    fn new(sequence: u64, payload: Vec<u8>, now: Instant) -> Self {
        Self {
            sequence,
            payload,
            first_sent: now,
            last_sent: now,
            retry_count: 0,
        }
    }
}

/// Hash-map-backed store of [`PendingPacket`]s, bounded by a configured
/// capacity. See the crate's `benches/retransmit_buffer.rs` for the
/// insert+find+erase benchmark that motivates the hash map over an ordered
/// map.
#[derive(Debug)]
pub struct RetransmitBuffer {
    entries: HashMap<u64, PendingPacket>,
    // Chronological index by first-send time, oldest first. The map itself
    // carries no ordering guarantee, so the retransmit timer walks this
    // instead of the map's iteration order.
    send_order: VecDeque<u64>,
    capacity: usize,
    prune_grace: u64,
}

impl RetransmitBuffer {
    /// Creates an empty buffer bounded by `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self::with_prune_grace(capacity, 0)
    }

    /// Creates an empty buffer with an explicit prune grace window (see
    /// `ReliabilityConfig::prune_grace`).
    pub fn with_prune_grace(capacity: usize, prune_grace: u64) -> Self {
        Self {
            entries: HashMap::new(),
            send_order: VecDeque::new(),
            capacity,
            prune_grace,
        }
    }

    /// Number of entries currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts a newly-sent packet. Replaces any existing entry for `seq`
    /// (the sender should never legitimately insert the same sequence
    /// twice). Fails with [`Error::Backpressure`] if the buffer is full and
    /// `seq` is not already present.
    pub fn insert(&mut self, seq: u64, payload: Vec<u8>, now: Instant) -> Result<()> {
        let already_present = self.entries.contains_key(&seq);
        if !already_present && self.entries.len() >= self.capacity {
            log::warn!("retransmit buffer full at capacity {}, backpressure", self.capacity);
            return Err(Error::Backpressure);
        }

        debug_assert!(!already_present, "sequence {seq} inserted twice into retransmit buffer");

        self.entries.insert(seq, PendingPacket::new(seq, payload, now));
        if !already_present {
            self.send_order.push_back(seq);
        }
        Ok(())
    }

    pub fn find(&self, seq: u64) -> Option<&PendingPacket> {
        self.entries.get(&seq)
    }

    pub fn find_mut(&mut self, seq: u64) -> Option<&mut PendingPacket> {
        self.entries.get_mut(&seq)
    }

    /// Removes `seq` if present, returning whether it was.
    pub fn erase(&mut self, seq: u64) -> bool {
        self.entries.remove(&seq).is_some()
    }

    /// Removes every entry acknowledged by `(head, bitmap)`, plus every
    /// entry strictly preceding `head - 32 - prune_grace` (implicitly acked
    /// by window advance). Returns the number of entries removed.
    pub fn prune(&mut self, head: u64, bitmap: u32) -> usize {
        if self.entries.is_empty() {
            return 0;
        }

        let window = WINDOW_BITS as u64 + self.prune_grace;
        let mut removed = 0usize;

        self.entries.retain(|&seq, _| {
            if seq == head {
                removed += 1;
                return false;
            }
            if precedes(head, seq) {
                // seq is newer than head; never implicitly acked.
                return true;
            }
            let diff = head.wrapping_sub(seq);
            if diff <= WINDOW_BITS as u64 && (bitmap >> (diff - 1)) & 1 != 0 {
                removed += 1;
                return false;
            }
            if diff > window {
                removed += 1;
                return false;
            }
            true
        });

        if removed > 0 {
            let remaining: std::collections::HashSet<u64> = self.entries.keys().copied().collect();
            self.send_order.retain(|seq| remaining.contains(seq));
            log::debug!("pruned {removed} entries for head={head} bitmap={bitmap:#010x}");
        }

        removed
    }

    /// Iterates pending sequences in ascending first-sent order, for the
    /// retransmit timer to walk.
    pub fn iter_by_send_order(&self) -> impl Iterator<Item = &PendingPacket> + '_ {
        self.send_order.iter().filter_map(|seq| self.entries.get(seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn payload(n: u8) -> Vec<u8> {
        vec![n; 4]
    }

    #[test]
    fn insert_find_erase_roundtrip() {
        let mut buf = RetransmitBuffer::new(16);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        assert!(buf.find(1).is_some());
        assert_eq!(buf.len(), 1);
        assert!(buf.erase(1));
        assert!(buf.find(1).is_none());
        assert!(!buf.erase(1));
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut buf = RetransmitBuffer::new(16);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        buf.insert(1, payload(2), now).unwrap();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.find(1).unwrap().payload, payload(2));
    }

    #[test]
    fn capacity_signals_backpressure_not_drop() {
        let mut buf = RetransmitBuffer::new(2);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        buf.insert(2, payload(2), now).unwrap();
        let err = buf.insert(3, payload(3), now).unwrap_err();
        assert_eq!(err, Error::Backpressure);
        assert_eq!(buf.len(), 2);
        assert!(buf.find(3).is_none());
    }

    #[test]
    fn replacing_existing_entry_does_not_duplicate_send_order() {
        let mut buf = RetransmitBuffer::new(16);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        buf.insert(1, payload(2), now).unwrap();
        let order: Vec<u64> = buf.iter_by_send_order().map(|p| p.sequence).collect();
        assert_eq!(order, vec![1], "replacing seq 1 must not yield it twice in send order");
    }

    #[test]
    fn replacing_existing_entry_never_backpressures_full_buffer() {
        let mut buf = RetransmitBuffer::new(1);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        assert!(buf.insert(1, payload(9), now).is_ok());
    }

    #[test]
    fn prune_removes_head_and_sack_bits() {
        let mut buf = RetransmitBuffer::new(64);
        let now = Instant::now();
        for seq in 100..=106u64 {
            buf.insert(seq, payload(seq as u8), now).unwrap();
        }
        // head=106, bitmap=0x36: bits for 104,103,101,100 set (from spec S3)
        let removed = buf.prune(106, 0x36);
        assert!(!buf.find(106).is_some());
        assert!(!buf.find(104).is_some());
        assert!(!buf.find(103).is_some());
        assert!(!buf.find(101).is_some());
        assert!(!buf.find(100).is_some());
        assert!(buf.find(105).is_some());
        assert!(buf.find(102).is_some());
        assert_eq!(removed, 5);
    }

    #[test]
    fn prune_drops_entries_older_than_window() {
        let mut buf = RetransmitBuffer::new(64);
        let now = Instant::now();
        buf.insert(10, payload(1), now).unwrap();
        buf.insert(1000, payload(2), now).unwrap();
        let removed = buf.prune(1000, 0);
        assert!(buf.find(10).is_none(), "far-behind entry must be implicitly acked away");
        assert!(buf.find(1000).is_none());
        assert_eq!(removed, 2);
    }

    #[test]
    fn prune_grace_retains_entries_just_past_window() {
        let mut buf = RetransmitBuffer::with_prune_grace(64, 8);
        let now = Instant::now();
        // head - seq = 36: outside the 32-bit SACK window, but within the
        // 32+8 grace window, so it should survive an ack_bits of 0.
        buf.insert(1000 - 36, payload(1), now).unwrap();
        buf.prune(1000, 0);
        assert!(buf.find(1000 - 36).is_some());
    }

    #[test]
    fn prune_never_removes_sequences_newer_than_head() {
        let mut buf = RetransmitBuffer::new(64);
        let now = Instant::now();
        buf.insert(50, payload(1), now).unwrap();
        buf.prune(10, 0);
        assert!(buf.find(50).is_some());
    }

    #[test]
    fn find_mut_allows_in_place_retry_bump() {
        let mut buf = RetransmitBuffer::new(16);
        let now = Instant::now();
        buf.insert(1, payload(1), now).unwrap();
        let later = now + Duration::from_millis(200);
        {
            let entry = buf.find_mut(1).unwrap();
            entry.retry_count += 1;
            entry.last_sent = later;
        }
        let entry = buf.find(1).unwrap();
        assert_eq!(entry.retry_count, 1);
        assert_eq!(entry.last_sent, later);
        assert_eq!(entry.first_sent, now);
    }

    #[test]
    fn iter_by_send_order_reflects_insertion_order_and_survives_prune() {
        let mut buf = RetransmitBuffer::new(16);
        let now = Instant::now();
        for seq in [5u64, 3, 9, 1] {
            buf.insert(seq, payload(seq as u8), now).unwrap();
        }
        let order: Vec<u64> = buf.iter_by_send_order().map(|p| p.sequence).collect();
        assert_eq!(order, vec![5, 3, 9, 1]);

        buf.erase(3);
        let order: Vec<u64> = buf.iter_by_send_order().map(|p| p.sequence).collect();
        assert_eq!(order, vec![5, 9, 1]);
    }

    #[test]
    fn prune_on_empty_buffer_is_noop() {
        let mut buf = RetransmitBuffer::new(16);
        assert_eq!(buf.prune(100, 0xFFFF_FFFF), 0);
    }

    #[test]
    fn prune_handles_wraparound_head() {
        let mut buf = RetransmitBuffer::new(64);
        let now = Instant::now();
        buf.insert(u64::MAX - 2, payload(1), now).unwrap();
        buf.insert(0, payload(2), now).unwrap();
        // bit 2 corresponds to diff 3: head(0) - (u64::MAX - 2) = 3 (wraps)
        let removed = buf.prune(0, 1 << 2);
        assert!(buf.find(0).is_none());
        assert!(buf.find(u64::MAX - 2).is_none());
        assert_eq!(removed, 2);
    }
}
