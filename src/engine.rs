//! Per-flow reliability engine: binds sequence allocation, SACK tracking,
//! and retransmit scheduling into the small set of calls a transport needs
//! per tick.

use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::ack_bitmap::AckBitmap;
use crate::ack_frame::AckFrame;
use crate::config::ReliabilityConfig;
use crate::error::{Error, Result};
use crate::retransmit::RetransmitBuffer;
use crate::stats::EngineStats;

/// Upper bound on the retransmit backoff, regardless of how many retries a
/// packet has accumulated.
const MAX_RTO: Duration = Duration::from_secs(60);

/// Drives one flow's worth of reliability bookkeeping: sequence allocation
/// and retransmission on the send side, SACK tracking and ack coalescing on
/// the receive side.
pub struct ReliabilityEngine {
    config: ReliabilityConfig,
    next_seq: u64,
    retransmit: RetransmitBuffer,
    ack_bitmap: AckBitmap,
    current_rto: Duration,
    pending_acks: u32,
    last_ack_at: Option<Instant>,
    total_sent: u64,
    total_acked: u64,
    total_pruned: u64,
    total_retransmitted: u64,
    total_failed: u64,
}

impl ReliabilityEngine {
    pub fn new(config: ReliabilityConfig) -> Self {
        let retransmit = RetransmitBuffer::with_prune_grace(config.retransmit_capacity, config.prune_grace);
        let current_rto = config.initial_rto;
        Self {
            config,
            next_seq: 0,
            retransmit,
            ack_bitmap: AckBitmap::new(),
            current_rto,
            pending_acks: 0,
            last_ack_at: None,
            total_sent: 0,
            total_acked: 0,
            total_pruned: 0,
            total_retransmitted: 0,
            total_failed: 0,
        }
    }

    /// Hands `payload` to the reliability layer for sending, assigning it
    /// the next sequence number and tracking it for retransmission.
    /// Fails with [`Error::Backpressure`] if the retransmit buffer is full.
    pub fn send(&mut self, payload: Vec<u8>, now: Instant) -> Result<u64> {
        let seq = self.next_seq;
        self.retransmit.insert(seq, payload, now)?;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.total_sent += 1;
        Ok(seq)
    }

    /// Records an incoming data packet for SACK purposes. Returns `true` if
    /// `seq` had not already been acknowledged (i.e. it should be delivered
    /// to the application), `false` for a duplicate.
    pub fn on_incoming_data(&mut self, seq: u64, now: Instant) -> bool {
        let was_new = !self.ack_bitmap.is_acked(seq);
        self.ack_bitmap.ack(seq);
        if was_new {
            self.pending_acks += 1;
            if self.last_ack_at.is_none() {
                self.last_ack_at = Some(now);
            }
        }
        was_new
    }

    /// Builds the next outgoing [`AckFrame`], if the coalescing policy says
    /// one is due: either `ack_coalesce_threshold` new packets have arrived
    /// unacknowledged, or `ack_coalesce_delay` has elapsed since the oldest
    /// of them.
    pub fn poll_ack(&mut self, now: Instant) -> Option<AckFrame> {
        if self.pending_acks == 0 {
            return None;
        }
        let due_by_count = self.pending_acks >= self.config.ack_coalesce_threshold;
        let due_by_delay = self
            .last_ack_at
            .map(|t| now.saturating_duration_since(t) >= self.config.ack_coalesce_delay)
            .unwrap_or(true);
        if !due_by_count && !due_by_delay {
            return None;
        }
        let head = self.ack_bitmap.head()?;
        self.pending_acks = 0;
        self.last_ack_at = None;
        Some(AckFrame::new(head, self.ack_bitmap.bitmap()))
    }

    /// Applies an incoming ACK frame: prunes every entry it acknowledges
    /// (directly or implicitly via window advance) from the retransmit
    /// buffer. Returns the number of entries pruned. Resets the retransmit
    /// backoff on forward progress.
    pub fn on_incoming_ack(&mut self, frame: AckFrame) -> usize {
        let pruned = self.retransmit.prune(frame.head, frame.bitmap);
        if pruned > 0 {
            self.total_acked += pruned as u64;
            self.total_pruned += pruned as u64;
            self.current_rto = self.config.initial_rto;
        }
        pruned
    }

    /// Walks the retransmit buffer in send order and resends every entry
    /// whose retransmit timeout has elapsed. Doubles the backoff on each
    /// round that produces a resend. Every due entry is bumped and, if still
    /// within `max_retries`, resent in this same call; only once the whole
    /// due set has been processed does the flow fail with
    /// [`Error::FlowFailed`] if any entry exceeded `max_retries`, so one
    /// over-retried packet never starves its still-healthy siblings of a
    /// resend in the same tick.
    pub fn on_timer_tick(&mut self, now: Instant) -> Result<SmallVec<[(u64, Vec<u8>); 8]>> {
        let rto = self.current_rto;
        let mut due: SmallVec<[u64; 8]> = SmallVec::new();
        for pkt in self.retransmit.iter_by_send_order() {
            if now.saturating_duration_since(pkt.last_sent) >= rto {
                due.push(pkt.sequence);
            }
        }

        if due.is_empty() {
            return Ok(SmallVec::new());
        }

        let mut resends = SmallVec::with_capacity(due.len());
        let mut failed = false;
        for seq in due {
            let Some(pkt) = self.retransmit.find_mut(seq) else {
                continue;
            };
            pkt.retry_count += 1;
            if pkt.retry_count > self.config.max_retries {
                log::warn!("sequence {seq} exceeded max_retries={}, failing flow", self.config.max_retries);
                self.retransmit.erase(seq);
                self.total_failed += 1;
                failed = true;
                continue;
            }
            pkt.last_sent = now;
            resends.push((seq, pkt.payload.clone()));
        }

        self.total_retransmitted += resends.len() as u64;
        self.current_rto = (self.current_rto * 2).min(MAX_RTO);
        log::debug!("retransmitted {} packets, rto now {:?}", resends.len(), self.current_rto);

        if failed {
            return Err(Error::FlowFailed);
        }
        Ok(resends)
    }

    /// Tears down the flow, returning a final stats snapshot.
    pub fn close(self) -> EngineStats {
        self.stats()
    }

    /// Returns a point-in-time telemetry snapshot.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            packets_in_flight: self.retransmit.len(),
            total_sent: self.total_sent,
            total_acked: self.total_acked,
            total_pruned: self.total_pruned,
            total_retransmitted: self.total_retransmitted,
            total_failed: self.total_failed,
            current_rto: self.current_rto,
        }
    }
}
