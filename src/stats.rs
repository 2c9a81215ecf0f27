//! Read-only telemetry snapshot for a reliability engine.

use std::time::Duration;

/// Point-in-time snapshot of a [`crate::engine::ReliabilityEngine`]'s state.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Number of packets currently awaiting acknowledgment.
    pub packets_in_flight: usize,
    /// Total packets ever handed to `send`.
    pub total_sent: u64,
    /// Total packets acknowledged (directly or via SACK).
    pub total_acked: u64,
    /// Total packets removed by `prune` as implicitly acknowledged.
    pub total_pruned: u64,
    /// Total retransmissions performed.
    pub total_retransmitted: u64,
    /// Total packets that exceeded `max_retries`.
    pub total_failed: u64,
    /// Current retransmit timeout.
    pub current_rto: Duration,
}
