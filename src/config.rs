//! Configuration for the reliability engine.

use std::time::Duration;

/// Default maximum number of unacknowledged packets tracked per flow.
pub const DEFAULT_RETRANSMIT_CAPACITY: usize = 10_000;

/// Default starting retransmit timeout.
pub const DEFAULT_INITIAL_RTO: Duration = Duration::from_millis(200);

/// Default maximum number of retransmits before a flow is failed.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Default maximum time a receiver defers an ACK frame.
pub const DEFAULT_ACK_COALESCE_DELAY: Duration = Duration::from_millis(20);

/// Default maximum out-of-order packets before an immediate ACK.
pub const DEFAULT_ACK_COALESCE_THRESHOLD: u32 = 3;

/// Tunables for a single flow's reliability engine.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityConfig {
    /// Max in-flight packets per flow; inserting above this signals backpressure.
    pub retransmit_capacity: usize,
    /// Starting retransmit timeout per packet.
    pub initial_rto: Duration,
    /// After this many unacked resends, the flow fails.
    pub max_retries: u32,
    /// Maximum time a receiver defers an ACK frame.
    pub ack_coalesce_delay: Duration,
    /// Max out-of-order packets before an immediate ACK.
    pub ack_coalesce_threshold: u32,
    /// Extra wrap-aware slack below `head - 32` before a prune actually
    /// drops an entry, to tolerate ACK-frame reordering on the wire.
    pub prune_grace: u64,
}

impl ReliabilityConfig {
    /// Creates a config with the documented defaults.
    pub fn new() -> Self {
        Self {
            retransmit_capacity: DEFAULT_RETRANSMIT_CAPACITY,
            initial_rto: DEFAULT_INITIAL_RTO,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_coalesce_delay: DEFAULT_ACK_COALESCE_DELAY,
            ack_coalesce_threshold: DEFAULT_ACK_COALESCE_THRESHOLD,
            prune_grace: 0,
        }
    }

    pub fn with_retransmit_capacity(mut self, capacity: usize) -> Self {
        self.retransmit_capacity = capacity;
        self
    }

    pub fn with_initial_rto(mut self, rto: Duration) -> Self {
        self.initial_rto = rto;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_ack_coalesce_delay(mut self, delay: Duration) -> Self {
        self.ack_coalesce_delay = delay;
        self
    }

    pub fn with_ack_coalesce_threshold(mut self, threshold: u32) -> Self {
        self.ack_coalesce_threshold = threshold;
        self
    }

    /// Sets the grace window retained below `head - 32` before an entry is
    /// implicitly pruned, for substrates that can reorder ACK frames.
    pub fn with_prune_grace(mut self, grace: u64) -> Self {
        self.prune_grace = grace;
        self
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self::new()
    }
}
