//! Per-flow reliability engine for a reliable-transport multiplexer.
//!
//! Tracks which packets a peer has received (via a sliding-window SACK
//! bitmap), holds unacknowledged outbound packets for retransmission, and
//! codes the 12-byte ACK frame the two sides exchange. Sequence numbers live
//! in a 64-bit space and wrap; every comparison in this crate goes through
//! [`sequence::precedes`] rather than a direct unsigned `<`.
//!
//! Each flow owns one [`engine::ReliabilityEngine`]; nothing here is shared
//! or locked across flows.

pub mod ack_bitmap;
pub mod ack_frame;
pub mod config;
pub mod engine;
pub mod error;
pub mod retransmit;
pub mod sequence;
pub mod stats;

pub use ack_bitmap::AckBitmap;
pub use ack_frame::AckFrame;
pub use config::ReliabilityConfig;
pub use engine::ReliabilityEngine;
pub use error::{Error, Result};
pub use retransmit::{PendingPacket, RetransmitBuffer};
pub use stats::EngineStats;
