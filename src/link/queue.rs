//! Sliding-window bookkeeping for the link.
//!
//! Tracks outstanding (unacknowledged) outgoing frames, accepted-but-not-
//! yet-acknowledged incoming frames, the next local frame id, and the
//! highest contiguous inbound id this side has acknowledged. The two id
//! counters are independent per direction and are never compared to each
//! other — only a peer's Ack field is compared against our outgoing ids.

use std::collections::VecDeque;

use super::wire::Frame;

/// Once this many sent frames are awaiting acknowledgment, the driver
/// proactively runs a RequestAck exchange.
pub const UNACK_THRESHOLD: usize = 10;

/// Per-session frame bookkeeping. Reset to fresh defaults on re-handshake.
#[derive(Debug, Default)]
pub struct FrameQueue {
    /// Id the next outgoing frame will carry; incremented after each send.
    local_frame_id: u32,
    /// Sent frames not yet acknowledged, oldest first. Ids are strictly
    /// increasing in queue order.
    tx_pending: VecDeque<Frame>,
    /// Accepted inbound frames awaiting ack bookkeeping.
    rx_pending: VecDeque<Frame>,
    /// Highest contiguous inbound id acknowledged so far.
    remote_ackd_frame_id: u32,
    /// Guard against recursively triggering a RequestAck exchange from
    /// within one.
    ack_request_in_flight: bool,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset everything to session-start defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn local_frame_id(&self) -> u32 {
        self.local_frame_id
    }

    pub fn remote_ackd_frame_id(&self) -> u32 {
        self.remote_ackd_frame_id
    }

    pub fn unacked_count(&self) -> usize {
        self.tx_pending.len()
    }

    pub fn ack_request_in_flight(&self) -> bool {
        self.ack_request_in_flight
    }

    pub fn set_ack_request_in_flight(&mut self, in_flight: bool) {
        self.ack_request_in_flight = in_flight;
    }

    /// Record a frame as sent: track it for retransmission and advance the
    /// local id counter.
    pub fn note_sent(&mut self, frame: Frame) {
        debug_assert!(
            self.tx_pending
                .back()
                .map_or(true, |last| last.frame_id < frame.frame_id),
            "tx_pending ids must stay strictly increasing"
        );
        self.tx_pending.push_back(frame);
        self.local_frame_id = self.local_frame_id.wrapping_add(1);
    }

    /// Record an accepted inbound frame for ack bookkeeping.
    pub fn note_received(&mut self, frame: Frame) {
        self.rx_pending.push_back(frame);
    }

    /// Apply a peer Ack: everything up to and including `frame_id` is
    /// considered delivered. Idempotent.
    pub fn ack_up_to(&mut self, frame_id: u32) {
        self.tx_pending.retain(|f| f.frame_id > frame_id);
    }

    /// Unacknowledged frames with `start <= frame_id < end`, queue order.
    pub fn pending_in_range(&self, start: u32, end: u32) -> impl Iterator<Item = &Frame> {
        self.tx_pending
            .iter()
            .filter(move |f| (start..end).contains(&f.frame_id))
    }

    /// Sorted ids of every accepted inbound frame, duplicates included.
    pub fn received_ids_sorted(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.rx_pending.iter().map(|f| f.frame_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Commit a contiguity walk: everything below `frame_id` is
    /// acknowledged and its bookkeeping can be dropped.
    pub fn commit_remote_ack(&mut self, frame_id: u32) {
        self.remote_ackd_frame_id = frame_id;
        self.rx_pending.retain(|f| f.frame_id >= frame_id);
    }
}
