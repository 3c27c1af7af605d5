//! Long-lived device state for one survey session.

use std::collections::HashMap;
use std::mem;

use log::debug;

use crate::link::wire::{Bssid, NetworkId, Position, Record, Ssid, StepSize};
use crate::ports::MotionPort;

use super::sweep::Direction;

/// Negotiated position and step configuration, the network registries,
/// and everything queued for the next record transmission. Reset to
/// fresh defaults on re-handshake.
#[derive(Debug, Default)]
pub struct SurveyState {
    position: Position,
    step_size: StepSize,
    measurements_per_step: u8,
    /// True once the first physical calibration move has been performed.
    known_position: bool,
    /// Gates the main control loop; cleared by EndOfTransmission in
    /// either direction.
    active_connection: bool,

    /// SSID name → receiver-assigned handle, first-seen-wins.
    ssid_table: HashMap<Ssid, NetworkId>,
    /// BSSID → the SSID it was first sighted under.
    bssid_table: HashMap<Bssid, Ssid>,
    /// Most recently assigned handle; handles start at 1 and are never
    /// reused within a session.
    last_network_id: u32,

    pending_ssids: Vec<Ssid>,
    pending_bssids: Vec<Bssid>,
    pending_records: Vec<Record>,

    pub(crate) direction: Direction,
}

impl SurveyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to session-start defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn step_size(&self) -> StepSize {
        self.step_size
    }

    pub fn measurements_per_step(&self) -> u8 {
        self.measurements_per_step
    }

    pub fn known_position(&self) -> bool {
        self.known_position
    }

    pub fn is_active(&self) -> bool {
        self.active_connection
    }

    pub fn set_active(&mut self, active: bool) {
        self.active_connection = active;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn direction_mut(&mut self) -> &mut Direction {
        &mut self.direction
    }

    // ── Network registries ────────────────────────────────────

    /// Handle for `ssid`, assigning (and queueing an announcement for) a
    /// fresh one on first sight.
    pub fn register_ssid(&mut self, ssid: &Ssid) -> NetworkId {
        if let Some(id) = self.ssid_table.get(ssid) {
            return *id;
        }

        self.last_network_id += 1;
        let id = NetworkId::new(self.last_network_id);
        self.ssid_table.insert(ssid.clone(), id);
        self.pending_ssids.push(ssid.clone());
        debug!("new ssid '{ssid}' -> {id}");
        id
    }

    /// Associate `bssid` with the SSID it was sighted under. No-op when
    /// the address is already known.
    pub fn register_bssid(&mut self, bssid: Bssid, ssid: &Ssid) {
        if self.bssid_table.contains_key(&bssid) {
            return;
        }
        self.bssid_table.insert(bssid, ssid.clone());
        self.pending_bssids.push(bssid);
        debug!("new bssid {bssid} -> '{ssid}'");
    }

    pub fn network_id_of(&self, ssid: &Ssid) -> Option<NetworkId> {
        self.ssid_table.get(ssid).copied()
    }

    /// Network handle for a BSSID, through its associated SSID.
    pub fn resolve_bssid_network(&self, bssid: &Bssid) -> Option<NetworkId> {
        let ssid = self.bssid_table.get(bssid)?;
        self.ssid_table.get(ssid).copied()
    }

    pub fn ssid_count(&self) -> usize {
        self.ssid_table.len()
    }

    pub fn bssid_count(&self) -> usize {
        self.bssid_table.len()
    }

    // ── Pending-transmission queues ───────────────────────────

    pub fn push_record(&mut self, record: Record) {
        self.pending_records.push(record);
    }

    pub fn pending_record_count(&self) -> usize {
        self.pending_records.len()
    }

    pub fn take_pending_ssids(&mut self) -> Vec<Ssid> {
        mem::take(&mut self.pending_ssids)
    }

    pub fn take_pending_bssids(&mut self) -> Vec<Bssid> {
        mem::take(&mut self.pending_bssids)
    }

    pub fn take_pending_records(&mut self) -> Vec<Record> {
        mem::take(&mut self.pending_records)
    }

    // ── Position mutation ─────────────────────────────────────

    /// Apply a SetParams: store the new configuration, then dispatch the
    /// position change to the motion port.
    pub fn apply_params(
        &mut self,
        position: Position,
        step_size: StepSize,
        measurements_per_step: u8,
        motion: &mut impl MotionPort,
    ) {
        let (old_pitch, old_yaw) = (self.position.pitch, self.position.yaw);
        self.position = position;
        self.step_size = step_size;
        self.measurements_per_step = measurements_per_step;
        debug!(
            "params applied: pitch_step={} yaw_step={} measurements/step={}",
            step_size.pitch_step, step_size.yaw_step, measurements_per_step
        );
        self.dispatch_position_change(old_pitch, old_yaw, motion);
    }

    /// Move to a new raw position, dispatching the change to the motion
    /// port.
    pub fn set_position(&mut self, pitch: u32, yaw: u32, motion: &mut impl MotionPort) {
        let (old_pitch, old_yaw) = (self.position.pitch, self.position.yaw);
        self.position = Position::new(pitch, yaw);
        self.dispatch_position_change(old_pitch, old_yaw, motion);
    }

    fn dispatch_position_change(
        &mut self,
        old_pitch: u32,
        old_yaw: u32,
        motion: &mut impl MotionPort,
    ) {
        motion.on_position_change(self, old_pitch, old_yaw);
        // The first dispatched move doubles as the physical calibration.
        self.known_position = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NullMotion;

    /// Motion recorder: captures every dispatch for inspection.
    pub(crate) struct RecordingMotion {
        pub calls: Vec<(u32, u32, u32, u32, bool)>,
    }

    impl RecordingMotion {
        pub fn new() -> Self {
            Self { calls: Vec::new() }
        }
    }

    impl MotionPort for RecordingMotion {
        fn on_position_change(&mut self, state: &SurveyState, old_pitch: u32, old_yaw: u32) {
            self.calls.push((
                old_pitch,
                old_yaw,
                state.position().pitch,
                state.position().yaw,
                state.known_position(),
            ));
        }
    }

    #[test]
    fn ssid_registration_deduplicates() {
        let mut state = SurveyState::new();
        let lab = Ssid::new("lab").unwrap();

        let first = state.register_ssid(&lab);
        let second = state.register_ssid(&lab);
        assert_eq!(first, second);
        assert_eq!(first.value(), 1);
        assert_eq!(state.take_pending_ssids().len(), 1);

        // A different name gets the next handle.
        let guest = Ssid::new("guest").unwrap();
        assert_eq!(state.register_ssid(&guest).value(), 2);
    }

    #[test]
    fn bssid_registration_is_first_seen_wins() {
        let mut state = SurveyState::new();
        let lab = Ssid::new("lab").unwrap();
        let guest = Ssid::new("guest").unwrap();
        let addr = Bssid::new([1, 2, 3, 4, 5, 6]);

        state.register_ssid(&lab);
        state.register_bssid(addr, &lab);
        state.register_bssid(addr, &guest);

        assert_eq!(state.take_pending_bssids(), vec![addr]);
        assert_eq!(
            state.resolve_bssid_network(&addr),
            state.network_id_of(&lab)
        );
    }

    #[test]
    fn resolve_unknown_bssid_is_none() {
        let state = SurveyState::new();
        assert!(state
            .resolve_bssid_network(&Bssid::new([0; 6]))
            .is_none());
    }

    #[test]
    fn set_position_dispatches_with_old_values() {
        let mut state = SurveyState::new();
        let mut motion = RecordingMotion::new();

        state.set_position(100, 200, &mut motion);
        state.set_position(300, 400, &mut motion);

        assert_eq!(
            motion.calls,
            vec![
                // First move: position not yet calibrated.
                (0, 0, 100, 200, false),
                (100, 200, 300, 400, true),
            ]
        );
        assert!(state.known_position());
    }

    #[test]
    fn apply_params_stores_configuration_and_dispatches() {
        let mut state = SurveyState::new();
        let mut motion = RecordingMotion::new();

        state.apply_params(
            Position::new(10, 20),
            StepSize::new(5, 7),
            3,
            &mut motion,
        );

        assert_eq!(state.position(), Position::new(10, 20));
        assert_eq!(state.step_size(), StepSize::new(5, 7));
        assert_eq!(state.measurements_per_step(), 3);
        assert_eq!(motion.calls.len(), 1);
        assert_eq!(motion.calls[0], (0, 0, 10, 20, false));
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = SurveyState::new();
        let lab = Ssid::new("lab").unwrap();
        state.register_ssid(&lab);
        state.set_position(1, 2, &mut NullMotion);
        state.set_active(true);

        state.reset();
        assert_eq!(state.position(), Position::default());
        assert!(!state.known_position());
        assert!(!state.is_active());
        assert_eq!(state.ssid_count(), 0);
        // Handles restart from 1 in the new session.
        assert_eq!(state.register_ssid(&lab).value(), 1);
    }
}
