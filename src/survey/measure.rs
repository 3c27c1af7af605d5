//! Per-step RSSI measurement — turns radio scans into pending records.

use std::collections::HashMap;

use log::{debug, info};

use crate::link::wire::{Bssid, Record, Rssi};
use crate::ports::ScanSource;

use super::state::SurveyState;

/// Run the configured number of scan passes, averaging each access
/// point's strength across them, and queue one record per access point
/// for the next transmission. New SSIDs and BSSIDs are registered (and
/// thereby queued for announcement) as a side effect.
pub fn measure_rssi(state: &mut SurveyState, scanner: &mut impl ScanSource) {
    let passes = state.measurements_per_step();
    if passes == 0 {
        return;
    }
    let weight = 1.0 / f64::from(passes);

    let mut averaged: HashMap<Bssid, f64> = HashMap::new();
    for _ in 0..passes {
        for entry in scanner.scan() {
            debug!(
                "scanned ssid='{}' bssid={} rssi={}",
                entry.ssid, entry.bssid, entry.rssi_dbm
            );
            state.register_bssid(entry.bssid, &entry.ssid);
            state.register_ssid(&entry.ssid);
            *averaged.entry(entry.bssid).or_insert(0.0) += f64::from(entry.rssi_dbm) * weight;
        }
    }

    info!(
        "scan pass complete: {} ssids / {} bssids known, {} sightings this step",
        state.ssid_count(),
        state.bssid_count(),
        averaged.len()
    );

    for (bssid, level) in averaged {
        let Some(id) = state.resolve_bssid_network(&bssid) else {
            continue;
        };
        let level = level.trunc();
        let Ok(rssi) = Rssi::new(level as i8) else {
            // Off-scale readings (below -127 dBm) are dropped, not clamped.
            debug!("dropping off-scale sample for {bssid}: {level} dBm");
            continue;
        };
        state.push_record(Record::new(id, rssi));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::wire::{Position, Ssid, StepSize};
    use crate::ports::{NullMotion, ScanEntry};

    struct FixedScan {
        passes: Vec<Vec<ScanEntry>>,
    }

    impl ScanSource for FixedScan {
        fn scan(&mut self) -> Vec<ScanEntry> {
            if self.passes.is_empty() {
                Vec::new()
            } else {
                self.passes.remove(0)
            }
        }
    }

    fn entry(name: &str, addr: [u8; 6], rssi_dbm: i32) -> ScanEntry {
        ScanEntry {
            ssid: Ssid::new(name).unwrap(),
            bssid: Bssid::new(addr),
            rssi_dbm,
        }
    }

    fn configured_state(passes: u8) -> SurveyState {
        let mut state = SurveyState::new();
        state.apply_params(
            Position::default(),
            StepSize::default(),
            passes,
            &mut NullMotion,
        );
        state
    }

    #[test]
    fn averages_across_passes() {
        let mut state = configured_state(2);
        let addr = [1, 2, 3, 4, 5, 6];
        let mut scanner = FixedScan {
            passes: vec![
                vec![entry("lab", addr, -80)],
                vec![entry("lab", addr, -90)],
            ],
        };

        measure_rssi(&mut state, &mut scanner);

        let records = state.take_pending_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rssi.dbm(), -85);
        assert_eq!(records[0].id, state.network_id_of(&Ssid::new("lab").unwrap()).unwrap());
    }

    #[test]
    fn registers_new_networks_once() {
        let mut state = configured_state(2);
        let addr = [1, 2, 3, 4, 5, 6];
        let mut scanner = FixedScan {
            passes: vec![
                vec![entry("lab", addr, -40)],
                vec![entry("lab", addr, -40)],
            ],
        };

        measure_rssi(&mut state, &mut scanner);

        assert_eq!(state.take_pending_ssids().len(), 1);
        assert_eq!(state.take_pending_bssids().len(), 1);
    }

    #[test]
    fn off_scale_readings_are_dropped() {
        let mut state = configured_state(1);
        let mut scanner = FixedScan {
            passes: vec![vec![
                entry("faint", [9, 9, 9, 9, 9, 9], -150),
                entry("fine", [1, 1, 1, 1, 1, 1], -60),
            ]],
        };

        measure_rssi(&mut state, &mut scanner);

        let records = state.take_pending_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rssi.dbm(), -60);
    }

    #[test]
    fn zero_passes_measures_nothing() {
        let mut state = configured_state(0);
        let mut scanner = FixedScan {
            passes: vec![vec![entry("lab", [1; 6], -50)]],
        };

        measure_rssi(&mut state, &mut scanner);
        assert_eq!(state.pending_record_count(), 0);
        assert_eq!(state.ssid_count(), 0);
    }

    #[test]
    fn distinct_access_points_get_distinct_records() {
        let mut state = configured_state(1);
        let mut scanner = FixedScan {
            passes: vec![vec![
                entry("lab", [1; 6], -50),
                entry("lab", [2; 6], -70),
                entry("guest", [3; 6], -60),
            ]],
        };

        measure_rssi(&mut state, &mut scanner);

        let records = state.take_pending_records();
        assert_eq!(records.len(), 3);
        // Two of the three share the same network handle.
        let lab_id = state.network_id_of(&Ssid::new("lab").unwrap()).unwrap();
        assert_eq!(records.iter().filter(|r| r.id == lab_id).count(), 2);
    }
}
