//! WiFi scan source (ESP-IDF only).
//!
//! The radio is used purely as a receiver here — the survey head never
//! associates with any of the networks it measures.

use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::warn;

use crate::link::wire::{Bssid, Ssid};
use crate::ports::{ScanEntry, ScanSource};

pub struct EspScanSource<'d> {
    wifi: BlockingWifi<EspWifi<'d>>,
}

impl<'d> EspScanSource<'d> {
    pub fn new(wifi: BlockingWifi<EspWifi<'d>>) -> Self {
        Self { wifi }
    }
}

impl ScanSource for EspScanSource<'_> {
    fn scan(&mut self) -> Vec<ScanEntry> {
        match self.wifi.scan() {
            Ok(aps) => aps
                .into_iter()
                .filter_map(|ap| {
                    let ssid = Ssid::new(ap.ssid.as_str()).ok()?;
                    Some(ScanEntry {
                        ssid,
                        bssid: Bssid::new(ap.bssid),
                        rssi_dbm: i32::from(ap.signal_strength),
                    })
                })
                .collect(),
            Err(e) => {
                // A failed pass records nothing; the next cycle rescans.
                warn!("wifi scan failed: {e}");
                Vec::new()
            }
        }
    }
}
