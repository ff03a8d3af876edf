//! Wi-Fi access-point discovery: scan output parsing, deduplication, and
//! the two-pass scan aggregation that runs under the radio lock.

pub mod parser;
pub mod reducer;
pub mod scan;

use serde::{Deserialize, Serialize};

pub use scan::{ScanAggregator, ScanStatus};

/// One access point observed in a radio scan. Immutable once parsed.
///
/// `signal_dbm` is a dBm value: more negative means weaker, so "strongest"
/// is the algebraically greatest value (closest to zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub ssid: String,
    pub signal_dbm: f64,
}

impl AccessPoint {
    pub fn new(ssid: impl Into<String>, signal_dbm: f64) -> Self {
        Self {
            ssid: ssid.into(),
            signal_dbm,
        }
    }

    /// Hidden networks broadcast an empty SSID and are dropped from results.
    pub fn is_hidden(&self) -> bool {
        self.ssid.is_empty()
    }
}
