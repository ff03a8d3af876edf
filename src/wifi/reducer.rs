//! Deduplication of scanned access points.
//!
//! A scan sees every BSS; an SSID broadcast from several radios shows up
//! once per radio. Callers want one row per network, so we keep the
//! strongest observation per SSID (greatest dBm, i.e. closest to zero) and
//! drop hidden networks entirely.

use std::collections::{HashMap, HashSet};

use super::AccessPoint;

/// Reduce a sequence of records to at most one per distinct non-empty SSID.
///
/// Per SSID the record with the algebraically greatest `signal_dbm` wins;
/// on an exact tie the first occurrence is kept. Output order follows first
/// appearance in the input, so the function is deterministic and idempotent.
pub fn reduce(records: Vec<AccessPoint>) -> Vec<AccessPoint> {
    let mut strongest: HashMap<String, f64> = HashMap::new();
    for ap in &records {
        strongest
            .entry(ap.ssid.clone())
            .and_modify(|best| {
                if ap.signal_dbm > *best {
                    *best = ap.signal_dbm;
                }
            })
            .or_insert(ap.signal_dbm);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut reduced = Vec::new();
    for ap in records {
        if ap.is_hidden() {
            continue;
        }
        let best = strongest.get(ap.ssid.as_str()).copied();
        if best == Some(ap.signal_dbm) && seen.insert(ap.ssid.clone()) {
            reduced.push(ap);
        }
    }
    reduced
}
