//! MAC address canonicalization
//!
//! Vehicle MACs arrive as raw hex (`0x1a2b3c...`), dashed, dotted or already
//! colon-separated. The canonical form is uppercase colon-separated pairs.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_HEX: Lazy<Regex> = Lazy::new(|| Regex::new("[^0-9A-F]").expect("static regex"));

/// Canonical `AA:BB:CC...` form of a MAC address
///
/// Input that already contains `:` is only trimmed and uppercased. Otherwise
/// a leading `0X` marker and every non-hex character are stripped and the
/// digits regrouped in pairs; a trailing odd digit is dropped.
///
/// ```
/// use chargeboard_core::analytics::canonicalize_mac;
///
/// assert_eq!(canonicalize_mac("0x1a2b3c4d5e6f"), "1A:2B:3C:4D:5E:6F");
/// assert_eq!(canonicalize_mac("aa-bb-cc"), "AA:BB:CC");
/// assert_eq!(canonicalize_mac(" aa:bb "), "AA:BB");
/// assert_eq!(canonicalize_mac(""), "");
/// ```
pub fn canonicalize_mac(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return String::new();
    }
    if upper.contains(':') {
        return upper;
    }

    let without_marker = upper.strip_prefix("0X").unwrap_or(&upper);
    let hex = NON_HEX.replace_all(without_marker, "");

    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
