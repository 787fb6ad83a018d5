//! Utility functions for gateway operations.
//!
//! Helpers for the gateway's timestamp format, raw query-string
//! parsing, and transaction-reference generation.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats a timestamp in the gateway's `YYYYMMDDHHmmss` convention.
///
/// Used for `vnp_CreateDate` on outbound requests; the value is part of
/// the signed parameter set.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vnpay_rs::utils::format_vnp_timestamp;
///
/// let t = Utc.with_ymd_and_hms(2026, 8, 7, 15, 30, 0).unwrap();
/// assert_eq!(format_vnp_timestamp(t), "20260807153000");
/// ```
pub fn format_vnp_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d%H%M%S").to_string()
}

/// Parses a gateway `YYYYMMDDHHmmss` timestamp such as `vnp_PayDate`.
///
/// Returns `None` for anything that does not parse; callback timestamps
/// are attacker-influenced, so this never errors.
///
/// # Examples
///
/// ```
/// use vnpay_rs::utils::{format_vnp_timestamp, parse_vnp_timestamp};
///
/// let parsed = parse_vnp_timestamp("20260807153000").unwrap();
/// assert_eq!(format_vnp_timestamp(parsed), "20260807153000");
///
/// assert!(parse_vnp_timestamp("not-a-date").is_none());
/// ```
pub fn parse_vnp_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a raw query string into a parameter map.
///
/// Form-urlencoding is reversed (`+` becomes a space, percent-escapes
/// decode); duplicate keys keep the last occurrence, matching how the
/// gateway serializes callbacks.
///
/// # Examples
///
/// ```
/// use vnpay_rs::utils::parse_query;
///
/// let params = parse_query("vnp_TxnRef=SUB_42&vnp_OrderInfo=Thanh+toan");
/// assert_eq!(params.get("vnp_TxnRef").unwrap(), "SUB_42");
/// assert_eq!(params.get("vnp_OrderInfo").unwrap(), "Thanh toan");
/// ```
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Generates a unique transaction reference with the given prefix.
///
/// The reference is `prefix` + a second-resolution timestamp + a random
/// suffix, which keeps it unique across concurrent requests while
/// staying short enough for the gateway's reference field.
///
/// # Examples
///
/// ```
/// use vnpay_rs::utils::generate_txn_ref;
///
/// let reference = generate_txn_ref("SUB_");
/// assert!(reference.starts_with("SUB_"));
/// assert!(reference.len() > "SUB_".len());
/// ```
pub fn generate_txn_ref(prefix: &str) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let suffix: u32 = rng.gen_range(0..10_000);
    format!(
        "{}{}{:04}",
        prefix,
        Utc::now().format("%y%m%d%H%M%S"),
        suffix
    )
}
