//! Canonical parameter encoding.
//!
//! Both the outbound URL builder and the inbound callback verifier feed
//! the exact same canonical string to the HMAC; a divergent
//! reimplementation on either side is the classic source of signature
//! mismatches, so the encoding lives here and nowhere else.
//!
//! The rules match the gateway's reference integrations:
//! signature fields are stripped, keys and values are
//! `application/x-www-form-urlencoded`-serialized (spaces become `+`,
//! not `%20`), pairs are sorted by encoded key bytes, and joined with
//! `&`.

use std::collections::BTreeMap;

use crate::types::{PARAM_SECURE_HASH, PARAM_SECURE_HASH_TYPE};

/// Encodes a single key or value for the canonical string.
///
/// Uses form-urlencoding, so a space serializes as `+` while reserved
/// characters percent-encode as usual.
///
/// # Examples
///
/// ```
/// use vnpay_rs::canonical::encode_component;
///
/// assert_eq!(encode_component("Thanh toan don hang"), "Thanh+toan+don+hang");
/// assert_eq!(encode_component("a&b=c"), "a%26b%3Dc");
/// ```
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Produces the canonical query string for a parameter set.
///
/// The secure-hash parameters are excluded, every remaining key and
/// value is encoded with [`encode_component`], pairs are sorted by
/// encoded key in ascending byte order, and the result is joined as
/// `k1=v1&k2=v2` with no trailing separator. Empty values are kept as
/// `key=`; an empty set produces an empty string, which is still a
/// valid HMAC input.
///
/// Deterministic and pure: the same logical parameter set always yields
/// the same bytes regardless of insertion order.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vnpay_rs::canonical::canonical_query;
///
/// let mut params = HashMap::new();
/// params.insert("vnp_TxnRef", "SUB_42");
/// params.insert("vnp_Amount", "1000000");
/// params.insert("vnp_SecureHash", "deadbeef");
///
/// assert_eq!(canonical_query(&params), "vnp_Amount=1000000&vnp_TxnRef=SUB_42");
/// ```
pub fn canonical_query<K, V, I>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .filter(|(k, _)| {
            let k = k.as_ref();
            k != PARAM_SECURE_HASH && k != PARAM_SECURE_HASH_TYPE
        })
        .map(|(k, v)| (encode_component(k.as_ref()), encode_component(v.as_ref())))
        .collect();

    let mut query = String::new();
    for (key, value) in &sorted {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(key);
        query.push('=');
        query.push_str(value);
    }
    query
}
