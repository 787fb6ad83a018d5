//! HMAC-SHA512 signing and verification of canonical strings.
//!
//! The digest is a pure function of (canonical string, shared secret).
//! Verification is constant-time and total: malformed or missing
//! signatures degrade to "not authentic" rather than an error, so
//! attacker-controlled input cannot probe for oracles.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::errors::{Result, VnpError};

type HmacSha512 = Hmac<Sha512>;

fn compute_digest(canonical: &str, secret: &SecretString) -> Result<Vec<u8>> {
    let key = secret.expose_secret();
    if key.is_empty() {
        // A missing secret is a deployment bug; GatewayConfig::validate
        // rejects it at startup so requests never reach this branch.
        return Err(VnpError::ConfigError(
            "hash secret must not be empty".to_string(),
        ));
    }

    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .map_err(|_| VnpError::ConfigError("hash secret rejected by HMAC".to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Computes the lowercase hex HMAC-SHA512 digest of a canonical string.
///
/// Fails only on an empty secret, which is a configuration error rather
/// than a per-request condition.
///
/// # Examples
///
/// ```
/// use secrecy::SecretString;
/// use vnpay_rs::signature::sign_canonical;
///
/// let secret = SecretString::new("abc".to_string());
/// let digest = sign_canonical("vnp_Amount=500000000&vnp_TxnRef=SUB_1", &secret).unwrap();
///
/// assert_eq!(digest.len(), 128); // SHA-512 digest as hex
/// assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn sign_canonical(canonical: &str, secret: &SecretString) -> Result<String> {
    compute_digest(canonical, secret).map(hex::encode)
}

/// Checks a provided hex signature against the recomputed digest.
///
/// Returns `false`, never an error, for missing, malformed, or
/// mismatched signatures. The comparison runs in constant time, so
/// response timing leaks no byte-position information.
///
/// # Examples
///
/// ```
/// use secrecy::SecretString;
/// use vnpay_rs::signature::{sign_canonical, verify_canonical};
///
/// let secret = SecretString::new("abc".to_string());
/// let digest = sign_canonical("vnp_TxnRef=SUB_1", &secret).unwrap();
///
/// assert!(verify_canonical("vnp_TxnRef=SUB_1", &secret, &digest));
/// assert!(!verify_canonical("vnp_TxnRef=SUB_2", &secret, &digest));
/// assert!(!verify_canonical("vnp_TxnRef=SUB_1", &secret, "not hex"));
/// ```
pub fn verify_canonical(canonical: &str, secret: &SecretString, provided_hex: &str) -> bool {
    let expected = match compute_digest(canonical, secret) {
        Ok(digest) => digest,
        Err(_) => return false,
    };

    let provided = match hex::decode(provided_hex.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    expected.as_slice().ct_eq(provided.as_slice()).into()
}
