//! Inbound callback verification.
//!
//! The gateway calls back twice per payment: a synchronous browser
//! redirect (return path) and an asynchronous server-to-server IPN.
//! Both carry the same query-parameter shape and the same secure hash,
//! so one verifier serves both.
//!
//! Verification is a pure decision: it mutates nothing and never fails
//! on malformed input. The settlement handlers consume the verdict and
//! are the only code allowed to touch storage.

use std::collections::HashMap;

use crate::canonical::canonical_query;
use crate::config::GatewayConfig;
use crate::signature::verify_canonical;
use crate::types::{CallbackFields, PARAM_SECURE_HASH, VNP_CODE_SUCCESS};

/// Outcome of verifying one inbound callback.
///
/// The business fields are extracted whether or not the signature
/// verified; an unauthenticated verdict's fields are safe to log or
/// echo back to the payer but must never drive a state mutation.
#[derive(Debug, Clone)]
pub struct CallbackVerdict {
    /// Whether the secure hash verified against the shared secret
    pub authentic: bool,

    /// Business fields parsed from the raw parameters
    pub fields: CallbackFields,
}

impl CallbackVerdict {
    /// Whether this callback reports a successful payment this
    /// integration should settle.
    ///
    /// Requires all of: an authentic signature, `vnp_ResponseCode` of
    /// "00", `vnp_TransactionStatus` of "00", and a transaction
    /// reference carrying the configured prefix. Any single failing
    /// condition routes to the failure path.
    pub fn is_payment_success(&self, config: &GatewayConfig) -> bool {
        self.authentic
            && self.fields.response_code.as_deref() == Some(VNP_CODE_SUCCESS)
            && self.fields.transaction_status.as_deref() == Some(VNP_CODE_SUCCESS)
            && self
                .fields
                .txn_ref
                .as_deref()
                .is_some_and(|r| config.matches_reference(r))
    }
}

/// Extracts the business fields from a raw callback parameter map.
///
/// Absent or non-numeric values become `None`; nothing here errors.
pub fn extract_fields(params: &HashMap<String, String>) -> CallbackFields {
    let get = |name: &str| params.get(name).cloned().filter(|v| !v.is_empty());

    CallbackFields {
        txn_ref: get("vnp_TxnRef"),
        response_code: get("vnp_ResponseCode"),
        transaction_status: get("vnp_TransactionStatus"),
        amount: params.get("vnp_Amount").and_then(|v| v.parse::<i64>().ok()),
        bank_code: get("vnp_BankCode"),
        card_type: get("vnp_CardType"),
        transaction_no: get("vnp_TransactionNo"),
        pay_date: get("vnp_PayDate"),
        order_info: get("vnp_OrderInfo"),
    }
}

/// Verifies an inbound callback's secure hash and extracts its fields.
///
/// The secure-hash parameters are removed from the set, the remainder
/// is canonicalized exactly as it was at signing time, and the digest
/// is compared in constant time. A missing hash is a verification
/// failure, not an error.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vnpay_rs::callback::verify_callback;
/// use vnpay_rs::config::GatewayConfig;
///
/// let config = GatewayConfig::new(
///     "DEMO0001",
///     "secretsecretsecret",
///     "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
///     "https://merchant.example/payment/vnpay-return",
/// );
///
/// // No vnp_SecureHash at all: unauthentic, but the fields still parse.
/// let mut params = HashMap::new();
/// params.insert("vnp_TxnRef".to_string(), "SUB_42".to_string());
///
/// let verdict = verify_callback(&config, &params);
/// assert!(!verdict.authentic);
/// assert_eq!(verdict.fields.txn_ref.as_deref(), Some("SUB_42"));
/// ```
pub fn verify_callback(config: &GatewayConfig, params: &HashMap<String, String>) -> CallbackVerdict {
    let provided = params
        .get(PARAM_SECURE_HASH)
        .map(String::as_str)
        .unwrap_or_default();

    // canonical_query drops the hash fields itself, so the canonical
    // string here matches what the sender signed.
    let canonical = canonical_query(params);
    let authentic = verify_canonical(&canonical, &config.hash_secret, provided);

    let fields = extract_fields(params);

    if authentic {
        tracing::debug!(
            txn_ref = fields.txn_ref.as_deref().unwrap_or("<none>"),
            response_code = fields.response_code.as_deref().unwrap_or("<none>"),
            "callback signature verified"
        );
    } else {
        tracing::warn!(
            txn_ref = fields.txn_ref.as_deref().unwrap_or("<none>"),
            "callback signature verification failed"
        );
    }

    CallbackVerdict { authentic, fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_canonical;

    fn config() -> GatewayConfig {
        GatewayConfig::new(
            "DEMO0001",
            "secretsecretsecret",
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "https://merchant.example/payment/vnpay-return",
        )
    }

    /// Builds a signed callback parameter map the way the gateway would.
    fn signed_callback(config: &GatewayConfig, overrides: &[(&str, &str)]) -> HashMap<String, String> {
        let mut params: HashMap<String, String> = HashMap::new();
        params.insert("vnp_TmnCode".to_string(), "DEMO0001".to_string());
        params.insert("vnp_TxnRef".to_string(), "SUB_1722400000".to_string());
        params.insert("vnp_Amount".to_string(), "500000000".to_string());
        params.insert("vnp_ResponseCode".to_string(), "00".to_string());
        params.insert("vnp_TransactionStatus".to_string(), "00".to_string());
        params.insert("vnp_BankCode".to_string(), "NCB".to_string());
        params.insert("vnp_CardType".to_string(), "ATM".to_string());
        params.insert("vnp_TransactionNo".to_string(), "14422574".to_string());
        params.insert("vnp_PayDate".to_string(), "20260807153000".to_string());
        for (key, value) in overrides {
            params.insert(key.to_string(), value.to_string());
        }

        let canonical = canonical_query(&params);
        let hash = sign_canonical(&canonical, &config.hash_secret).unwrap();
        params.insert(PARAM_SECURE_HASH.to_string(), hash);
        params
    }

    #[test]
    fn test_valid_callback_is_authentic() {
        let cfg = config();
        let params = signed_callback(&cfg, &[]);

        let verdict = verify_callback(&cfg, &params);
        assert!(verdict.authentic);
        assert!(verdict.is_payment_success(&cfg));
        assert_eq!(verdict.fields.amount, Some(500000000));
        assert_eq!(verdict.fields.bank_code.as_deref(), Some("NCB"));
    }

    #[test]
    fn test_hash_type_parameter_ignored_for_signing() {
        let cfg = config();
        let mut params = signed_callback(&cfg, &[]);
        // Gateways sometimes echo the algorithm name; it is not signed.
        params.insert("vnp_SecureHashType".to_string(), "HmacSHA512".to_string());

        assert!(verify_callback(&cfg, &params).authentic);
    }

    #[test]
    fn test_tampered_value_rejected() {
        let cfg = config();
        let mut params = signed_callback(&cfg, &[]);
        params.insert("vnp_Amount".to_string(), "500000001".to_string());

        let verdict = verify_callback(&cfg, &params);
        assert!(!verdict.authentic);
        assert!(!verdict.is_payment_success(&cfg));
        // Fields still extracted for logging.
        assert_eq!(verdict.fields.amount, Some(500000001));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let cfg = config();
        let mut params = signed_callback(&cfg, &[]);
        let hash = params.get(PARAM_SECURE_HASH).unwrap().clone();
        let flipped = if hash.starts_with('0') {
            format!("1{}", &hash[1..])
        } else {
            format!("0{}", &hash[1..])
        };
        params.insert(PARAM_SECURE_HASH.to_string(), flipped);

        assert!(!verify_callback(&cfg, &params).authentic);
    }

    #[test]
    fn test_missing_hash_is_unauthentic_not_error() {
        let cfg = config();
        let mut params = signed_callback(&cfg, &[]);
        params.remove(PARAM_SECURE_HASH);

        let verdict = verify_callback(&cfg, &params);
        assert!(!verdict.authentic);
        assert_eq!(verdict.fields.txn_ref.as_deref(), Some("SUB_1722400000"));
    }

    #[test]
    fn test_failure_code_is_not_success() {
        let cfg = config();
        let params = signed_callback(&cfg, &[("vnp_ResponseCode", "07")]);

        let verdict = verify_callback(&cfg, &params);
        assert!(verdict.authentic);
        assert!(!verdict.is_payment_success(&cfg));
    }

    #[test]
    fn test_status_mismatch_is_not_success() {
        let cfg = config();
        let params = signed_callback(&cfg, &[("vnp_TransactionStatus", "02")]);

        let verdict = verify_callback(&cfg, &params);
        assert!(verdict.authentic);
        assert!(!verdict.is_payment_success(&cfg));
    }

    #[test]
    fn test_foreign_reference_is_not_success() {
        let cfg = config();
        let params = signed_callback(&cfg, &[("vnp_TxnRef", "ORDER_999")]);

        let verdict = verify_callback(&cfg, &params);
        // Signature is valid, but the reference belongs elsewhere.
        assert!(verdict.authentic);
        assert!(!verdict.is_payment_success(&cfg));
    }

    #[test]
    fn test_extract_fields_tolerates_garbage() {
        let mut params = HashMap::new();
        params.insert("vnp_Amount".to_string(), "not-a-number".to_string());
        params.insert("vnp_TxnRef".to_string(), String::new());

        let fields = extract_fields(&params);
        assert_eq!(fields.amount, None);
        assert_eq!(fields.txn_ref, None);
    }
}
