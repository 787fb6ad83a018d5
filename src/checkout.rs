//! Outbound payment-redirect URL construction.
//!
//! Builds the full URL the payer's browser is sent to: the signed
//! parameter set concatenated onto the gateway's payment page. The
//! secure hash is computed over the exact canonical string that is
//! emitted, so the gateway verifies the same bytes we signed.

use std::collections::BTreeMap;

use crate::canonical::canonical_query;
use crate::config::GatewayConfig;
use crate::errors::{Result, VnpError};
use crate::signature::sign_canonical;
use crate::types::{PaymentRequest, PARAM_SECURE_HASH, VNP_COMMAND_PAY, VNP_VERSION};
use crate::utils::format_vnp_timestamp;

/// Builds the signed redirect URL for a payment request.
///
/// The amount is scaled to the gateway's minor-unit convention
/// (multiplied by 100, no decimal fraction) and the timestamp is
/// serialized as `YYYYMMDDHHmmss`. The resulting URL is
/// `payment_url?canonical_query&vnp_SecureHash=hex`.
///
/// This function has no side effects. Persist the matching PENDING
/// transaction *before* redirecting the payer: the gateway's IPN can
/// arrive before the redirect response finishes, and it must find a
/// record to settle.
///
/// # Errors
///
/// - [`VnpError::ConfigError`] if the merchant code, secret, or URLs are
///   unset: a deployment bug, caught before the gateway silently
///   rejects the request.
/// - [`VnpError::InvalidAmount`] if the amount is not positive, below
///   the configured minimum, or unrepresentable after scaling.
/// - [`VnpError::ValidationError`] if the order info or reference is
///   empty.
///
/// # Examples
///
/// ```
/// use vnpay_rs::checkout::build_payment_url;
/// use vnpay_rs::config::GatewayConfig;
/// use vnpay_rs::types::PaymentRequest;
///
/// let config = GatewayConfig::new(
///     "DEMO0001",
///     "secretsecretsecret",
///     "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
///     "https://merchant.example/payment/vnpay-return",
/// );
/// let request = PaymentRequest::new(5_000_000, "Test", "SUB_1722400000", "203.0.113.7");
///
/// let url = build_payment_url(&config, &request).unwrap();
/// assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
/// assert!(url.contains("vnp_Amount=500000000"));
/// assert!(url.contains("vnp_SecureHash="));
/// ```
pub fn build_payment_url(config: &GatewayConfig, request: &PaymentRequest) -> Result<String> {
    config.validate()?;

    if request.amount <= 0 {
        return Err(VnpError::InvalidAmount(format!(
            "amount must be positive, got {}",
            request.amount
        )));
    }
    if request.amount < config.min_amount {
        return Err(VnpError::InvalidAmount(format!(
            "amount {} is below the gateway minimum of {}",
            request.amount, config.min_amount
        )));
    }
    let wire_amount = request.amount.checked_mul(100).ok_or_else(|| {
        VnpError::InvalidAmount(format!("amount {} overflows wire scaling", request.amount))
    })?;

    if request.order_info.trim().is_empty() {
        return Err(VnpError::ValidationError(
            "order info must not be empty".to_string(),
        ));
    }
    if request.txn_ref.is_empty() {
        return Err(VnpError::ValidationError(
            "transaction reference must not be empty".to_string(),
        ));
    }

    let mut params: BTreeMap<String, String> = BTreeMap::new();
    params.insert("vnp_Version".to_string(), VNP_VERSION.to_string());
    params.insert("vnp_Command".to_string(), VNP_COMMAND_PAY.to_string());
    params.insert("vnp_TmnCode".to_string(), config.tmn_code.clone());
    params.insert(
        "vnp_Locale".to_string(),
        request.locale.clone().unwrap_or_else(|| config.locale.clone()),
    );
    params.insert("vnp_CurrCode".to_string(), config.currency.clone());
    params.insert("vnp_TxnRef".to_string(), request.txn_ref.clone());
    params.insert("vnp_OrderInfo".to_string(), request.order_info.clone());
    params.insert("vnp_OrderType".to_string(), config.order_type.clone());
    params.insert("vnp_Amount".to_string(), wire_amount.to_string());
    params.insert(
        "vnp_ReturnUrl".to_string(),
        request
            .return_url
            .clone()
            .unwrap_or_else(|| config.return_url.clone()),
    );
    params.insert("vnp_IpAddr".to_string(), request.client_ip.clone());
    params.insert(
        "vnp_CreateDate".to_string(),
        format_vnp_timestamp(request.created_at),
    );
    if let Some(bank_code) = &request.bank_code {
        params.insert("vnp_BankCode".to_string(), bank_code.clone());
    }

    let canonical = canonical_query(&params);
    let secure_hash = sign_canonical(&canonical, &config.hash_secret)?;

    Ok(format!(
        "{}?{}&{}={}",
        config.payment_url, canonical, PARAM_SECURE_HASH, secure_hash
    ))
}
