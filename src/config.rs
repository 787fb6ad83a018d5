//! Gateway configuration.
//!
//! Merchant credentials and gateway endpoints are deployment state: they
//! are read once (typically from the environment), validated eagerly,
//! and shared immutably for the life of the process. A missing merchant
//! code or hash secret is a startup error, never a per-request one.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::{Result, VnpError};
use crate::types::{VNP_CURRENCY, VNP_LOCALE_DEFAULT};

/// Sandbox minimum payment amount in VND. The gateway rejects anything
/// below this, so the URL builder rejects it first.
pub const DEFAULT_MIN_AMOUNT: i64 = 5_000;

/// Configuration for a merchant integration with the gateway.
///
/// # Examples
///
/// ```
/// use vnpay_rs::config::GatewayConfig;
///
/// let config = GatewayConfig::new(
///     "DEMO0001",
///     "secretsecretsecret",
///     "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
///     "https://merchant.example/payment/vnpay-return",
/// );
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Merchant code issued by the gateway (`vnp_TmnCode`)
    pub tmn_code: String,

    /// Shared HMAC-SHA512 secret, known only to this service and the
    /// gateway
    pub hash_secret: SecretString,

    /// Base URL of the gateway's hosted payment page
    pub payment_url: String,

    /// Default URL the payer's browser returns to (`vnp_ReturnUrl`)
    pub return_url: String,

    /// Locale for the hosted payment page
    pub locale: String,

    /// Currency code (`vnp_CurrCode`)
    pub currency: String,

    /// Order category sent as `vnp_OrderType`
    pub order_type: String,

    /// Minimum accepted amount in VND major units
    pub min_amount: i64,

    /// Prefix a transaction reference must carry to settle through this
    /// integration; callbacks referencing anything else are rejected
    pub reference_prefix: String,
}

impl GatewayConfig {
    /// Creates a configuration with sandbox-friendly defaults.
    pub fn new(
        tmn_code: impl Into<String>,
        hash_secret: impl Into<String>,
        payment_url: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            tmn_code: tmn_code.into(),
            hash_secret: SecretString::new(hash_secret.into()),
            payment_url: payment_url.into(),
            return_url: return_url.into(),
            locale: VNP_LOCALE_DEFAULT.to_string(),
            currency: VNP_CURRENCY.to_string(),
            order_type: "other".to_string(),
            min_amount: DEFAULT_MIN_AMOUNT,
            reference_prefix: "SUB_".to_string(),
        }
    }

    /// Creates a configuration from environment variables.
    ///
    /// Reads:
    /// - `VNP_TMN_CODE`
    /// - `VNP_HASH_SECRET`
    /// - `VNP_PAYMENT_URL`
    /// - `VNP_RETURN_URL`
    pub fn from_env() -> Result<Self> {
        fn var(name: &str) -> Result<String> {
            std::env::var(name).map_err(|_| VnpError::ConfigError(format!("{} is not set", name)))
        }

        Ok(Self::new(
            var("VNP_TMN_CODE")?,
            var("VNP_HASH_SECRET")?,
            var("VNP_PAYMENT_URL")?,
            var("VNP_RETURN_URL")?,
        ))
    }

    /// Sets the payment page locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets the order category sent as `vnp_OrderType`.
    pub fn with_order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = order_type.into();
        self
    }

    /// Sets the minimum accepted amount in VND.
    pub fn with_min_amount(mut self, min_amount: i64) -> Self {
        self.min_amount = min_amount;
        self
    }

    /// Sets the required transaction-reference prefix.
    pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = prefix.into();
        self
    }

    /// Validates the configuration at startup.
    ///
    /// Call this once before serving traffic; the per-request paths
    /// assume it passed and do not re-check per call.
    pub fn validate(&self) -> Result<()> {
        if self.tmn_code.is_empty() {
            return Err(VnpError::ConfigError(
                "merchant code must not be empty".to_string(),
            ));
        }
        if self.hash_secret.expose_secret().is_empty() {
            return Err(VnpError::ConfigError(
                "hash secret must not be empty".to_string(),
            ));
        }
        if self.payment_url.is_empty() {
            return Err(VnpError::ConfigError(
                "payment URL must not be empty".to_string(),
            ));
        }
        Url::parse(&self.payment_url)?;
        if self.return_url.is_empty() {
            return Err(VnpError::ConfigError(
                "return URL must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a transaction reference belongs to this integration.
    pub fn matches_reference(&self, txn_ref: &str) -> bool {
        !txn_ref.is_empty() && txn_ref.starts_with(&self.reference_prefix)
    }
}
