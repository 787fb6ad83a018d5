//! Core type definitions for the gateway protocol.
//!
//! This module contains the data structures exchanged with the payment
//! gateway (outbound request parameters, parsed callback fields, IPN
//! acknowledgments) and the persisted transaction record mutated by the
//! settlement state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gateway API version sent as `vnp_Version`.
pub const VNP_VERSION: &str = "2.1.0";

/// Command sent as `vnp_Command` for payment-redirect requests.
pub const VNP_COMMAND_PAY: &str = "pay";

/// Currency code sent as `vnp_CurrCode`. Amounts are VND with no
/// fractional unit; the wire value is the amount multiplied by 100.
pub const VNP_CURRENCY: &str = "VND";

/// Default locale for the hosted payment page.
pub const VNP_LOCALE_DEFAULT: &str = "vn";

/// Response/transaction-status code denoting success on both
/// `vnp_ResponseCode` and `vnp_TransactionStatus`.
pub const VNP_CODE_SUCCESS: &str = "00";

/// Parameter carrying the HMAC-SHA512 digest. Never part of the signed
/// canonical string.
pub const PARAM_SECURE_HASH: &str = "vnp_SecureHash";

/// Optional parameter naming the digest algorithm. Excluded from the
/// canonical string alongside [`PARAM_SECURE_HASH`].
pub const PARAM_SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Parameters for one outbound payment-redirect request.
///
/// The request is ephemeral: it parameterizes
/// [`crate::checkout::build_payment_url`] and is not persisted itself.
/// The caller persists the matching PENDING [`Transaction`] before
/// redirecting the payer.
///
/// # Examples
///
/// ```
/// use vnpay_rs::types::PaymentRequest;
///
/// let request = PaymentRequest::new(5_000_000, "EV charging subscription", "SUB_1722400000", "203.0.113.7")
///     .with_bank_code("NCB");
///
/// assert_eq!(request.amount, 5_000_000);
/// assert_eq!(request.bank_code.as_deref(), Some("NCB"));
/// ```
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Amount in VND major units (scaled by 100 on the wire)
    pub amount: i64,

    /// Free-text order description sent as `vnp_OrderInfo`
    pub order_info: String,

    /// Merchant-generated unique reference correlating this request with
    /// its eventual callbacks, sent as `vnp_TxnRef`
    pub txn_ref: String,

    /// Payer's IP address sent as `vnp_IpAddr`
    pub client_ip: String,

    /// Creation timestamp; formatted as `YYYYMMDDHHmmss` for
    /// `vnp_CreateDate` and part of the signed parameter set
    pub created_at: DateTime<Utc>,

    /// Optional bank preselection sent as `vnp_BankCode`
    pub bank_code: Option<String>,

    /// Optional locale override for the hosted payment page
    pub locale: Option<String>,

    /// Optional per-request return URL overriding the configured one
    pub return_url: Option<String>,
}

impl PaymentRequest {
    /// Creates a payment request stamped with the current time.
    pub fn new(
        amount: i64,
        order_info: impl Into<String>,
        txn_ref: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            order_info: order_info.into(),
            txn_ref: txn_ref.into(),
            client_ip: client_ip.into(),
            created_at: Utc::now(),
            bank_code: None,
            locale: None,
            return_url: None,
        }
    }

    /// Preselects a bank on the gateway's payment page.
    pub fn with_bank_code(mut self, bank_code: impl Into<String>) -> Self {
        self.bank_code = Some(bank_code.into());
        self
    }

    /// Overrides the payment page locale for this request.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Overrides the configured return URL for this request.
    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = Some(return_url.into());
        self
    }

    /// Pins the creation timestamp (the default is `Utc::now()`).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Business fields extracted from an inbound callback.
///
/// Extraction succeeds whether or not the signature verifies; callers
/// must never mutate state from unauthenticated fields. The settlement
/// handlers are the only mutation path and check authenticity first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFields {
    /// `vnp_TxnRef`: the merchant reference this callback settles
    pub txn_ref: Option<String>,

    /// `vnp_ResponseCode`, "00" on success
    pub response_code: Option<String>,

    /// `vnp_TransactionStatus`, "00" on success
    pub transaction_status: Option<String>,

    /// `vnp_Amount`: wire amount (VND x 100), if present and numeric
    pub amount: Option<i64>,

    /// `vnp_BankCode`: bank the payer settled through
    pub bank_code: Option<String>,

    /// `vnp_CardType`: payment method reported by the gateway
    pub card_type: Option<String>,

    /// `vnp_TransactionNo`: gateway-side transaction number
    pub transaction_no: Option<String>,

    /// `vnp_PayDate`: gateway settlement timestamp, `YYYYMMDDHHmmss`
    pub pay_date: Option<String>,

    /// `vnp_OrderInfo`: echoed order description
    pub order_info: Option<String>,
}

/// Lifecycle state of a persisted transaction.
///
/// `Pending` is the only state the settlement handlers transition out
/// of; the other three are terminal under this protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Created at request-build time, awaiting a gateway callback
    Pending,
    /// Verified success for an entitlement-style reference (e.g. a
    /// subscription now active)
    Active,
    /// Verified success for a one-off order
    Paid,
    /// Verified failure, or an unverifiable return-path callback
    Failed,
}

impl TransactionStatus {
    /// Returns true once no further callback may change the state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Persisted transaction record, owned by the storage collaborator.
///
/// Mutated only through the settlement handlers' verified-callback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Storage-assigned identifier
    pub id: String,

    /// Merchant reference matching [`PaymentRequest::txn_ref`]
    pub txn_ref: String,

    /// Amount in VND major units
    pub amount: i64,

    /// Current lifecycle state
    pub status: TransactionStatus,

    /// Payment method recorded on settlement (gateway card type)
    pub payment_method: Option<String>,

    /// Bank the payer settled through
    pub bank_code: Option<String>,

    /// When the PENDING record was created
    pub created_at: DateTime<Utc>,

    /// When a terminal state was reached
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields recorded alongside a status transition out of `Pending`.
#[derive(Debug, Clone, Default)]
pub struct CompletionFields {
    /// Payment method reported by the gateway (`vnp_CardType`)
    pub payment_method: Option<String>,

    /// Bank code reported by the gateway (`vnp_BankCode`)
    pub bank_code: Option<String>,

    /// Gateway-side transaction number (`vnp_TransactionNo`)
    pub gateway_txn_no: Option<String>,

    /// Completion timestamp
    pub completed_at: Option<DateTime<Utc>>,
}

/// Acknowledgment body returned to the gateway from the IPN endpoint.
///
/// The gateway retries an IPN until it receives `RspCode` "00" or a
/// recognized rejection, so handlers always produce one of these even
/// when no state was mutated.
///
/// # Examples
///
/// ```
/// use vnpay_rs::types::IpnResponse;
///
/// let ack = IpnResponse::confirm_success();
/// let json = serde_json::to_string(&ack).unwrap();
/// assert_eq!(json, r#"{"RspCode":"00","Message":"Confirm Success"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnResponse {
    /// Two-digit acknowledgment code
    #[serde(rename = "RspCode")]
    pub rsp_code: String,

    /// Human-readable acknowledgment message
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    /// Notification processed; the gateway must stop retrying.
    pub fn confirm_success() -> Self {
        Self {
            rsp_code: "00".to_string(),
            message: "Confirm Success".to_string(),
        }
    }

    /// No transaction matches the callback's reference.
    pub fn order_not_found() -> Self {
        Self {
            rsp_code: "01".to_string(),
            message: "Order not found".to_string(),
        }
    }

    /// The referenced transaction already reached a conflicting terminal
    /// state.
    pub fn already_confirmed() -> Self {
        Self {
            rsp_code: "02".to_string(),
            message: "Order already confirmed".to_string(),
        }
    }

    /// The callback's amount does not match the stored record.
    pub fn invalid_amount() -> Self {
        Self {
            rsp_code: "04".to_string(),
            message: "Invalid amount".to_string(),
        }
    }

    /// The secure hash did not verify; nothing was mutated.
    pub fn invalid_signature() -> Self {
        Self {
            rsp_code: "97".to_string(),
            message: "Invalid signature".to_string(),
        }
    }

    /// Internal failure; the gateway should retry later.
    pub fn unknown_error() -> Self {
        Self {
            rsp_code: "99".to_string(),
            message: "Unknown error".to_string(),
        }
    }
}
