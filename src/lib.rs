//! # vnpay-rs
//!
//! A Rust implementation of the VNPay payment gateway protocol: canonical
//! secure-hash signing, callback verification, and idempotent transaction
//! settlement.
//!
//! The gateway integrates through signed query strings: the merchant
//! redirects the payer to a hosted payment page with an HMAC-SHA512-signed
//! URL, and the gateway calls back twice, a browser redirect (return
//! path) and a server-to-server IPN, both carrying the same signature
//! scheme. This crate implements that protocol end to end and drives the
//! PENDING → ACTIVE/FAILED transaction lifecycle through a pluggable
//! storage trait.
//!
//! ## Features
//!
//! - **Canonical encoding**: one deterministic sort-and-encode function
//!   shared by signing and verification, so the two paths cannot drift
//! - **Signing**: HMAC-SHA512 over the canonical string, hex-encoded
//! - **Verification**: constant-time comparison; malformed input degrades
//!   to "not authentic", never to an error
//! - **Settlement**: idempotent state machine with gateway-correct IPN
//!   acknowledgment codes, safe under concurrent return/IPN delivery
//! - **Extensible storage**: implement [`store::TransactionStore`] over
//!   your own database; an in-memory store backs tests and demos
//!
//! ## Quick Start
//!
//! ### Building a payment URL
//!
//! ```rust
//! use vnpay_rs::checkout::build_payment_url;
//! use vnpay_rs::config::GatewayConfig;
//! use vnpay_rs::types::PaymentRequest;
//!
//! # fn example() -> vnpay_rs::Result<()> {
//! let config = GatewayConfig::new(
//!     "YOUR_TMN_CODE",
//!     "YOUR_HASH_SECRET",
//!     "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
//!     "https://merchant.example/payment/vnpay-return",
//! );
//! config.validate()?;
//!
//! let request = PaymentRequest::new(
//!     5_000_000,                  // VND
//!     "EV charging subscription", // order info
//!     "SUB_1722400000",           // transaction reference
//!     "203.0.113.7",              // payer IP
//! );
//!
//! let redirect_url = build_payment_url(&config, &request)?;
//! // Persist a PENDING transaction, then send the payer to redirect_url.
//! # Ok(())
//! # }
//! ```
//!
//! ### Handling the IPN
//!
//! ```rust
//! use vnpay_rs::config::GatewayConfig;
//! use vnpay_rs::settlement::handle_ipn;
//! use vnpay_rs::store::MemoryTransactionStore;
//! use vnpay_rs::utils::parse_query;
//!
//! # async fn example() -> vnpay_rs::Result<()> {
//! # let config = GatewayConfig::new("t", "s", "https://gw.example/pay", "https://m.example/r");
//! let store = MemoryTransactionStore::new();
//! let params = parse_query("vnp_TxnRef=SUB_1&vnp_ResponseCode=00&vnp_SecureHash=..");
//!
//! let ack = handle_ipn(&config, &store, &params).await?;
//! // Serialize `ack` as the HTTP response body: {"RspCode":"..","Message":".."}
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol Overview
//!
//! 1. **Merchant builds a signed URL**: parameters are canonicalized
//!    (sorted, form-urlencoded), HMAC-SHA512-signed, and the digest is
//!    appended as `vnp_SecureHash`
//! 2. **Merchant persists a PENDING transaction**, then redirects the payer
//! 3. **Payer pays at the gateway**
//! 4. **Gateway redirects the payer back** (return path) with signed
//!    outcome parameters
//! 5. **Gateway delivers the IPN** server-to-server with the same
//!    parameters; retried until acknowledged
//! 6. **Merchant verifies each callback** and settles the transaction
//!    exactly once
//!
//! ## Security
//!
//! - **Forgery resistance**: every callback is re-signed locally and
//!   compared in constant time; a single flipped character fails closed
//! - **No verification oracles**: missing or malformed signatures return
//!   "not authentic" through the same path as a wrong digest
//! - **Replay safety**: settlement is a conditional PENDING-only update,
//!   so redelivered notifications are acknowledged without re-applying
//! - **Reference isolation**: a callback can only ever touch the
//!   transaction its own reference names, and only when that reference
//!   belongs to this integration
//! - **Secret hygiene**: the shared secret lives in
//!   [`secrecy::SecretString`] and is read once at configuration time

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod callback;
pub mod canonical;
pub mod checkout;
pub mod config;
pub mod errors;
pub mod settlement;
pub mod signature;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use errors::{Result, VnpError};
pub use types::{
    CallbackFields, CompletionFields, IpnResponse, PaymentRequest, Transaction,
    TransactionStatus, VNP_CODE_SUCCESS, VNP_VERSION,
};
