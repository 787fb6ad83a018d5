//! Settlement: applying verified callbacks to stored transactions.
//!
//! This module is the only mutation path for transaction records. Each
//! handler verifies the callback first via [`crate::callback`], then
//! drives the PENDING → ACTIVE/FAILED transition through the store's
//! conditional update, and finally picks the acknowledgment the gateway
//! expects.
//!
//! Acknowledgment codes matter: the gateway retries an IPN until it
//! receives a recognized code, so a duplicate delivery for an
//! already-settled transaction still acks "00" and an internal storage
//! failure must surface as an error (the HTTP layer acks "99"), never
//! as the invalid-signature code.

use std::collections::HashMap;

use crate::callback::verify_callback;
use crate::config::GatewayConfig;
use crate::errors::Result;
use crate::store::TransactionStore;
use crate::types::{CallbackFields, CompletionFields, IpnResponse, TransactionStatus};
use crate::utils::parse_vnp_timestamp;

/// Business outcome of a return-path callback, for rendering the
/// landing page the payer comes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Authentic callback with success codes
    Success,
    /// Authentic callback with a failure code (payer cancelled, card
    /// declined, ...)
    Failed,
    /// The signature did not verify; nothing the callback claims can be
    /// trusted
    Tampered,
}

/// Result of handling a return-path callback.
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    /// How the payment concluded
    pub status: ReturnStatus,
    /// Fields extracted from the callback (untrusted when
    /// [`ReturnStatus::Tampered`])
    pub fields: CallbackFields,
}

fn completion_fields(fields: &CallbackFields) -> CompletionFields {
    CompletionFields {
        payment_method: fields.card_type.clone(),
        bank_code: fields.bank_code.clone(),
        gateway_txn_no: fields.transaction_no.clone(),
        completed_at: fields.pay_date.as_deref().and_then(parse_vnp_timestamp),
    }
}

/// Acknowledgment for a callback whose transaction is already terminal.
///
/// A redelivery reporting the outcome we already recorded is a benign
/// duplicate and acks "00" so the gateway stops retrying; a callback
/// reporting the *opposite* outcome is a conflict and acks "02".
fn ack_for_terminal(reported_success: bool, status: TransactionStatus) -> IpnResponse {
    let recorded_success = matches!(status, TransactionStatus::Active | TransactionStatus::Paid);
    if reported_success == recorded_success {
        IpnResponse::confirm_success()
    } else {
        IpnResponse::already_confirmed()
    }
}

fn wire_amount_matches(callback_amount: Option<i64>, stored_amount: i64) -> bool {
    match stored_amount.checked_mul(100) {
        Some(expected) => callback_amount == Some(expected),
        None => false,
    }
}

/// Handles a server-to-server IPN callback.
///
/// Returns the acknowledgment body to send back to the gateway. State
/// is mutated only for an authentic callback whose reference belongs to
/// this integration, and only through the store's conditional update,
/// so concurrent return/IPN deliveries settle exactly once.
///
/// # Errors
///
/// Only [`crate::errors::VnpError::StorageError`] (or other store
/// failures) propagate. Map them to [`IpnResponse::unknown_error`] at
/// the HTTP boundary; the gateway will retry the notification.
pub async fn handle_ipn<S>(
    config: &GatewayConfig,
    store: &S,
    params: &HashMap<String, String>,
) -> Result<IpnResponse>
where
    S: TransactionStore + ?Sized,
{
    let verdict = verify_callback(config, params);
    if !verdict.authentic {
        return Ok(IpnResponse::invalid_signature());
    }

    let txn_ref = match verdict.fields.txn_ref.as_deref() {
        Some(r) if config.matches_reference(r) => r,
        Some(r) => {
            tracing::warn!(txn_ref = r, "IPN reference does not belong to this integration");
            return Ok(IpnResponse::order_not_found());
        }
        None => {
            tracing::warn!("IPN carried no transaction reference");
            return Ok(IpnResponse::order_not_found());
        }
    };

    let transaction = match store.find_by_reference(txn_ref).await? {
        Some(tx) => tx,
        None => {
            tracing::info!(txn_ref, "IPN for unknown transaction reference");
            return Ok(IpnResponse::order_not_found());
        }
    };

    if !wire_amount_matches(verdict.fields.amount, transaction.amount) {
        tracing::warn!(
            txn_ref,
            callback_amount = ?verdict.fields.amount,
            stored_amount = transaction.amount,
            "IPN amount does not match stored transaction"
        );
        return Ok(IpnResponse::invalid_amount());
    }

    let success = verdict.is_payment_success(config);

    if transaction.status.is_terminal() {
        return Ok(ack_for_terminal(success, transaction.status));
    }

    let target = if success {
        TransactionStatus::Active
    } else {
        TransactionStatus::Failed
    };

    let applied = store
        .update_status_if_pending(txn_ref, target, completion_fields(&verdict.fields))
        .await?;

    if applied {
        tracing::info!(txn_ref, status = ?target, "transaction settled");
        return Ok(IpnResponse::confirm_success());
    }

    // Lost a race with the other callback path; ack based on what won.
    match store.find_by_reference(txn_ref).await? {
        Some(tx) if tx.status.is_terminal() => Ok(ack_for_terminal(success, tx.status)),
        _ => Ok(IpnResponse::unknown_error()),
    }
}

/// Handles a return-path (browser redirect) callback.
///
/// Applies the same state transitions as the IPN handler (the store's
/// conditional update makes whichever path arrives second a no-op) and
/// reports the outcome for the payer-facing page. A tampered callback
/// fails a still-PENDING matching transaction: the payer came back with
/// unverifiable parameters, so the payment cannot be trusted to
/// complete. No record is ever created from a callback.
pub async fn handle_return<S>(
    config: &GatewayConfig,
    store: &S,
    params: &HashMap<String, String>,
) -> Result<ReturnOutcome>
where
    S: TransactionStore + ?Sized,
{
    let verdict = verify_callback(config, params);
    let known_ref = verdict
        .fields
        .txn_ref
        .clone()
        .filter(|r| config.matches_reference(r));

    if !verdict.authentic {
        if let Some(txn_ref) = known_ref.as_deref() {
            let failed = store
                .update_status_if_pending(
                    txn_ref,
                    TransactionStatus::Failed,
                    completion_fields(&verdict.fields),
                )
                .await?;
            if failed {
                tracing::warn!(txn_ref, "unverifiable return callback failed the transaction");
            }
        }
        return Ok(ReturnOutcome {
            status: ReturnStatus::Tampered,
            fields: verdict.fields,
        });
    }

    let success = verdict.is_payment_success(config);
    let status = if success {
        ReturnStatus::Success
    } else {
        ReturnStatus::Failed
    };

    if let Some(txn_ref) = known_ref.as_deref() {
        let target = if success {
            TransactionStatus::Active
        } else {
            TransactionStatus::Failed
        };
        let applied = store
            .update_status_if_pending(txn_ref, target, completion_fields(&verdict.fields))
            .await?;
        if applied {
            tracing::info!(txn_ref, status = ?target, "transaction settled on return path");
        }
    }

    Ok(ReturnOutcome {
        status,
        fields: verdict.fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_query;
    use crate::signature::sign_canonical;
    use crate::store::MemoryTransactionStore;
    use crate::types::PARAM_SECURE_HASH;

    fn config() -> GatewayConfig {
        GatewayConfig::new(
            "DEMO0001",
            "secretsecretsecret",
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "https://merchant.example/payment/vnpay-return",
        )
    }

    fn signed_callback(
        config: &GatewayConfig,
        overrides: &[(&str, &str)],
    ) -> HashMap<String, String> {
        let mut params: HashMap<String, String> = HashMap::new();
        params.insert("vnp_TmnCode".to_string(), "DEMO0001".to_string());
        params.insert("vnp_TxnRef".to_string(), "SUB_1722400000".to_string());
        params.insert("vnp_Amount".to_string(), "500000000".to_string());
        params.insert("vnp_ResponseCode".to_string(), "00".to_string());
        params.insert("vnp_TransactionStatus".to_string(), "00".to_string());
        params.insert("vnp_BankCode".to_string(), "NCB".to_string());
        params.insert("vnp_CardType".to_string(), "ATM".to_string());
        params.insert("vnp_PayDate".to_string(), "20260807153000".to_string());
        for (key, value) in overrides {
            params.insert(key.to_string(), value.to_string());
        }

        let canonical = canonical_query(&params);
        let hash = sign_canonical(&canonical, &config.hash_secret).unwrap();
        params.insert(PARAM_SECURE_HASH.to_string(), hash);
        params
    }

    async fn store_with_pending() -> MemoryTransactionStore {
        let store = MemoryTransactionStore::new();
        store.create("SUB_1722400000", 5_000_000).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_success_ipn_settles_pending() {
        let cfg = config();
        let store = store_with_pending().await;
        let params = signed_callback(&cfg, &[]);

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(ack, IpnResponse::confirm_success());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);
        assert_eq!(tx.payment_method.as_deref(), Some("ATM"));
        assert_eq!(tx.bank_code.as_deref(), Some("NCB"));
        assert!(tx.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_success_ipn_is_idempotent() {
        let cfg = config();
        let store = store_with_pending().await;
        let params = signed_callback(&cfg, &[]);

        let first = handle_ipn(&cfg, &store, &params).await.unwrap();
        let second = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(first, IpnResponse::confirm_success());
        assert_eq!(second, IpnResponse::confirm_success());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);
    }

    #[tokio::test]
    async fn test_failure_ipn_fails_pending_but_acks_receipt() {
        let cfg = config();
        let store = store_with_pending().await;
        let params = signed_callback(&cfg, &[("vnp_ResponseCode", "07")]);

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        // Receipt confirmed so the gateway stops retrying; the business
        // outcome is the FAILED row.
        assert_eq!(ack, IpnResponse::confirm_success());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_conflicting_ipn_after_settlement_acks_already_confirmed() {
        let cfg = config();
        let store = store_with_pending().await;

        let success = signed_callback(&cfg, &[]);
        handle_ipn(&cfg, &store, &success).await.unwrap();

        let failure = signed_callback(&cfg, &[("vnp_ResponseCode", "07")]);
        let ack = handle_ipn(&cfg, &store, &failure).await.unwrap();
        assert_eq!(ack, IpnResponse::already_confirmed());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);
    }

    #[tokio::test]
    async fn test_tampered_ipn_mutates_nothing() {
        let cfg = config();
        let store = store_with_pending().await;
        let mut params = signed_callback(&cfg, &[]);
        params.insert("vnp_Amount".to_string(), "999999999".to_string());

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(ack, IpnResponse::invalid_signature());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_reference_acks_order_not_found() {
        let cfg = config();
        let store = MemoryTransactionStore::new();
        let params = signed_callback(&cfg, &[]);

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(ack, IpnResponse::order_not_found());
    }

    #[tokio::test]
    async fn test_foreign_prefix_rejected_without_mutation() {
        let cfg = config();
        let store = MemoryTransactionStore::new();
        store.create("ORDER_999", 5_000_000).await.unwrap();
        let params = signed_callback(&cfg, &[("vnp_TxnRef", "ORDER_999")]);

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(ack, IpnResponse::order_not_found());

        let tx = store.find_by_reference("ORDER_999").await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_amount_mismatch_acks_invalid_amount() {
        let cfg = config();
        let store = MemoryTransactionStore::new();
        store.create("SUB_1722400000", 4_000_000).await.unwrap();
        let params = signed_callback(&cfg, &[]);

        let ack = handle_ipn(&cfg, &store, &params).await.unwrap();
        assert_eq!(ack, IpnResponse::invalid_amount());

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_return_path_success() {
        let cfg = config();
        let store = store_with_pending().await;
        let params = signed_callback(&cfg, &[]);

        let outcome = handle_return(&cfg, &store, &params).await.unwrap();
        assert_eq!(outcome.status, ReturnStatus::Success);

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);
    }

    #[tokio::test]
    async fn test_return_path_tampered_fails_pending() {
        let cfg = config();
        let store = store_with_pending().await;
        let mut params = signed_callback(&cfg, &[]);
        params.insert("vnp_ResponseCode".to_string(), "07".to_string()); // breaks the hash

        let outcome = handle_return(&cfg, &store, &params).await.unwrap();
        assert_eq!(outcome.status, ReturnStatus::Tampered);

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_return_after_ipn_is_noop() {
        let cfg = config();
        let store = store_with_pending().await;
        let params = signed_callback(&cfg, &[]);

        handle_ipn(&cfg, &store, &params).await.unwrap();
        let outcome = handle_return(&cfg, &store, &params).await.unwrap();
        assert_eq!(outcome.status, ReturnStatus::Success);

        let tx = store
            .find_by_reference("SUB_1722400000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);
    }

    #[tokio::test]
    async fn test_reference_isolation() {
        let cfg = config();
        let store = MemoryTransactionStore::new();
        store.create("SUB_1722400000", 5_000_000).await.unwrap();
        store.create("SUB_other", 5_000_000).await.unwrap();

        let params = signed_callback(&cfg, &[]);
        handle_ipn(&cfg, &store, &params).await.unwrap();

        // The unrelated record is untouched.
        let other = store.find_by_reference("SUB_other").await.unwrap().unwrap();
        assert_eq!(other.status, TransactionStatus::Pending);
    }
}
