//! Storage collaborator for transaction records.
//!
//! The settlement handlers never issue queries; they speak to this
//! trait. The one contract that matters for correctness is
//! [`TransactionStore::update_status_if_pending`]: the transition out
//! of PENDING must be a single conditional update, because the return
//! redirect and the IPN for the same payment can arrive concurrently
//! and exactly one of them may win.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::types::{CompletionFields, Transaction, TransactionStatus};

/// Persistence operations the settlement state machine requires.
///
/// Implementations own the schema and any dependent domain effects
/// (e.g. activating the entitlement tied to a settled subscription
/// inside the same storage transaction as the status update).
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Looks up a transaction by its merchant reference.
    async fn find_by_reference(&self, txn_ref: &str) -> Result<Option<Transaction>>;

    /// Creates a PENDING transaction for an outbound payment request.
    ///
    /// Callers invoke this before redirecting the payer so an early
    /// callback finds its record.
    async fn create(&self, txn_ref: &str, amount: i64) -> Result<Transaction>;

    /// Transitions a transaction out of PENDING, but only if it is
    /// still PENDING.
    ///
    /// Returns whether the update applied. Must be implemented as one
    /// conditional write (`... WHERE status = 'PENDING'` in SQL terms),
    /// not a read followed by a write; the returned `false` is how a
    /// concurrent duplicate callback becomes a no-op instead of a race.
    async fn update_status_if_pending(
        &self,
        txn_ref: &str,
        new_status: TransactionStatus,
        fields: CompletionFields,
    ) -> Result<bool>;
}

/// A thread-safe in-memory transaction store.
///
/// Backs the test suite and the runnable demos; production deployments
/// implement [`TransactionStore`] over their own database.
#[derive(Default)]
pub struct MemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    next_id: AtomicU64,
}

impl MemoryTransactionStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn find_by_reference(&self, txn_ref: &str) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(txn_ref).cloned())
    }

    async fn create(&self, txn_ref: &str, amount: i64) -> Result<Transaction> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let transaction = Transaction {
            id: id.to_string(),
            txn_ref: txn_ref.to_string(),
            amount,
            status: TransactionStatus::Pending,
            payment_method: None,
            bank_code: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        let mut transactions = self.transactions.write().await;
        transactions.insert(txn_ref.to_string(), transaction.clone());
        Ok(transaction)
    }

    async fn update_status_if_pending(
        &self,
        txn_ref: &str,
        new_status: TransactionStatus,
        fields: CompletionFields,
    ) -> Result<bool> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(txn_ref) {
            Some(tx) if tx.status == TransactionStatus::Pending => {
                tx.status = new_status;
                tx.payment_method = fields.payment_method;
                tx.bank_code = fields.bank_code;
                tx.completed_at = Some(fields.completed_at.unwrap_or_else(Utc::now));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
