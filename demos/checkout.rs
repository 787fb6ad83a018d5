//! End-to-end checkout walkthrough.
//!
//! Builds a signed payment URL, persists the PENDING transaction, then
//! simulates the gateway's IPN (signed with the same shared secret) and
//! settles it through the state machine.
//!
//! Run with:
//! ```bash
//! cargo run --example checkout
//! ```
//!
//! Environment variables (optional, sandbox defaults are used otherwise):
//! - VNP_TMN_CODE
//! - VNP_HASH_SECRET
//! - VNP_PAYMENT_URL
//! - VNP_RETURN_URL

use std::collections::HashMap;

use anyhow::Result;
use vnpay_rs::canonical::canonical_query;
use vnpay_rs::checkout::build_payment_url;
use vnpay_rs::config::GatewayConfig;
use vnpay_rs::settlement::handle_ipn;
use vnpay_rs::signature::sign_canonical;
use vnpay_rs::store::{MemoryTransactionStore, TransactionStore};
use vnpay_rs::types::{PaymentRequest, PARAM_SECURE_HASH};
use vnpay_rs::utils::generate_txn_ref;

fn demo_config() -> GatewayConfig {
    dotenvy::dotenv().ok();
    GatewayConfig::from_env().unwrap_or_else(|_| {
        GatewayConfig::new(
            "DEMO0001",
            "DEMOSECRETDEMOSECRETDEMOSECRET00",
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "https://merchant.example/payment/vnpay-return",
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = demo_config();
    config.validate()?;

    let store = MemoryTransactionStore::new();

    // 1. Build the redirect URL and persist the PENDING record.
    let txn_ref = generate_txn_ref("SUB_");
    let amount = 5_000_000;
    let request = PaymentRequest::new(amount, "EV charging subscription", &txn_ref, "203.0.113.7");

    let redirect_url = build_payment_url(&config, &request)?;
    store.create(&txn_ref, amount).await?;

    println!("Redirect the payer to:\n  {}\n", redirect_url);

    // 2. Simulate the gateway's IPN for a successful payment.
    let mut ipn: HashMap<String, String> = HashMap::new();
    ipn.insert("vnp_TmnCode".to_string(), config.tmn_code.clone());
    ipn.insert("vnp_TxnRef".to_string(), txn_ref.clone());
    ipn.insert("vnp_Amount".to_string(), (amount * 100).to_string());
    ipn.insert("vnp_ResponseCode".to_string(), "00".to_string());
    ipn.insert("vnp_TransactionStatus".to_string(), "00".to_string());
    ipn.insert("vnp_BankCode".to_string(), "NCB".to_string());
    ipn.insert("vnp_CardType".to_string(), "ATM".to_string());
    ipn.insert("vnp_PayDate".to_string(), "20260807153000".to_string());
    let hash = sign_canonical(&canonical_query(&ipn), &config.hash_secret)?;
    ipn.insert(PARAM_SECURE_HASH.to_string(), hash);

    // 3. Settle it.
    let ack = handle_ipn(&config, &store, &ipn).await?;
    println!("IPN acknowledged: {}", serde_json::to_string(&ack)?);

    let tx = store.find_by_reference(&txn_ref).await?.unwrap();
    println!(
        "Transaction {} is now {:?} (completed at {:?})",
        tx.txn_ref, tx.status, tx.completed_at
    );

    Ok(())
}
