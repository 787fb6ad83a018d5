//! Example merchant endpoints for the gateway's callbacks.
//!
//! Exposes the three routes a merchant integration needs: creating a
//! payment redirect, the browser return path, and the server-to-server
//! IPN. Uses the in-memory store; swap in your own
//! `TransactionStore` implementation for production.
//!
//! Run with:
//! ```bash
//! cargo run --example ipn_server
//! ```
//!
//! Environment variables:
//! - VNP_TMN_CODE / VNP_HASH_SECRET / VNP_PAYMENT_URL / VNP_RETURN_URL
//! - PORT: server port (default: 3002)

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use vnpay_rs::checkout::build_payment_url;
use vnpay_rs::config::GatewayConfig;
use vnpay_rs::settlement::{handle_ipn, handle_return, ReturnStatus};
use vnpay_rs::store::{MemoryTransactionStore, TransactionStore};
use vnpay_rs::types::{IpnResponse, PaymentRequest};
use vnpay_rs::utils::generate_txn_ref;

struct AppState {
    config: GatewayConfig,
    store: MemoryTransactionStore,
}

async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let amount: i64 = query
        .get("amount")
        .and_then(|a| a.parse().ok())
        .unwrap_or(5_000_000);
    let txn_ref = generate_txn_ref("SUB_");
    let request = PaymentRequest::new(
        amount,
        "EV charging subscription",
        &txn_ref,
        "203.0.113.7",
    );

    match build_payment_url(&state.config, &request) {
        Ok(url) => {
            // PENDING record goes in before the payer is redirected.
            if let Err(e) = state.store.create(&txn_ref, amount).await {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response();
            }
            (
                StatusCode::OK,
                Json(json!({ "txnRef": txn_ref, "redirectUrl": url })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn ipn_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match handle_ipn(&state.config, &state.store, &params).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        // Storage trouble: ack 99 so the gateway retries later.
        Err(_) => (StatusCode::OK, Json(IpnResponse::unknown_error())).into_response(),
    }
}

async fn return_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match handle_return(&state.config, &state.store, &params).await {
        Ok(outcome) => {
            let message = match outcome.status {
                ReturnStatus::Success => "Payment successful",
                ReturnStatus::Failed => "Payment failed or cancelled",
                ReturnStatus::Tampered => "Payment could not be verified",
            };
            (
                StatusCode::OK,
                Json(json!({
                    "result": message,
                    "txnRef": outcome.fields.txn_ref,
                    "responseCode": outcome.fields.response_code,
                })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env().unwrap_or_else(|_| {
        GatewayConfig::new(
            "DEMO0001",
            "DEMOSECRETDEMOSECRETDEMOSECRET00",
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "http://localhost:3002/payment/vnpay-return",
        )
    });
    config.validate()?;

    let state = Arc::new(AppState {
        config,
        store: MemoryTransactionStore::new(),
    });

    let app = Router::new()
        .route("/payment/create", get(create_payment_handler))
        .route("/payment/vnpay-ipn", get(ipn_handler))
        .route("/payment/vnpay-return", get(return_handler))
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3002);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("merchant demo listening on port {}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
