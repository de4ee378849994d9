use axum::{extract::State, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::normalize_phone;
use crate::auth::Session;
use crate::error::{Result, VaultError};
use crate::ledger::deposit::validate_terms;
use crate::AppState;

// the app fetches a gateway token up front so the deposit screen can tell
// the user the payment system is unreachable before they fill the form
pub async fn momo_token(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<serde_json::Value>> {
    let token = state.momo.access_token().await?;

    Ok(Json(json!({
        "data": { "access_token": token.access_token }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyCollectRequest {
    // legacy field; the session is authoritative
    #[serde(default)]
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub lock_period_in_days: u32,
    pub phone_number: String,
    pub order_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyCollectResponse {
    pub status: String,
    pub reference_id: String,
    pub message: String,
}

/// Collects a deposit through the MoMo gateway, then records it in the
/// vault ledger. The ledger is only touched after the gateway accepts the
/// collection; a gateway failure leaves no trace of the deposit.
pub async fn money_collect(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<MoneyCollectRequest>,
) -> Result<Json<MoneyCollectResponse>> {
    // reject before any money moves
    validate_terms(req.amount, req.lock_period_in_days)?;
    let phone_number = normalize_phone(&req.phone_number)?;
    if req.order_id.trim().is_empty() {
        return Err(VaultError::Validation("orderId must not be empty".to_string()));
    }
    if let Some(user_id) = req.user_id.as_deref() {
        if !user_id.is_empty() && user_id != session.user_id {
            return Err(VaultError::Validation(
                "userId does not match the authenticated session".to_string(),
            ));
        }
    }

    // a retried orderId must not charge the payer twice
    if let Some(previous) = state.ledger.find_order(&req.order_id) {
        tracing::info!(order_id = %req.order_id, "Returning previously processed collection");
        return Ok(Json(MoneyCollectResponse {
            status: "SUCCESSFUL".to_string(),
            reference_id: previous.momo_transaction_id,
            message: format!(
                "Deposit of E{} was already processed for this order",
                previous.amount
            ),
        }));
    }

    let token = state.momo.access_token().await?;
    let reference_id = Uuid::new_v4();
    state
        .momo
        .request_to_pay(
            &token.access_token,
            reference_id,
            req.amount,
            &phone_number,
            &req.order_id,
            req.lock_period_in_days,
        )
        .await?;

    let receipt = state
        .ledger
        .deposit(
            &session.user_id,
            req.amount,
            req.lock_period_in_days,
            &req.order_id,
            &reference_id.to_string(),
            Utc::now(),
        )
        .await?;

    Ok(Json(MoneyCollectResponse {
        status: "PENDING".to_string(),
        reference_id: receipt.momo_transaction_id,
        message: format!(
            "Deposit of E{} initiated, locked for {} day(s)",
            req.amount, req.lock_period_in_days
        ),
    }))
}
