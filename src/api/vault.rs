use axum::{extract::State, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::normalize_phone;
use crate::auth::Session;
use crate::error::Result;
use crate::ledger::quote::WithdrawalQuote;
use crate::ledger::store::VaultInfo;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct VaultInfoResponse {
    pub data: VaultInfo,
}

pub async fn vault_info(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<VaultInfoResponse>> {
    let data = state.ledger.vault_info(&session.user_id, Utc::now()).await;

    Ok(Json(VaultInfoResponse { data }))
}

#[derive(Debug, Serialize)]
pub struct WithdrawableDepositsResponse {
    pub data: Vec<WithdrawalQuote>,
}

/// Quotes are computed fresh against the current clock on every call; the
/// client renders them but the commit below never trusts them.
pub async fn withdrawable_deposits(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<WithdrawableDepositsResponse>> {
    let data = state
        .ledger
        .list_withdrawable(&session.user_id, Utc::now())
        .await?;

    Ok(Json(WithdrawableDepositsResponse { data }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub phone_number: String,
    pub deposit_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawData {
    pub total_withdrawn: Decimal,
    pub total_fees: Decimal,
    pub total_penalties: Decimal,
    pub deposits_processed: u32,
    pub reference_id: String,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub data: WithdrawData,
}

/// Withdraws the selected deposits as one atomic batch. Penalties and fees
/// are re-derived server-side from the deposit records at commit time.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>> {
    let _payout_msisdn = normalize_phone(&req.phone_number)?;

    let receipt = state
        .ledger
        .commit_withdrawal(&session.user_id, &req.deposit_ids, Utc::now())
        .await?;

    Ok(Json(WithdrawResponse {
        success: true,
        data: WithdrawData {
            total_withdrawn: receipt.totals.total_net,
            total_fees: receipt.totals.total_fees,
            total_penalties: receipt.totals.total_penalties,
            deposits_processed: receipt.totals.deposits_count,
            reference_id: receipt.reference_id.to_string(),
        },
    }))
}
