use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Session;
use crate::error::Result;
use crate::ledger::revenue::RevenueReport;
use crate::ledger::store::VaultSummary;
use crate::ledger::transaction::Transaction;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub data: RevenueReport,
}

/// Revenue projection for the admin dashboard, recomputed from the
/// transaction log per request.
pub async fn revenue(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<RevenueResponse>> {
    let data = state.ledger.revenue_report().await;

    Ok(Json(RevenueResponse { data }))
}

#[derive(Debug, Serialize)]
pub struct AdminTransactionsResponse {
    pub transaction: Vec<Transaction>,
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<AdminTransactionsResponse>> {
    let transaction = state.ledger.all_transactions().await;

    Ok(Json(AdminTransactionsResponse { transaction }))
}

#[derive(Debug, Serialize)]
pub struct AdminVaultsResponse {
    pub vault: Vec<VaultSummary>,
}

pub async fn vaults(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<AdminVaultsResponse>> {
    let vault = state.ledger.all_vaults().await;

    Ok(Json(AdminVaultsResponse { vault }))
}
