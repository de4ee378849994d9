use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;
use crate::ledger::deposit::MIN_DEPOSIT;
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "Mo Pocket Vault Service",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfigResponse {
    pub currency: String,
    pub momo_target_environment: String,
    pub minimum_deposit: rust_decimal::Decimal,
    pub flat_fee: rust_decimal::Decimal,
    pub allow_early_withdrawal: bool,
}

// exposing the product constants so the app doesn't hardcode them;
// none of this is secret
pub async fn public_config(State(state): State<Arc<AppState>>) -> Result<Json<PublicConfigResponse>> {
    let policy = state.ledger.policy();

    Ok(Json(PublicConfigResponse {
        currency: state.momo.currency().to_string(),
        momo_target_environment: state.momo.target_environment().to_string(),
        minimum_deposit: MIN_DEPOSIT,
        flat_fee: policy.flat_fee,
        allow_early_withdrawal: policy.allow_early_withdrawal,
    }))
}
