use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, VaultError};

/// Client for the MTN MoMo collection API.
///
/// The gateway is an opaque collaborator: we request an access token, then
/// ask it to collect money from the payer's mobile wallet. Nothing here is
/// retried automatically - a failed collection surfaces as `Gateway` and
/// the deposit is never recorded.
pub struct MomoClient {
    http: reqwest::Client,
    base_url: String,
    subscription_key: String,
    api_user: String,
    api_key: String,
    target_environment: String,
    currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payer<'a> {
    party_id_type: &'static str,
    party_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestToPay<'a> {
    amount: String,
    currency: &'a str,
    external_id: &'a str,
    payer: Payer<'a>,
    payer_message: String,
    payee_note: String,
}

impl MomoClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.gateway_timeout_seconds))
            .build()?;

        tracing::info!("MoMo API URL: {}", config.momo_api_url);
        tracing::info!("MoMo target environment: {}", config.momo_target_environment);

        Ok(Self {
            http,
            base_url: config.momo_api_url.trim_end_matches('/').to_string(),
            subscription_key: config.momo_subscription_key.clone(),
            api_user: config.momo_api_user.clone(),
            api_key: config.momo_api_key.clone(),
            target_environment: config.momo_target_environment.clone(),
            currency: config.currency.clone(),
        })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn target_environment(&self) -> &str {
        &self.target_environment
    }

    pub async fn access_token(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(format!("{}/collection/token/", self.base_url))
            .basic_auth(&self.api_user, Some(&self.api_key))
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Gateway(format!(
                "Token request failed with {}: {}",
                status, body
            )));
        }

        Ok(response.json::<AccessToken>().await?)
    }

    /// Asks the gateway to collect `amount` from the payer's wallet.
    ///
    /// `reference_id` is the gateway-side id of this collection attempt;
    /// `external_id` carries the caller's orderId so the collection can be
    /// reconciled against our ledger.
    pub async fn request_to_pay(
        &self,
        token: &str,
        reference_id: Uuid,
        amount: Decimal,
        phone_number: &str,
        external_id: &str,
        lock_period_in_days: u32,
    ) -> Result<()> {
        let body = RequestToPay {
            amount: amount.to_string(),
            currency: &self.currency,
            external_id,
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: phone_number,
            },
            payer_message: format!(
                "Mo Pocket deposit, locked for {} day(s)",
                lock_period_in_days
            ),
            payee_note: format!("Vault deposit {}", external_id),
        };

        let response = self
            .http
            .post(format!("{}/collection/v1_0/requesttopay", self.base_url))
            .bearer_auth(token)
            .header("X-Reference-Id", reference_id.to_string())
            .header("X-Target-Environment", &self.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .json(&body)
            .send()
            .await?;

        // the collection API answers 202 Accepted and settles asynchronously
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Gateway(format!(
                "Collection request failed with {}: {}",
                status, body
            )));
        }

        tracing::info!(%reference_id, external_id, "Collection request accepted by gateway");
        Ok(())
    }
}
