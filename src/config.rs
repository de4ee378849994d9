use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub momo_api_url: String,
    pub momo_subscription_key: String,
    pub momo_api_user: String,
    pub momo_api_key: String,
    pub momo_target_environment: String,
    pub currency: String,
    pub allow_early_withdrawal: bool,
    pub gateway_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // treating an empty key as unset because docker-compose sets missing vars to ""
        let mut subscription_key = env::var("MOMO_SUBSCRIPTION_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        // fallback to loading ./.env explicitly in case the working directory isn't set correctly
        if subscription_key.is_none() {
            let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
            let _ = dotenvy::from_path_override(&env_path);
            subscription_key = env::var("MOMO_SUBSCRIPTION_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty());
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()?,
            momo_api_url: env::var("MOMO_API_URL")
                .unwrap_or_else(|_| "https://sandbox.momodeveloper.mtn.com".to_string()),
            momo_subscription_key: subscription_key
                .ok_or_else(|| anyhow::anyhow!("MOMO_SUBSCRIPTION_KEY is not set"))?,
            momo_api_user: env::var("MOMO_API_USER")?,
            momo_api_key: env::var("MOMO_API_KEY")?,
            momo_target_environment: env::var("MOMO_TARGET_ENVIRONMENT")
                .unwrap_or_else(|_| "sandbox".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "SZL".to_string()),
            allow_early_withdrawal: env::var("ALLOW_EARLY_WITHDRAWAL")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            gateway_timeout_seconds: env::var("GATEWAY_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }
}
