use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VaultError};

/// Smallest deposit the product accepts, in Lilangeni.
pub const MIN_DEPOSIT: Decimal = dec!(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Locked,
    Withdrawable,
    Withdrawn,
}

/// One locked sum of money with a fixed term.
///
/// `amount`, `lock_period_in_days` and `start_date` are fixed at creation;
/// only `status` (and `withdrawn_at`) ever change, and only forward:
/// LOCKED -> WITHDRAWABLE -> WITHDRAWN, or LOCKED -> WITHDRAWN.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub lock_period_in_days: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: DepositStatus,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

/// Shared by deposit creation and the pre-gateway request check, so a bad
/// request is rejected before any money is collected.
pub fn validate_terms(amount: Decimal, lock_period_in_days: u32) -> Result<()> {
    if amount < MIN_DEPOSIT {
        return Err(VaultError::Validation(format!(
            "Minimum deposit amount is E{}, got E{}",
            MIN_DEPOSIT, amount
        )));
    }
    if lock_period_in_days == 0 {
        return Err(VaultError::Validation(
            "Lock period must be at least 1 day".to_string(),
        ));
    }
    Ok(())
}

impl Deposit {
    pub fn new(
        user_id: impl Into<String>,
        amount: Decimal,
        lock_period_in_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_terms(amount, lock_period_in_days)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            amount,
            lock_period_in_days,
            start_date: now,
            end_date: now + Duration::days(i64::from(lock_period_in_days)),
            status: DepositStatus::Locked,
            withdrawn_at: None,
        })
    }

    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_date
    }

    pub fn is_active(&self) -> bool {
        self.status != DepositStatus::Withdrawn
    }

    /// Maturity is observed lazily at query time, not by a background job.
    pub(crate) fn refresh_status(&mut self, now: DateTime<Utc>) {
        if self.status == DepositStatus::Locked && self.is_matured(now) {
            self.status = DepositStatus::Withdrawable;
        }
    }

    pub(crate) fn mark_withdrawn(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == DepositStatus::Withdrawn {
            return Err(VaultError::Conflict(format!(
                "Deposit {} has already been withdrawn",
                self.id
            )));
        }
        self.status = DepositStatus::Withdrawn;
        self.withdrawn_at = Some(now);
        Ok(())
    }
}
