use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Penalty,
}

/// Append-only ledger entry. Never mutated after creation; consumed only by
/// transaction listings and the revenue rollup.
///
/// Amount semantics per type:
/// - `deposit`: the amount collected into the vault
/// - `withdrawal`: the net amount disbursed to the user for the whole batch
///   (`penalty_fee` carries the flat fees charged, `deposits_count` the
///   number of deposits covered)
/// - `penalty`: the early-withdrawal penalty retained, one entry per
///   penalized deposit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub penalty_fee: Decimal,
    pub deposits_count: u32,
    pub momo_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn deposit(
        user_id: impl Into<String>,
        amount: Decimal,
        momo_transaction_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            tx_type: TransactionType::Deposit,
            amount,
            penalty_fee: Decimal::ZERO,
            deposits_count: 1,
            momo_transaction_id,
            created_at,
        }
    }

    pub fn withdrawal(
        user_id: impl Into<String>,
        net_disbursed: Decimal,
        flat_fees: Decimal,
        deposits_count: u32,
        momo_transaction_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            tx_type: TransactionType::Withdrawal,
            amount: net_disbursed,
            penalty_fee: flat_fees,
            deposits_count,
            momo_transaction_id,
            created_at,
        }
    }

    pub fn penalty(
        user_id: impl Into<String>,
        amount: Decimal,
        momo_transaction_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            tx_type: TransactionType::Penalty,
            amount,
            penalty_fee: amount,
            deposits_count: 1,
            momo_transaction_id,
            created_at,
        }
    }
}
