use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::ledger::transaction::{Transaction, TransactionType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBreakdown {
    pub total_revenue: Decimal,
    pub flat_fees_revenue: Decimal,
    pub flat_fees_count: u64,
    pub early_withdrawal_penalties_revenue: Decimal,
    pub early_withdrawal_penalties_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: u64,
    pub total_deposits: u64,
    pub total_withdrawals: u64,
    pub current_locked_funds: Decimal,
    pub total_deposits_amount: Decimal,
    pub total_withdrawals_amount: Decimal,
    pub net_user_funds: Decimal,
    pub system_profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub system_profit_margin: String,
}

/// Admin-facing rollup of fees and penalties collected across all
/// transactions. Recomputed from the log on every request - there is no
/// stored running total that could drift.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub revenue_breakdown: RevenueBreakdown,
    pub system_stats: SystemStats,
    pub summary: RevenueSummary,
}

impl RevenueReport {
    pub fn compute(transactions: &[Transaction], total_users: u64, current_locked_funds: Decimal) -> Self {
        let mut flat_fees_revenue = Decimal::ZERO;
        let mut flat_fees_count = 0u64;
        let mut penalties_revenue = Decimal::ZERO;
        let mut penalties_count = 0u64;
        let mut total_deposits = 0u64;
        let mut total_withdrawals = 0u64;
        let mut total_deposits_amount = Decimal::ZERO;
        let mut total_withdrawals_amount = Decimal::ZERO;

        for tx in transactions {
            match tx.tx_type {
                TransactionType::Deposit => {
                    total_deposits += 1;
                    total_deposits_amount += tx.amount;
                }
                TransactionType::Withdrawal => {
                    total_withdrawals += 1;
                    total_withdrawals_amount += tx.amount;
                    flat_fees_revenue += tx.penalty_fee;
                    flat_fees_count += u64::from(tx.deposits_count);
                }
                TransactionType::Penalty => {
                    penalties_revenue += tx.amount;
                    penalties_count += 1;
                }
            }
        }

        let total_revenue = flat_fees_revenue + penalties_revenue;
        let net_user_funds = total_deposits_amount - total_withdrawals_amount - total_revenue;

        let system_profit_margin = if total_deposits_amount > Decimal::ZERO {
            format!(
                "{}%",
                (total_revenue / total_deposits_amount * dec!(100)).round_dp(2)
            )
        } else {
            "0%".to_string()
        };

        Self {
            revenue_breakdown: RevenueBreakdown {
                total_revenue,
                flat_fees_revenue,
                flat_fees_count,
                early_withdrawal_penalties_revenue: penalties_revenue,
                early_withdrawal_penalties_count: penalties_count,
            },
            system_stats: SystemStats {
                total_users,
                total_deposits,
                total_withdrawals,
                current_locked_funds,
                total_deposits_amount,
                total_withdrawals_amount,
                net_user_funds,
                system_profit: total_revenue,
            },
            summary: RevenueSummary { system_profit_margin },
        }
    }
}
