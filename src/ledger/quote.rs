use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::ledger::deposit::Deposit;

/// Fixed charge per deposit withdrawn, independent of any penalty.
pub const FLAT_FEE: Decimal = dec!(5);

/// Uniform early-withdrawal penalty rate, applied before maturity
/// regardless of lock-period tier.
pub const EARLY_WITHDRAWAL_PENALTY_RATE: Decimal = dec!(0.10);

/// Policy knobs for quote computation. The defaults match the product as
/// shipped; `allow_early_withdrawal` exists because the pre-maturity lockout
/// is a policy decision, not a ledger invariant.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    pub penalty_rate: Decimal,
    pub flat_fee: Decimal,
    pub allow_early_withdrawal: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            penalty_rate: EARLY_WITHDRAWAL_PENALTY_RATE,
            flat_fee: FLAT_FEE,
            allow_early_withdrawal: true,
        }
    }
}

/// Ephemeral withdrawal terms for one deposit at one point in time.
///
/// Never persisted - it depends on the wall clock, so it is recomputed on
/// every request, and recomputed again authoritatively at commit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalQuote {
    pub deposit_id: Uuid,
    pub amount: Decimal,
    pub lock_period_in_days: u32,
    pub deposit_date: DateTime<Utc>,
    pub penalty: Decimal,
    pub flat_fee: Decimal,
    pub net_amount: Decimal,
    pub can_withdraw: bool,
    pub is_early_withdrawal: bool,
    pub hours_until_maturity: i64,
}

/// Pure function of (deposit, now, policy). Calling it twice with the same
/// arguments yields the same quote.
pub fn evaluate(deposit: &Deposit, now: DateTime<Utc>, policy: &LedgerPolicy) -> Result<WithdrawalQuote> {
    // a deposit that lost its amount or its date ordering is corrupted
    // upstream data; refuse to quote it rather than default anything
    if deposit.amount <= Decimal::ZERO {
        return Err(VaultError::InvariantViolation(format!(
            "Deposit {} has non-positive amount {}",
            deposit.id, deposit.amount
        )));
    }
    if deposit.end_date < deposit.start_date {
        return Err(VaultError::InvariantViolation(format!(
            "Deposit {} ends before it starts",
            deposit.id
        )));
    }

    let is_early_withdrawal = now < deposit.end_date;

    let penalty = if is_early_withdrawal {
        (deposit.amount * policy.penalty_rate).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let hours_until_maturity = if is_early_withdrawal {
        let secs = (deposit.end_date - now).num_seconds();
        (secs + 3599) / 3600
    } else {
        0
    };

    Ok(WithdrawalQuote {
        deposit_id: deposit.id,
        amount: deposit.amount,
        lock_period_in_days: deposit.lock_period_in_days,
        deposit_date: deposit.start_date,
        penalty,
        flat_fee: policy.flat_fee,
        net_amount: deposit.amount - penalty - policy.flat_fee,
        can_withdraw: policy.allow_early_withdrawal || !is_early_withdrawal,
        is_early_withdrawal,
        hours_until_maturity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn deposit(amount: Decimal, days: u32) -> Deposit {
        Deposit::new("alice", amount, days, start()).unwrap()
    }

    #[test]
    fn early_withdrawal_one_hour_after_deposit() {
        // amount=100, 7 days, one hour in: 10% penalty + E5 fee
        let d = deposit(dec!(100), 7);
        let q = evaluate(&d, start() + Duration::hours(1), &LedgerPolicy::default()).unwrap();

        assert!(q.is_early_withdrawal);
        assert!(q.can_withdraw);
        assert_eq!(q.penalty, dec!(10.00));
        assert_eq!(q.flat_fee, dec!(5));
        assert_eq!(q.net_amount, dec!(85.00));
        assert_eq!(q.hours_until_maturity, 7 * 24 - 1);
    }

    #[test]
    fn matured_withdrawal_keeps_full_amount_minus_fee() {
        // same deposit, 8 days in: no penalty, only the flat fee
        let d = deposit(dec!(100), 7);
        let q = evaluate(&d, start() + Duration::days(8), &LedgerPolicy::default()).unwrap();

        assert!(!q.is_early_withdrawal);
        assert_eq!(q.penalty, Decimal::ZERO);
        assert_eq!(q.net_amount, dec!(95.00));
        assert_eq!(q.hours_until_maturity, 0);
    }

    #[test]
    fn penalty_is_flat_ten_percent_for_every_instant_before_maturity() {
        let d = deposit(dec!(250), 3);
        let policy = LedgerPolicy::default();

        for hours in [0, 1, 12, 24, 48, 71] {
            let q = evaluate(&d, start() + Duration::hours(hours), &policy).unwrap();
            assert_eq!(q.penalty, dec!(25.00), "at +{}h", hours);
        }
        for hours in [72, 73, 100] {
            let q = evaluate(&d, start() + Duration::hours(hours), &policy).unwrap();
            assert_eq!(q.penalty, Decimal::ZERO, "at +{}h", hours);
        }
    }

    #[test]
    fn penalty_applies_uniformly_across_lock_tiers() {
        // the 7- and 30-day tiers get the same pre-maturity penalty as 1-3 days
        let policy = LedgerPolicy::default();
        for days in [1, 2, 3, 7, 30] {
            let d = deposit(dec!(80), days);
            let q = evaluate(&d, start() + Duration::minutes(30), &policy).unwrap();
            assert_eq!(q.penalty, dec!(8.00), "for {} day lock", days);
        }
    }

    #[test]
    fn evaluation_is_pure() {
        let d = deposit(dec!(123.45), 7);
        let at = start() + Duration::hours(36);
        let policy = LedgerPolicy::default();

        let a = evaluate(&d, at, &policy).unwrap();
        let b = evaluate(&d, at, &policy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hours_until_maturity_rounds_up() {
        let d = deposit(dec!(100), 1);

        // 23h30m remaining rounds up to 24
        let q = evaluate(&d, start() + Duration::minutes(30), &LedgerPolicy::default()).unwrap();
        assert_eq!(q.hours_until_maturity, 24);

        // exactly on the hour stays exact
        let q = evaluate(&d, start() + Duration::hours(20), &LedgerPolicy::default()).unwrap();
        assert_eq!(q.hours_until_maturity, 4);

        // one second short of maturity still reports a full hour
        let q = evaluate(&d, d.end_date - Duration::seconds(1), &LedgerPolicy::default()).unwrap();
        assert_eq!(q.hours_until_maturity, 1);
    }

    #[test]
    fn maturity_boundary_is_inclusive() {
        let d = deposit(dec!(100), 2);
        let q = evaluate(&d, d.end_date, &LedgerPolicy::default()).unwrap();
        assert!(!q.is_early_withdrawal);
        assert_eq!(q.penalty, Decimal::ZERO);
    }

    #[test]
    fn penalty_rounds_to_cents() {
        let d = deposit(dec!(33.33), 7);
        let q = evaluate(&d, start() + Duration::hours(1), &LedgerPolicy::default()).unwrap();
        assert_eq!(q.penalty, dec!(3.33));
        assert_eq!(q.net_amount, dec!(25.00));
    }

    #[test]
    fn corrupted_deposit_is_an_invariant_violation() {
        let mut d = deposit(dec!(100), 7);
        d.amount = Decimal::ZERO;
        let err = evaluate(&d, start(), &LedgerPolicy::default()).unwrap_err();
        assert!(matches!(err, VaultError::InvariantViolation(_)));

        let mut d = deposit(dec!(100), 7);
        d.end_date = d.start_date - Duration::days(1);
        let err = evaluate(&d, start(), &LedgerPolicy::default()).unwrap_err();
        assert!(matches!(err, VaultError::InvariantViolation(_)));
    }

    #[test]
    fn lockout_policy_disables_early_withdrawal_only() {
        let policy = LedgerPolicy {
            allow_early_withdrawal: false,
            ..LedgerPolicy::default()
        };
        let d = deposit(dec!(100), 7);

        let early = evaluate(&d, start() + Duration::hours(1), &policy).unwrap();
        assert!(!early.can_withdraw);

        let matured = evaluate(&d, start() + Duration::days(8), &policy).unwrap();
        assert!(matured.can_withdraw);
    }
}
