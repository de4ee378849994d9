use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::ledger::deposit::{Deposit, DepositStatus};
use crate::ledger::quote::{evaluate, LedgerPolicy, WithdrawalQuote};
use crate::ledger::revenue::RevenueReport;
use crate::ledger::selection::{aggregate, WithdrawalTotals};
use crate::ledger::transaction::Transaction;
use crate::ledger::vault::Vault;

/// How many recent transactions the vault-info projection returns.
const RECENT_TRANSACTIONS_LIMIT: usize = 10;

/// Owns every vault and the append-only transaction log.
///
/// Mutations are serialized per vault: each vault sits behind its own
/// `tokio::sync::Mutex`, and `commit_withdrawal` re-verifies every named
/// deposit inside that lock, so a quote read before the lock was acquired
/// can never be persisted.
pub struct VaultLedger {
    policy: LedgerPolicy,
    vaults: DashMap<String, Arc<Mutex<Vault>>>,
    transactions: RwLock<Vec<Transaction>>,
    // orderId -> receipt of the deposit it already produced; makes client
    // retries of the collection request safe without retrying the mutation
    orders: DashMap<String, DepositReceipt>,
}

#[derive(Debug, Clone)]
pub struct DepositReceipt {
    pub deposit_id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub lock_period_in_days: u32,
    pub momo_transaction_id: String,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    pub reference_id: Uuid,
    #[serde(flatten)]
    pub totals: WithdrawalTotals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultBalance {
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSummary {
    pub total_locked_amount: Decimal,
    pub total_deposits: usize,
    pub withdrawable_deposits_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
    pub vault: VaultBalance,
    pub locked_deposits: Vec<Deposit>,
    pub recent_transactions: Vec<Transaction>,
    pub deposit_summary: DepositSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    pub user_id: String,
    pub balance: Decimal,
    pub active_deposits: usize,
    pub total_deposits: usize,
}

impl VaultLedger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            vaults: DashMap::new(),
            transactions: RwLock::new(Vec::new()),
            orders: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    fn vault_handle(&self, user_id: &str) -> Arc<Mutex<Vault>> {
        self.vaults
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vault::new(user_id))))
            .clone()
    }

    /// Looks up a previously processed collection order. Lets callers short
    /// circuit a retried orderId before asking the gateway to charge again.
    pub fn find_order(&self, order_id: &str) -> Option<DepositReceipt> {
        self.orders.get(order_id).map(|previous| {
            let mut receipt = previous.clone();
            receipt.replayed = true;
            receipt
        })
    }

    /// Records a collected deposit. A repeated `order_id` returns the
    /// original receipt instead of creating a second deposit.
    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        lock_period_in_days: u32,
        order_id: &str,
        momo_transaction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DepositReceipt> {
        if order_id.trim().is_empty() {
            return Err(VaultError::Validation("orderId must not be empty".to_string()));
        }
        if let Some(previous) = self.orders.get(order_id) {
            let mut receipt = previous.clone();
            receipt.replayed = true;
            tracing::info!(order_id, deposit_id = %receipt.deposit_id, "Replaying already-processed deposit order");
            return Ok(receipt);
        }

        let deposit = Deposit::new(user_id, amount, lock_period_in_days, now)?;
        let receipt = DepositReceipt {
            deposit_id: deposit.id,
            user_id: user_id.to_string(),
            amount,
            lock_period_in_days,
            momo_transaction_id: momo_transaction_id.to_string(),
            replayed: false,
        };

        let handle = self.vault_handle(user_id);
        let mut vault = handle.lock().await;
        vault.push_deposit(deposit);

        self.transactions.write().await.push(Transaction::deposit(
            user_id,
            amount,
            Some(momo_transaction_id.to_string()),
            now,
        ));

        self.orders.insert(order_id.to_string(), receipt.clone());

        tracing::info!(
            user_id,
            amount = %amount,
            lock_period_in_days,
            balance = %vault.balance,
            "Deposit recorded"
        );

        Ok(receipt)
    }

    /// Projection backing the home/deposit/withdraw screens.
    pub async fn vault_info(&self, user_id: &str, now: DateTime<Utc>) -> VaultInfo {
        let handle = self.vault_handle(user_id);
        let mut vault = handle.lock().await;
        for deposit in vault.deposits.iter_mut() {
            deposit.refresh_status(now);
        }

        let locked_deposits: Vec<Deposit> = vault.active_deposits().cloned().collect();
        let deposit_summary = DepositSummary {
            total_locked_amount: vault.balance,
            total_deposits: locked_deposits.len(),
            withdrawable_deposits_count: vault.matured_count(now),
        };
        let balance = vault.balance;
        drop(vault);

        let transactions = self.transactions.read().await;
        let recent_transactions: Vec<Transaction> = transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(RECENT_TRANSACTIONS_LIMIT)
            .cloned()
            .collect();

        VaultInfo {
            vault: VaultBalance { balance },
            locked_deposits,
            recent_transactions,
            deposit_summary,
        }
    }

    /// Quotes every active deposit at `now`. Callers wanting a "no penalty"
    /// subset filter on `penalty == 0`.
    pub async fn list_withdrawable(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<WithdrawalQuote>> {
        let handle = self.vault_handle(user_id);
        let mut vault = handle.lock().await;

        let mut quotes = Vec::new();
        for deposit in vault.deposits.iter_mut() {
            deposit.refresh_status(now);
            if deposit.is_active() {
                quotes.push(evaluate(deposit, now, &self.policy)?);
            }
        }
        Ok(quotes)
    }

    /// Atomically withdraws the named deposits.
    ///
    /// Every id is re-resolved and re-quoted inside the vault lock; the
    /// batch is all-or-nothing, so one bad id leaves the vault untouched.
    pub async fn commit_withdrawal(
        &self,
        user_id: &str,
        deposit_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<WithdrawalReceipt> {
        if deposit_ids.is_empty() {
            return Err(VaultError::Validation(
                "Select at least one deposit to withdraw".to_string(),
            ));
        }
        let selected: HashSet<Uuid> = deposit_ids.iter().copied().collect();

        let handle = self.vault_handle(user_id);
        let mut vault = handle.lock().await;

        // validate the whole batch before touching anything
        let mut quotes = Vec::with_capacity(selected.len());
        for id in &selected {
            let deposit = vault.find(*id).ok_or_else(|| {
                VaultError::NotFound(format!("Deposit {} does not belong to this vault", id))
            })?;
            if deposit.status == DepositStatus::Withdrawn {
                return Err(VaultError::Conflict(format!(
                    "Deposit {} was already withdrawn",
                    id
                )));
            }
            let quote = evaluate(deposit, now, &self.policy)?;
            if !quote.can_withdraw {
                return Err(VaultError::Validation(format!(
                    "Deposit {} is still locked for {} more hour(s)",
                    id, quote.hours_until_maturity
                )));
            }
            quotes.push(quote);
        }

        let totals = aggregate(&quotes);

        // apply: mark everything withdrawn, then reconcile the balance
        for quote in &quotes {
            vault
                .find_mut(quote.deposit_id)
                .ok_or_else(|| {
                    VaultError::InvariantViolation(format!(
                        "Deposit {} vanished during commit",
                        quote.deposit_id
                    ))
                })?
                .mark_withdrawn(now)?;
        }
        vault.balance = vault.recompute_balance();

        let reference_id = Uuid::new_v4();
        let mut transactions = self.transactions.write().await;
        transactions.push(Transaction::withdrawal(
            user_id,
            totals.total_net,
            totals.total_fees,
            totals.deposits_count,
            Some(reference_id.to_string()),
            now,
        ));
        for quote in &quotes {
            if quote.penalty > Decimal::ZERO {
                transactions.push(Transaction::penalty(
                    user_id,
                    quote.penalty,
                    Some(reference_id.to_string()),
                    now,
                ));
            }
        }
        drop(transactions);

        tracing::info!(
            user_id,
            %reference_id,
            deposits = totals.deposits_count,
            net = %totals.total_net,
            penalties = %totals.total_penalties,
            balance = %vault.balance,
            "Withdrawal committed"
        );

        Ok(WithdrawalReceipt { reference_id, totals })
    }

    pub async fn all_transactions(&self) -> Vec<Transaction> {
        let transactions = self.transactions.read().await;
        let mut out: Vec<Transaction> = transactions.clone();
        out.reverse();
        out
    }

    pub async fn all_vaults(&self) -> Vec<VaultSummary> {
        let mut summaries = Vec::with_capacity(self.vaults.len());
        for entry in self.vaults.iter() {
            let vault = entry.value().lock().await;
            summaries.push(VaultSummary {
                user_id: vault.user_id.clone(),
                balance: vault.balance,
                active_deposits: vault.active_deposits().count(),
                total_deposits: vault.deposits.len(),
            });
        }
        summaries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        summaries
    }

    /// Read-only revenue projection, recomputed from the transaction log on
    /// every call so there is no stored total to drift.
    pub async fn revenue_report(&self) -> RevenueReport {
        let mut locked_funds = Decimal::ZERO;
        let mut total_users = 0u64;
        for entry in self.vaults.iter() {
            let vault = entry.value().lock().await;
            locked_funds += vault.balance;
            total_users += 1;
        }

        let transactions = self.transactions.read().await;
        RevenueReport::compute(&transactions, total_users, locked_funds)
    }

    /// Periodic operational snapshot, logged by the background task.
    pub async fn log_stats(&self) {
        let report = self.revenue_report().await;
        tracing::info!(
            users = report.system_stats.total_users,
            locked_funds = %report.system_stats.current_locked_funds,
            revenue = %report.revenue_breakdown.total_revenue,
            deposits = report.system_stats.total_deposits,
            withdrawals = report.system_stats.total_withdrawals,
            "Ledger snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::transaction::TransactionType;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn ledger() -> VaultLedger {
        VaultLedger::new(LedgerPolicy::default())
    }

    #[tokio::test]
    async fn deposit_appends_and_updates_balance() {
        let ledger = ledger();
        let receipt = ledger
            .deposit("alice", dec!(100), 7, "ORD-1", "MOMO-1", start())
            .await
            .unwrap();
        assert!(!receipt.replayed);

        let info = ledger.vault_info("alice", start()).await;
        assert_eq!(info.vault.balance, dec!(100));
        assert_eq!(info.locked_deposits.len(), 1);
        assert_eq!(info.deposit_summary.withdrawable_deposits_count, 0);
        assert_eq!(info.recent_transactions.len(), 1);
        assert_eq!(info.recent_transactions[0].tx_type, TransactionType::Deposit);
    }

    #[tokio::test]
    async fn deposit_below_minimum_is_rejected_and_unrecorded() {
        let ledger = ledger();
        let err = ledger
            .deposit("alice", dec!(9.99), 7, "ORD-1", "MOMO-1", start())
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));

        let info = ledger.vault_info("alice", start()).await;
        assert_eq!(info.vault.balance, Decimal::ZERO);
        assert!(info.recent_transactions.is_empty());
    }

    #[tokio::test]
    async fn replayed_order_id_does_not_double_charge() {
        let ledger = ledger();
        let first = ledger
            .deposit("alice", dec!(100), 7, "ORD-1", "MOMO-1", start())
            .await
            .unwrap();
        let second = ledger
            .deposit("alice", dec!(100), 7, "ORD-1", "MOMO-2", start() + Duration::minutes(1))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(second.deposit_id, first.deposit_id);
        assert_eq!(second.momo_transaction_id, first.momo_transaction_id);

        let info = ledger.vault_info("alice", start()).await;
        assert_eq!(info.vault.balance, dec!(100));
        assert_eq!(info.locked_deposits.len(), 1);
    }

    #[tokio::test]
    async fn withdrawable_listing_quotes_every_active_deposit() {
        let ledger = ledger();
        ledger.deposit("alice", dec!(100), 1, "O1", "M1", start()).await.unwrap();
        ledger.deposit("alice", dec!(200), 7, "O2", "M2", start()).await.unwrap();

        // two days in: the 1-day deposit matured, the 7-day one did not
        let quotes = ledger
            .list_withdrawable("alice", start() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(quotes.len(), 2);

        let matured = quotes.iter().find(|q| q.amount == dec!(100)).unwrap();
        assert_eq!(matured.penalty, Decimal::ZERO);
        assert!(!matured.is_early_withdrawal);

        let early = quotes.iter().find(|q| q.amount == dec!(200)).unwrap();
        assert_eq!(early.penalty, dec!(20.00));
        assert!(early.is_early_withdrawal);
        assert!(early.can_withdraw);
    }

    #[tokio::test]
    async fn commit_withdrawal_totals_and_transactions() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(50), 7, "O1", "M1", start()).await.unwrap();
        let b = ledger.deposit("alice", dec!(100), 7, "O2", "M2", start()).await.unwrap();

        let receipt = ledger
            .commit_withdrawal("alice", &[a.deposit_id, b.deposit_id], start() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(receipt.totals.deposits_count, 2);
        assert_eq!(receipt.totals.total_original, dec!(150));
        assert_eq!(receipt.totals.total_fees, dec!(10));
        assert_eq!(receipt.totals.total_penalties, dec!(15.00));
        assert_eq!(receipt.totals.total_net, dec!(125.00));

        let info = ledger.vault_info("alice", start() + Duration::hours(2)).await;
        assert_eq!(info.vault.balance, Decimal::ZERO);
        assert!(info.locked_deposits.is_empty());

        // one aggregate withdrawal entry plus one penalty entry per deposit
        let txs = ledger.all_transactions().await;
        let withdrawals: Vec<_> = txs.iter().filter(|t| t.tx_type == TransactionType::Withdrawal).collect();
        let penalties: Vec<_> = txs.iter().filter(|t| t.tx_type == TransactionType::Penalty).collect();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].amount, dec!(125.00));
        assert_eq!(withdrawals[0].penalty_fee, dec!(10));
        assert_eq!(withdrawals[0].deposits_count, 2);
        assert_eq!(penalties.len(), 2);
    }

    #[tokio::test]
    async fn matured_withdrawal_emits_no_penalty_transactions() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(100), 1, "O1", "M1", start()).await.unwrap();

        let receipt = ledger
            .commit_withdrawal("alice", &[a.deposit_id], start() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(receipt.totals.total_penalties, Decimal::ZERO);
        assert_eq!(receipt.totals.total_net, dec!(95.00));

        let txs = ledger.all_transactions().await;
        assert!(txs.iter().all(|t| t.tx_type != TransactionType::Penalty));
    }

    #[tokio::test]
    async fn batch_with_foreign_id_is_rejected_atomically() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(100), 7, "O1", "M1", start()).await.unwrap();

        let err = ledger
            .commit_withdrawal("alice", &[a.deposit_id, Uuid::new_v4()], start() + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));

        // nothing was withdrawn
        let info = ledger.vault_info("alice", start() + Duration::hours(1)).await;
        assert_eq!(info.vault.balance, dec!(100));
        assert_eq!(ledger.all_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn batch_naming_withdrawn_deposit_is_rejected_atomically() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(100), 7, "O1", "M1", start()).await.unwrap();
        let b = ledger.deposit("alice", dec!(200), 7, "O2", "M2", start()).await.unwrap();

        ledger
            .commit_withdrawal("alice", &[a.deposit_id], start() + Duration::hours(1))
            .await
            .unwrap();

        let err = ledger
            .commit_withdrawal("alice", &[a.deposit_id, b.deposit_id], start() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));

        // the still-valid deposit was not partially withdrawn
        let info = ledger.vault_info("alice", start() + Duration::hours(2)).await;
        assert_eq!(info.vault.balance, dec!(200));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let ledger = ledger();
        let err = ledger.commit_withdrawal("alice", &[], start()).await.unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[tokio::test]
    async fn lockout_policy_blocks_early_commit() {
        let ledger = VaultLedger::new(LedgerPolicy {
            allow_early_withdrawal: false,
            ..LedgerPolicy::default()
        });
        let a = ledger.deposit("alice", dec!(100), 7, "O1", "M1", start()).await.unwrap();

        let err = ledger
            .commit_withdrawal("alice", &[a.deposit_id], start() + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));

        // matured commits still work
        ledger
            .commit_withdrawal("alice", &[a.deposit_id], start() + Duration::days(8))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_overlapping_commits_leave_one_winner() {
        let ledger = Arc::new(ledger());
        let a = ledger.deposit("alice", dec!(100), 7, "O1", "M1", start()).await.unwrap();
        let b = ledger.deposit("alice", dec!(200), 7, "O2", "M2", start()).await.unwrap();

        let now = start() + Duration::hours(1);
        let first = {
            let ledger = ledger.clone();
            let ids = vec![a.deposit_id, b.deposit_id];
            tokio::spawn(async move { ledger.commit_withdrawal("alice", &ids, now).await })
        };
        let second = {
            let ledger = ledger.clone();
            let ids = vec![b.deposit_id];
            tokio::spawn(async move { ledger.commit_withdrawal("alice", &ids, now).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let oks = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(oks, 1, "exactly one commit must win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(VaultError::Conflict(_)))));

        // whichever won, the balance reconciles with the surviving deposits
        let info = ledger.vault_info("alice", now).await;
        let expected: Decimal = info.locked_deposits.iter().map(|d| d.amount).sum();
        assert_eq!(info.vault.balance, expected);
    }

    #[tokio::test]
    async fn balance_reconciles_over_a_mixed_operation_sequence() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(100), 1, "O1", "M1", start()).await.unwrap();
        ledger.deposit("alice", dec!(250), 7, "O2", "M2", start()).await.unwrap();
        let c = ledger.deposit("alice", dec!(60), 3, "O3", "M3", start()).await.unwrap();

        ledger
            .commit_withdrawal("alice", &[a.deposit_id, c.deposit_id], start() + Duration::hours(5))
            .await
            .unwrap();
        ledger
            .deposit("alice", dec!(40), 2, "O4", "M4", start() + Duration::hours(6))
            .await
            .unwrap();

        let info = ledger.vault_info("alice", start() + Duration::hours(7)).await;
        let recomputed: Decimal = info.locked_deposits.iter().map(|d| d.amount).sum();
        assert_eq!(info.vault.balance, recomputed);
        assert_eq!(info.vault.balance, dec!(290));
    }

    #[tokio::test]
    async fn vaults_are_isolated_per_user() {
        let ledger = ledger();
        let a = ledger.deposit("alice", dec!(100), 7, "O1", "M1", start()).await.unwrap();
        ledger.deposit("bob", dec!(500), 7, "O2", "M2", start()).await.unwrap();

        // bob cannot withdraw alice's deposit
        let err = ledger
            .commit_withdrawal("bob", &[a.deposit_id], start() + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));

        let bob = ledger.vault_info("bob", start()).await;
        assert_eq!(bob.vault.balance, dec!(500));
    }
}
