use rust_decimal::Decimal;

use crate::ledger::deposit::Deposit;

/// Per-user container of deposits and derived balance.
///
/// `balance` is a cache of `sum(amount of deposits not yet WITHDRAWN)`,
/// refreshed on every mutation; `recompute_balance` is the reconciliation
/// source of truth.
#[derive(Debug)]
pub struct Vault {
    pub user_id: String,
    pub balance: Decimal,
    pub deposits: Vec<Deposit>,
}

impl Vault {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            balance: Decimal::ZERO,
            deposits: Vec::new(),
        }
    }

    pub fn active_deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.iter().filter(|d| d.is_active())
    }

    pub fn recompute_balance(&self) -> Decimal {
        self.active_deposits().map(|d| d.amount).sum()
    }

    pub(crate) fn push_deposit(&mut self, deposit: Deposit) {
        self.deposits.push(deposit);
        self.balance = self.recompute_balance();
    }

    pub(crate) fn find_mut(&mut self, id: uuid::Uuid) -> Option<&mut Deposit> {
        self.deposits.iter_mut().find(|d| d.id == id)
    }

    pub fn find(&self, id: uuid::Uuid) -> Option<&Deposit> {
        self.deposits.iter().find(|d| d.id == id)
    }

    /// Count of active deposits whose lock period has elapsed.
    pub fn matured_count(&self, now: chrono::DateTime<chrono::Utc>) -> usize {
        self.active_deposits().filter(|d| d.is_matured(now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn balance_tracks_active_deposits_only() {
        let mut vault = Vault::new("alice");
        assert_eq!(vault.balance, Decimal::ZERO);

        vault.push_deposit(Deposit::new("alice", dec!(100), 7, now()).unwrap());
        vault.push_deposit(Deposit::new("alice", dec!(40.50), 1, now()).unwrap());
        assert_eq!(vault.balance, dec!(140.50));

        let id = vault.deposits[0].id;
        vault.find_mut(id).unwrap().mark_withdrawn(now()).unwrap();
        vault.balance = vault.recompute_balance();
        assert_eq!(vault.balance, dec!(40.50));
    }

    #[test]
    fn cached_balance_reconciles_with_recomputation() {
        let mut vault = Vault::new("alice");
        for amount in [dec!(10), dec!(25.25), dec!(300)] {
            vault.push_deposit(Deposit::new("alice", amount, 2, now()).unwrap());
        }
        assert_eq!(vault.balance, vault.recompute_balance());

        let id = vault.deposits[1].id;
        vault.find_mut(id).unwrap().mark_withdrawn(now()).unwrap();
        vault.balance = vault.recompute_balance();
        assert_eq!(vault.balance, dec!(310));
        assert_eq!(vault.balance, vault.recompute_balance());
    }

    #[test]
    fn deposits_keep_insertion_order() {
        let mut vault = Vault::new("alice");
        let first = Deposit::new("alice", dec!(10), 1, now()).unwrap();
        let second = Deposit::new("alice", dec!(20), 1, now()).unwrap();
        let (a, b) = (first.id, second.id);
        vault.push_deposit(first);
        vault.push_deposit(second);

        let ids: Vec<_> = vault.deposits.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
