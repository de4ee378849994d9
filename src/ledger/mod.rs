pub mod deposit;
pub mod quote;
pub mod revenue;
pub mod selection;
pub mod store;
pub mod transaction;
pub mod vault;

pub use deposit::{Deposit, DepositStatus};
pub use quote::{evaluate, LedgerPolicy, WithdrawalQuote};
pub use revenue::RevenueReport;
pub use selection::WithdrawalTotals;
pub use store::VaultLedger;
pub use transaction::{Transaction, TransactionType};
