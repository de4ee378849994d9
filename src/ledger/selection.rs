use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::quote::WithdrawalQuote;

/// Totals over a chosen set of withdrawal quotes.
///
/// The same computation backs the client-facing preview and the
/// authoritative commit path; the commit re-derives every value from fresh
/// quotes instead of trusting anything submitted with the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalTotals {
    pub deposits_count: u32,
    pub total_original: Decimal,
    pub total_fees: Decimal,
    pub total_penalties: Decimal,
    pub total_net: Decimal,
}

/// Sums a selection of quotes into a single payout figure.
pub fn aggregate<'a, I>(selected: I) -> WithdrawalTotals
where
    I: IntoIterator<Item = &'a WithdrawalQuote>,
{
    let mut totals = WithdrawalTotals {
        deposits_count: 0,
        total_original: Decimal::ZERO,
        total_fees: Decimal::ZERO,
        total_penalties: Decimal::ZERO,
        total_net: Decimal::ZERO,
    };

    for quote in selected {
        totals.deposits_count += 1;
        totals.total_original += quote.amount;
        totals.total_fees += quote.flat_fee;
        totals.total_penalties += quote.penalty;
        totals.total_net += quote.net_amount;
    }

    totals
}
