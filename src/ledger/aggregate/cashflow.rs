use std::fmt::Display;

use itertools::Itertools;
use rust_decimal::Decimal;
use time::Date;

use crate::fx::RateResolver;
use crate::ledger::{CashTransferRow, Currency};
use crate::util::decimal::{is_positive, round2};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FlowKind {
    Deposit,
    Withdrawal,
}

impl FlowKind {
    pub fn pretty_str(&self) -> &str {
        match self {
            FlowKind::Deposit => "Deposit",
            FlowKind::Withdrawal => "Withdrawal",
        }
    }
}

impl Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_str())
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CashTransferResultRow {
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
    pub kind: FlowKind,
}

// Net movement per currency. Tax declarations want transfers listed and
// netted, but no tax arises from moving one's own money.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CashflowReport {
    pub rows: Vec<CashTransferResultRow>,
    pub sums_by_currency: Vec<(Currency, Decimal)>,
}

pub fn aggregate_cash_transfers(
    transfers: &Option<Vec<CashTransferRow>>,
    resolver: &RateResolver,
) -> Option<CashflowReport> {
    let transfers = match transfers {
        Some(t) => t,
        None => return None,
    };

    let rows: Vec<CashTransferResultRow> = transfers
        .iter()
        .filter(|r| resolver.is_tracked(&r.currency))
        .map(|r| CashTransferResultRow {
            date: r.date,
            amount: r.amount,
            currency: r.currency.clone(),
            kind: if is_positive(&r.amount) {
                FlowKind::Deposit
            } else {
                FlowKind::Withdrawal
            },
        })
        .collect();

    let mut sums_by_currency: Vec<(Currency, Decimal)> = rows
        .iter()
        .map(|r| (r.currency.clone(), r.amount))
        .into_grouping_map()
        .sum()
        .into_iter()
        .map(|(cur, sum)| (cur, round2(sum)))
        .collect();
    sums_by_currency.sort_by(|a, b| a.0.cmp(&b.0));

    Some(CashflowReport {
        rows,
        sums_by_currency,
    })
}
