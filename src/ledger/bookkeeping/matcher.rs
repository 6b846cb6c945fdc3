use std::collections::BTreeMap;

use itertools::Itertools;
use rust_decimal::Decimal;
use time::Date;

use crate::fx::{FxError, RateResolver};
use crate::ledger::{
    classify, Currency, Execution, LedgerError, Security, SecurityClass,
};
use crate::log::WriteHandle;
use crate::util::decimal::{round2, PosDecimal};
use crate::write_errln;

use super::{Lot, OpenPositions};

// One side of a matched buy/sell pair, for a shared quantity.
// Quantity is still signed here (positive buy side, negative sell side);
// the sign moves into `side` during enrichment.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DisposalFragment {
    pub security: Security,
    pub class: SecurityClass,
    pub date: Date,
    pub price: Decimal,
    pub fee: Decimal,
    pub quantity: Decimal,
    pub currency: Currency,
}

// The matching result for one year: merged disposal fragments, plus the
// securities whose matching was invalidated by a short sale.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct YearMatch {
    pub fragments: Vec<DisposalFragment>,
    pub rejected: Vec<Security>,
}

// Owns the open-position queues across the whole multi-year run.
// Nothing else may mutate them.
pub struct LotMatcher {
    positions: OpenPositions,
}

impl LotMatcher {
    pub fn new() -> LotMatcher {
        LotMatcher {
            positions: OpenPositions::new(),
        }
    }

    pub fn positions(&self) -> &OpenPositions {
        &self.positions
    }

    // Matches one year's executions against the carried queues.
    // Executions are grouped per security and consumed in ascending
    // (date, read order); years must be fed oldest-first.
    pub fn match_year(
        &mut self,
        executions: &[Execution],
        err_stream: &mut WriteHandle,
    ) -> YearMatch {
        let mut by_security: BTreeMap<Security, Vec<&Execution>> = BTreeMap::new();
        for ex in executions {
            by_security.entry(ex.security.clone()).or_default().push(ex);
        }

        let mut fragments: Vec<DisposalFragment> = Vec::new();
        let mut rejected: Vec<Security> = Vec::new();

        for (security, mut execs) in by_security {
            execs.sort();
            match self.match_security(&security, &execs) {
                Ok(mut frags) => fragments.append(&mut frags),
                Err(LedgerError::ShortSaleRejected { security: sec }) => {
                    // The whole security's matching for this year is
                    // invalid; partial results are never reported.
                    write_errln!(
                        err_stream,
                        "{} was sold in a greater quantity than was bought. \
                         Short selling is not supported; its trades are \
                         excluded from this year's report.",
                        sec
                    );
                    rejected.push(sec);
                }
                Err(e) => {
                    write_errln!(err_stream, "{}", e);
                    rejected.push(security);
                }
            }
        }

        YearMatch {
            fragments: merge_fragments(fragments),
            rejected,
        }
    }

    fn match_security(
        &mut self,
        security: &Security,
        execs: &[&Execution],
    ) -> Result<Vec<DisposalFragment>, LedgerError> {
        let class = classify(security);
        let queue = self.positions.queue_mut(security);
        let mut frags: Vec<DisposalFragment> = Vec::new();

        for ex in execs {
            let quantity = match PosDecimal::try_from(ex.quantity) {
                Ok(q) => {
                    // Buy: opens a lot at the queue tail.
                    queue.push_opened(Lot {
                        date: ex.date,
                        price: ex.price,
                        fee: ex.fee,
                        quantity: q,
                        currency: ex.currency.clone(),
                        proceeds: ex.proceeds,
                    });
                    continue;
                }
                Err(_) => match PosDecimal::try_from(-ex.quantity) {
                    Ok(q) => q,
                    // Zero-quantity rows carry no position change.
                    Err(_) => continue,
                },
            };

            // Sell: consume head lots until the quantity is satisfied.
            let mut remaining = quantity;
            loop {
                let lot = match queue.pop_oldest() {
                    Some(l) => l,
                    None => {
                        return Err(LedgerError::ShortSaleRejected {
                            security: security.clone(),
                        })
                    }
                };

                let matched = lot.quantity.min(remaining);
                // Buy side of the pair
                frags.push(DisposalFragment {
                    security: security.clone(),
                    class,
                    date: lot.date,
                    price: lot.price,
                    fee: lot.fee,
                    quantity: *matched,
                    currency: lot.currency.clone(),
                });
                // Sell side of the pair
                frags.push(DisposalFragment {
                    security: security.clone(),
                    class,
                    date: ex.date,
                    price: ex.price,
                    fee: ex.fee,
                    quantity: -*matched,
                    currency: ex.currency.clone(),
                });

                if let Some(rem_lot) = lot.split_off(matched) {
                    // Partially consumed: the remainder keeps its FIFO
                    // priority at the head of the queue.
                    queue.push_front_remainder(rem_lot);
                }

                remaining = match remaining.checked_sub(matched) {
                    Some(r) => r,
                    None => break,
                };
            }
        }

        Ok(frags)
    }
}

// Partial-lot splitting leaves fragment noise: several rows that differ
// only in quantity. Collapse them by summing quantities over the shared
// (security, class, date, price, fee, currency) key.
fn merge_fragments(mut frags: Vec<DisposalFragment>) -> Vec<DisposalFragment> {
    let key_cmp = |a: &DisposalFragment, b: &DisposalFragment| {
        a.security
            .cmp(&b.security)
            .then(a.class.cmp(&b.class))
            .then(a.date.cmp(&b.date))
            .then(a.price.cmp(&b.price))
            .then(a.fee.cmp(&b.fee))
            .then(a.currency.cmp(&b.currency))
    };
    frags.sort_by(|a, b| key_cmp(a, b));
    frags
        .into_iter()
        .coalesce(|a, b| {
            if key_cmp(&a, &b) == std::cmp::Ordering::Equal {
                let mut merged = a;
                merged.quantity += b.quantity;
                Ok(merged)
            } else {
                Err((a, b))
            }
        })
        // A same-day buy and sell at identical price and fee cancels out.
        .filter(|f| !f.quantity.is_zero())
        .collect()
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn pretty_str(&self) -> &str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_str())
    }
}

// A fully enriched disposal-event row: unsigned quantity, fee as a
// positive cost, and base-currency conversion applied. Every derived
// column is rounded to 2 places at the point of computation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DisposalRow {
    pub security: Security,
    pub class: SecurityClass,
    pub side: TradeSide,
    pub date: Date,
    pub price: Decimal,
    pub fee: Decimal,
    pub quantity: Decimal,
    pub currency: Currency,
    pub proceeds: Decimal,
    pub amount: Decimal,
    pub rate: Decimal,
    pub amount_base: Decimal,
    pub tax_estimate: Decimal,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TradeReport {
    pub rows: Vec<DisposalRow>,
    pub income_base_sum_equity: Decimal,
    pub income_base_sum_derivative: Decimal,
    pub tax_estimate_sum_equity: Decimal,
    pub tax_estimate_sum_derivative: Decimal,
    pub rejected: Vec<Security>,
}

impl TradeReport {
    pub fn rows_of_class(&self, class: SecurityClass) -> Vec<&DisposalRow> {
        self.rows.iter().filter(|r| r.class == class).collect()
    }
}

// Converts merged fragments into the report rows and per-bucket sums.
// Equity and derivative disposals are taxed as separate buckets.
pub fn trade_report(
    year_match: &YearMatch,
    resolver: &RateResolver,
    tax_rate: Decimal,
) -> Result<TradeReport, FxError> {
    let mut rows: Vec<DisposalRow> = Vec::with_capacity(year_match.fragments.len());

    for frag in &year_match.fragments {
        let side = if crate::util::decimal::is_positive(&frag.quantity) {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };
        let price = round2(frag.price);
        let fee = round2(frag.fee.abs());
        // Buying is money out, selling is money in.
        let proceeds = round2(-(price * frag.quantity));
        let amount = round2(proceeds - fee);
        let rate = resolver.rate(frag.date, &frag.currency)?;
        let amount_base = round2(amount * rate);
        let tax_estimate = round2(amount * rate * tax_rate);

        rows.push(DisposalRow {
            security: frag.security.clone(),
            class: frag.class,
            side,
            date: frag.date,
            price,
            fee,
            quantity: frag.quantity.abs(),
            currency: frag.currency.clone(),
            proceeds,
            amount,
            rate,
            amount_base,
            tax_estimate,
        });
    }

    rows.sort_by(|a, b| {
        a.security
            .cmp(&b.security)
            .then(a.side.cmp(&b.side))
            .then(a.date.cmp(&b.date))
    });

    let bucket_sum = |class: SecurityClass| -> Decimal {
        rows.iter()
            .filter(|r| r.class == class)
            .map(|r| r.amount_base)
            .sum()
    };
    let equity_sum = bucket_sum(SecurityClass::Equity);
    let derivative_sum = bucket_sum(SecurityClass::Derivative);

    Ok(TradeReport {
        rows,
        income_base_sum_equity: round2(equity_sum),
        income_base_sum_derivative: round2(derivative_sum),
        tax_estimate_sum_equity: round2(equity_sum * tax_rate),
        tax_estimate_sum_derivative: round2(derivative_sum * tax_rate),
        rejected: year_match.rejected.clone(),
    })
}
