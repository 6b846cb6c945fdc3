use rust_decimal::Decimal;
use time::Date;

use crate::fx::{FxError, RateResolver};
use crate::ledger::{Currency, InterestRow};
use crate::util::decimal::round2;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct InterestResultRow {
    pub date: Date,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub rate: Decimal,
    pub amount_base: Decimal,
    pub tax_estimate: Decimal,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct InterestReport {
    pub rows: Vec<InterestResultRow>,
    pub amount_base_sum: Decimal,
    pub tax_estimate_sum: Decimal,
}

// Interest credited on idle cash is plain income: converted, then taxed
// at the flat rate.
pub fn aggregate_interest(
    interest: &Option<Vec<InterestRow>>,
    resolver: &RateResolver,
    tax_rate: Decimal,
) -> Result<Option<InterestReport>, FxError> {
    let interest = match interest {
        Some(i) => i,
        None => return Ok(None),
    };

    let mut rows = Vec::with_capacity(interest.len());
    for row in interest.iter().filter(|r| resolver.is_tracked(&r.currency)) {
        let rate = resolver.rate(row.date, &row.currency)?;
        let amount_base = round2(row.amount * rate);
        let tax_estimate = round2(row.amount * rate * tax_rate);
        rows.push(InterestResultRow {
            date: row.date,
            description: row.description.clone(),
            amount: row.amount,
            currency: row.currency.clone(),
            rate,
            amount_base,
            tax_estimate,
        });
    }
    rows.sort_by_key(|r| r.date);

    let amount_base_sum = round2(rows.iter().map(|r| r.amount_base).sum());
    let tax_estimate_sum = round2(rows.iter().map(|r| r.tax_estimate).sum());
    Ok(Some(InterestReport {
        rows,
        amount_base_sum,
        tax_estimate_sum,
    }))
}
