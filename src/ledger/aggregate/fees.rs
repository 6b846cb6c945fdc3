use rust_decimal::Decimal;
use time::Date;

use crate::fx::{FxError, RateResolver};
use crate::ledger::{Currency, FeeRow};
use crate::util::decimal::round2;

// Broker charges arrive as negative amounts; the report shows them as
// positive costs.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FeeResultRow {
    pub date: Date,
    pub fee: Decimal,
    pub currency: Currency,
    pub rate: Decimal,
    pub fee_base: Decimal,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FeeReport {
    pub rows: Vec<FeeResultRow>,
    pub fee_base_sum: Decimal,
}

pub fn aggregate_fees(
    fees: &Option<Vec<FeeRow>>,
    resolver: &RateResolver,
) -> Result<Option<FeeReport>, FxError> {
    let fees = match fees {
        Some(f) => f,
        None => return Ok(None),
    };

    let mut rows = Vec::with_capacity(fees.len());
    for row in fees.iter().filter(|r| resolver.is_tracked(&r.currency)) {
        let fee = round2(-row.amount);
        let rate = resolver.rate(row.date, &row.currency)?;
        let fee_base = round2(fee * rate);
        rows.push(FeeResultRow {
            date: row.date,
            fee,
            currency: row.currency.clone(),
            rate,
            fee_base,
        });
    }

    let fee_base_sum = round2(rows.iter().map(|r| r.fee_base).sum());
    Ok(Some(FeeReport { rows, fee_base_sum }))
}
