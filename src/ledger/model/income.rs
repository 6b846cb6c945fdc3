use rust_decimal::Decimal;
use time::Date;

use super::currency::Currency;
use super::security::Security;

// Typed rows for the non-trade statement sections. Column-name mapping
// happens once, at ingestion; everything downstream works on these.

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DividendRow {
    pub security: Security,
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
}

// Row-aligned with DividendRow when present. Amounts are negative in
// statements (money withheld).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct WithholdingRow {
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
}

// A later correction to previously reported dividends.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AccrualRow {
    pub security: Security,
    pub date: Date,
    pub gross_amount: Decimal,
    pub tax: Decimal,
    pub currency: Currency,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FeeRow {
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct InterestRow {
    pub date: Date,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CashTransferRow {
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
}
