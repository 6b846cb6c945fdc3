use rust_decimal::Decimal;
use time::Date;

use crate::fx::{FxError, RateResolver};
use crate::ledger::{AccrualRow, Currency, DividendRow, Security, WithholdingRow};
use crate::log::WriteHandle;
use crate::util::decimal::round2;
use crate::write_errln;

// One computed dividend (or accrual-correction) row. Every derived
// column is rounded to 2 places as it is computed.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DividendResultRow {
    pub security: Security,
    pub date: Date,
    pub amount: Decimal,
    pub currency: Currency,
    pub tax_paid: Decimal,
    pub rate: Decimal,
    pub amount_base: Decimal,
    pub tax_paid_base: Decimal,
    pub tax_full_base: Decimal,
    pub tax_rest_base: Decimal,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DividendReport {
    pub rows: Vec<DividendResultRow>,
    pub amount_base_sum: Decimal,
    pub tax_paid_base_sum: Decimal,
    pub tax_full_base_sum: Decimal,
    pub tax_rest_base_sum: Decimal,
}

// Plain dividends and accrual corrections share the identical formula;
// only the input rows differ.
fn compute_rows(
    inputs: Vec<(Security, Date, Decimal, Decimal, Currency)>,
    resolver: &RateResolver,
    tax_rate: Decimal,
) -> Result<DividendReport, FxError> {
    let mut rows = Vec::with_capacity(inputs.len());

    for (security, date, amount, tax_paid, currency) in inputs {
        let amount = round2(amount);
        let tax_paid = round2(tax_paid);
        let rate = resolver.rate(date, &currency)?;
        let amount_base = round2(amount * rate);
        let tax_paid_base = round2(tax_paid * rate);
        let tax_full_base = round2(amount_base * tax_rate);
        // May go negative when more was withheld than the flat rate asks
        // for; that is preserved, not floored.
        let tax_rest_base = round2(tax_full_base - tax_paid_base);

        rows.push(DividendResultRow {
            security,
            date,
            amount,
            currency,
            tax_paid,
            rate,
            amount_base,
            tax_paid_base,
            tax_full_base,
            tax_rest_base,
        });
    }

    let sum = |f: fn(&DividendResultRow) -> Decimal| -> Decimal {
        round2(rows.iter().map(f).sum())
    };

    Ok(DividendReport {
        amount_base_sum: sum(|r| r.amount_base),
        tax_paid_base_sum: sum(|r| r.tax_paid_base),
        tax_full_base_sum: sum(|r| r.tax_full_base),
        tax_rest_base_sum: sum(|r| r.tax_rest_base),
        rows,
    })
}

// Withholding rows match dividend rows 1:1, by position. If the counts
// disagree there is no safe way to pair them, so the withheld tax is
// treated as entirely missing and the full flat rate is still owed.
pub fn aggregate_dividends(
    dividends: &Option<Vec<DividendRow>>,
    withholding: &Option<Vec<WithholdingRow>>,
    resolver: &RateResolver,
    tax_rate: Decimal,
    err_stream: &mut WriteHandle,
) -> Result<Option<DividendReport>, FxError> {
    let dividends = match dividends {
        Some(d) => d,
        None => return Ok(None),
    };

    let div_rows: Vec<&DividendRow> = dividends
        .iter()
        .filter(|r| resolver.is_tracked(&r.currency))
        .collect();

    let tax_rows: Option<Vec<&WithholdingRow>> = withholding.as_ref().map(|w| {
        w.iter()
            .filter(|r| resolver.is_tracked(&r.currency))
            .collect()
    });

    let tax_rows = match tax_rows {
        Some(t) if t.len() == div_rows.len() => Some(t),
        Some(t) => {
            write_errln!(
                err_stream,
                "Dividend and withholding tax tables have mismatched row \
                 counts ({} vs {}). Assuming no tax was withheld; the full \
                 rate applies.",
                div_rows.len(),
                t.len()
            );
            None
        }
        None => {
            write_errln!(
                err_stream,
                "No withholding tax table found. Assuming no tax was \
                 withheld; the full rate applies."
            );
            None
        }
    };

    let inputs = div_rows
        .iter()
        .enumerate()
        .map(|(i, d)| {
            // Withheld amounts are negative in statements.
            let tax_paid = match &tax_rows {
                Some(t) => -t[i].amount,
                None => Decimal::ZERO,
            };
            (
                d.security.clone(),
                d.date,
                d.amount,
                tax_paid,
                d.currency.clone(),
            )
        })
        .collect();

    compute_rows(inputs, resolver, tax_rate).map(Some)
}

// Accrual corrections amend the year's dividend figures; they never
// replace them. The tax column arrives pre-signed in the statement.
pub fn aggregate_accruals(
    accruals: &Option<Vec<AccrualRow>>,
    resolver: &RateResolver,
    tax_rate: Decimal,
) -> Result<Option<DividendReport>, FxError> {
    let accruals = match accruals {
        Some(a) => a,
        None => return Ok(None),
    };

    let inputs = accruals
        .iter()
        .filter(|r| resolver.is_tracked(&r.currency))
        .map(|a| {
            (
                a.security.clone(),
                a.date,
                a.gross_amount,
                a.tax,
                a.currency.clone(),
            )
        })
        .collect();

    compute_rows(inputs, resolver, tax_rate).map(Some)
}

// Final year figures: dividends plus accrual corrections, added.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DividendFinalSummary {
    pub amount_base_sum: Decimal,
    pub tax_paid_base_sum: Decimal,
    pub tax_full_base_sum: Decimal,
    pub tax_rest_base_sum: Decimal,
}

pub fn dividend_final_summary(
    dividends: Option<&DividendReport>,
    accruals: Option<&DividendReport>,
) -> DividendFinalSummary {
    let z = Decimal::ZERO;
    let pick = |f: fn(&DividendReport) -> Decimal| -> Decimal {
        round2(dividends.map(f).unwrap_or(z) + accruals.map(f).unwrap_or(z))
    };
    DividendFinalSummary {
        amount_base_sum: pick(|r| r.amount_base_sum),
        tax_paid_base_sum: pick(|r| r.tax_paid_base_sum),
        tax_full_base_sum: pick(|r| r.tax_full_base_sum),
        tax_rest_base_sum: pick(|r| r.tax_rest_base_sum),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::fx::{DailyRate, RateResolver, RateSeries};
    use crate::ledger::{AccrualRow, Currency, DividendRow, WithholdingRow};
    use crate::log::WriteHandle;
    use crate::util::date::pub_testlib::doy_date;

    use super::{
        aggregate_accruals, aggregate_dividends, dividend_final_summary,
    };

    fn flat_resolver(rate: Decimal) -> RateResolver {
        let mut series = HashMap::new();
        series.insert(
            Currency::usd(),
            RateSeries::new(vec![DailyRate::new(doy_date(2015, 0), rate)]),
        );
        RateResolver::new(Currency::rub(), series)
    }

    fn div(doy: i64, amount: Decimal) -> DividendRow {
        DividendRow {
            security: "FOO".to_string(),
            date: doy_date(2021, doy),
            amount,
            currency: Currency::usd(),
        }
    }

    fn wh(doy: i64, amount: Decimal) -> WithholdingRow {
        WithholdingRow {
            date: doy_date(2021, doy),
            amount,
            currency: Currency::usd(),
        }
    }

    #[test]
    fn test_matched_withholding() {
        let resolver = flat_resolver(dec!(75));
        let mut errs = WriteHandle::empty_write_handle();

        let report = aggregate_dividends(
            &Some(vec![div(0, dec!(100)), div(1, dec!(50))]),
            &Some(vec![wh(0, dec!(-10)), wh(1, dec!(-5))]),
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        assert_eq!(report.rows.len(), 2);
        let r = &report.rows[0];
        assert_eq!(r.amount, dec!(100));
        assert_eq!(r.tax_paid, dec!(10));
        assert_eq!(r.amount_base, dec!(7500.00));
        assert_eq!(r.tax_paid_base, dec!(750.00));
        assert_eq!(r.tax_full_base, dec!(975.00));
        assert_eq!(r.tax_rest_base, dec!(225.00));

        assert_eq!(report.amount_base_sum, dec!(11250.00));
        assert_eq!(report.tax_paid_base_sum, dec!(1125.00));
        assert_eq!(report.tax_full_base_sum, dec!(1462.50));
        assert_eq!(report.tax_rest_base_sum, dec!(337.50));
    }

    #[test]
    fn test_row_count_mismatch_fallback() {
        let resolver = flat_resolver(dec!(75));
        let (mut errs, err_buff) = WriteHandle::string_buff_write_handle();

        // 3 dividend rows, 2 withholding rows: tax_paid = 0 everywhere,
        // tax_rest = tax_full.
        let report = aggregate_dividends(
            &Some(vec![div(0, dec!(100)), div(1, dec!(50)), div(2, dec!(25))]),
            &Some(vec![wh(0, dec!(-10)), wh(1, dec!(-5))]),
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        assert!(err_buff.borrow().as_str().contains("mismatched row"));
        for r in &report.rows {
            assert_eq!(r.tax_paid, dec!(0));
            assert_eq!(r.tax_paid_base, dec!(0));
            assert_eq!(r.tax_rest_base, r.tax_full_base);
        }
    }

    #[test]
    fn test_missing_withholding_table() {
        let resolver = flat_resolver(dec!(75));
        let (mut errs, err_buff) = WriteHandle::string_buff_write_handle();

        let report = aggregate_dividends(
            &Some(vec![div(0, dec!(100))]),
            &None,
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        assert!(err_buff.borrow().as_str().contains("No withholding tax"));
        assert_eq!(report.rows[0].tax_rest_base, report.rows[0].tax_full_base);
    }

    #[test]
    fn test_missing_dividends_table() {
        let resolver = flat_resolver(dec!(75));
        let mut errs = WriteHandle::empty_write_handle();

        let report = aggregate_dividends(
            &None,
            &None,
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_over_withholding_stays_negative() {
        let resolver = flat_resolver(dec!(75));
        let mut errs = WriteHandle::empty_write_handle();

        // 30% withheld against a 13% rate: tax_rest goes negative and
        // stays there.
        let report = aggregate_dividends(
            &Some(vec![div(0, dec!(100))]),
            &Some(vec![wh(0, dec!(-30))]),
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        assert_eq!(report.rows[0].tax_rest_base, dec!(-1275.00));
        assert_eq!(report.tax_rest_base_sum, dec!(-1275.00));
    }

    #[test]
    fn test_untracked_currency_rows_dropped() {
        let resolver = flat_resolver(dec!(75));
        let mut errs = WriteHandle::empty_write_handle();

        let mut gbp_div = div(0, dec!(100));
        gbp_div.currency = Currency::new("GBP");

        let report = aggregate_dividends(
            &Some(vec![gbp_div, div(1, dec!(50))]),
            &Some(vec![wh(1, dec!(-5))]),
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        // The GBP row dropped on both sides; the remaining pair matches.
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].tax_paid, dec!(5));
    }

    #[test]
    fn test_accruals_and_final_summary() {
        let resolver = flat_resolver(dec!(75));
        let mut errs = WriteHandle::empty_write_handle();

        let div_report = aggregate_dividends(
            &Some(vec![div(0, dec!(100))]),
            &Some(vec![wh(0, dec!(-10))]),
            &resolver,
            dec!(0.13),
            &mut errs,
        )
        .unwrap()
        .unwrap();

        let accr_report = aggregate_accruals(
            &Some(vec![AccrualRow {
                security: "FOO".to_string(),
                date: doy_date(2021, 50),
                gross_amount: dec!(-20),
                tax: dec!(-2),
                currency: Currency::usd(),
            }]),
            &resolver,
            dec!(0.13),
        )
        .unwrap()
        .unwrap();

        // A negative correction shrinks the final figures.
        assert_eq!(accr_report.amount_base_sum, dec!(-1500.00));

        let final_summary =
            dividend_final_summary(Some(&div_report), Some(&accr_report));
        assert_eq!(final_summary.amount_base_sum, dec!(6000.00));
        // 975.00 + (-195.00)
        assert_eq!(final_summary.tax_full_base_sum, dec!(780.00));
        // 225.00 + (-45.00): corrections amend, never replace
        assert_eq!(final_summary.tax_rest_base_sum, dec!(180.00));

        // Accruals alone still produce final figures.
        let only_accr = dividend_final_summary(None, Some(&accr_report));
        assert_eq!(only_accr.amount_base_sum, dec!(-1500.00));
    }
}
