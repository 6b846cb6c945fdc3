use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use time::Date;

use crate::ledger::Currency;

use super::RateSeries;

// Distinguishes fatal-to-run conditions (an entirely untracked currency)
// from fatal-to-one-computation ones (a date before the series starts).
// Silently defaulting a rate would corrupt tax figures, so neither is
// ever papered over with a fallback value.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum FxError {
    #[error("Unknown currency {0}")]
    UnknownCurrency(String),
    #[error("No {currency} exchange rate available on or before {date}")]
    NoRateAvailable { currency: String, date: Date },
}

// The as-of exchange rate oracle for all income categories.
// Holds one RateSeries per tracked foreign currency; the base currency
// always resolves to 1.
pub struct RateResolver {
    base: Currency,
    series: HashMap<Currency, RateSeries>,
}

impl RateResolver {
    pub fn new(base: Currency, series: HashMap<Currency, RateSeries>) -> RateResolver {
        RateResolver { base, series }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn is_tracked(&self, currency: &Currency) -> bool {
        *currency == self.base || self.series.contains_key(currency)
    }

    pub fn tracked_currencies(&self) -> Vec<Currency> {
        let mut curs: Vec<Currency> = self.series.keys().cloned().collect();
        curs.push(self.base.clone());
        curs.sort();
        curs
    }

    pub fn rate(&self, date: Date, currency: &Currency) -> Result<Decimal, FxError> {
        if *currency == self.base {
            return Ok(Decimal::ONE);
        }
        let series = self
            .series
            .get(currency)
            .ok_or_else(|| FxError::UnknownCurrency(currency.to_string()))?;
        match series.rate_on_or_before(date) {
            Some(sample) => Ok(sample.foreign_to_base_rate),
            None => Err(FxError::NoRateAvailable {
                currency: currency.to_string(),
                date,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::fx::{DailyRate, RateSeries};
    use crate::ledger::Currency;
    use crate::util::date::pub_testlib::doy_date;

    use super::{FxError, RateResolver};

    fn test_resolver() -> RateResolver {
        let usd_series = RateSeries::new(vec![
            DailyRate::new(doy_date(2021, 0), dec!(75)),
            DailyRate::new(doy_date(2021, 31), dec!(78)),
        ]);
        let mut series = HashMap::new();
        series.insert(Currency::usd(), usd_series);
        RateResolver::new(Currency::rub(), series)
    }

    #[test]
    fn test_base_currency_rate() {
        let resolver = test_resolver();
        // The base currency needs no series at all.
        assert_eq!(
            resolver.rate(doy_date(1995, 10), &Currency::rub()).unwrap(),
            Decimal::ONE
        );
    }

    #[test]
    fn test_as_of_resolution() {
        let resolver = test_resolver();
        // 2021-01-15 resolves to the 2021-01-01 sample: backward-fill,
        // not interpolated toward the 2021-02-01 one.
        assert_eq!(
            resolver.rate(doy_date(2021, 14), &Currency::usd()).unwrap(),
            dec!(75)
        );
        assert_eq!(
            resolver.rate(doy_date(2021, 31), &Currency::usd()).unwrap(),
            dec!(78)
        );
    }

    #[test]
    fn test_no_rate_available() {
        let resolver = test_resolver();
        let err = resolver
            .rate(doy_date(2020, 100), &Currency::usd())
            .unwrap_err();
        assert_eq!(
            err,
            FxError::NoRateAvailable {
                currency: "USD".to_string(),
                date: doy_date(2020, 100),
            }
        );
    }

    #[test]
    fn test_unknown_currency() {
        let resolver = test_resolver();
        let err = resolver
            .rate(doy_date(2021, 14), &Currency::new("GBP"))
            .unwrap_err();
        assert_eq!(err, FxError::UnknownCurrency("GBP".to_string()));
    }

    #[test]
    fn test_tracked() {
        let resolver = test_resolver();
        assert!(resolver.is_tracked(&Currency::rub()));
        assert!(resolver.is_tracked(&Currency::usd()));
        assert!(!resolver.is_tracked(&Currency::new("GBP")));
        assert_eq!(
            resolver.tracked_currencies(),
            vec![Currency::rub(), Currency::usd()]
        );
    }
}
