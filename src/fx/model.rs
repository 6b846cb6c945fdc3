use std::fmt::Display;

use rust_decimal::Decimal;
use time::Date;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct DailyRate {
    pub date: Date,
    pub foreign_to_base_rate: Decimal,
}

impl DailyRate {
    pub fn new(date: Date, foreign_to_base_rate: Decimal) -> DailyRate {
        DailyRate {
            date: date,
            foreign_to_base_rate: foreign_to_base_rate,
        }
    }
}

// Auto-implements to_string()
impl Display for DailyRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.date, self.foreign_to_base_rate)
    }
}

// A full per-currency rate history, ordered by date. Central banks do not
// publish rates for weekends and holidays, so the series is sparse and
// lookups are strictly as-of: the applicable rate for a date is the most
// recent sample at or before it, held piecewise-constant. No interpolation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RateSeries {
    samples: Vec<DailyRate>,
}

impl RateSeries {
    pub fn new(mut samples: Vec<DailyRate>) -> RateSeries {
        samples.sort_by_key(|s| s.date);
        RateSeries { samples }
    }

    pub fn empty() -> RateSeries {
        RateSeries { samples: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[DailyRate] {
        &self.samples
    }

    pub fn first_date(&self) -> Option<Date> {
        self.samples.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<Date> {
        self.samples.last().map(|s| s.date)
    }

    pub fn rate_on_or_before(&self, date: Date) -> Option<&DailyRate> {
        // First index whose sample is strictly after `date`.
        let idx = self.samples.partition_point(|s| s.date <= date);
        if idx == 0 {
            None
        } else {
            Some(&self.samples[idx - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::{Date, Month};

    use crate::util::date::pub_testlib::doy_date;

    use super::{DailyRate, RateSeries};

    fn dr(date: Date, rate: rust_decimal::Decimal) -> DailyRate {
        DailyRate {
            date: date,
            foreign_to_base_rate: rate,
        }
    }

    #[test]
    fn test_rate_string() {
        let rate = DailyRate {
            date: Date::from_calendar_date(2024, Month::January, 23).unwrap(),
            foreign_to_base_rate: dec!(75.1),
        };
        assert_eq!(rate.to_string(), "2024-01-23 : 75.1");
    }

    #[test]
    fn test_as_of_lookup() {
        let series = RateSeries::new(vec![
            dr(doy_date(2021, 0), dec!(75)),  // 2021-01-01
            dr(doy_date(2021, 31), dec!(78)), // 2021-02-01
        ]);

        // Exact hits
        assert_eq!(
            series.rate_on_or_before(doy_date(2021, 0)).unwrap(),
            &dr(doy_date(2021, 0), dec!(75))
        );
        assert_eq!(
            series.rate_on_or_before(doy_date(2021, 31)).unwrap(),
            &dr(doy_date(2021, 31), dec!(78))
        );

        // Between samples: backward-fill, never interpolation.
        assert_eq!(
            series.rate_on_or_before(doy_date(2021, 14)).unwrap(),
            &dr(doy_date(2021, 0), dec!(75))
        );

        // After the last sample
        assert_eq!(
            series.rate_on_or_before(doy_date(2021, 200)).unwrap(),
            &dr(doy_date(2021, 31), dec!(78))
        );

        // Before the first sample
        assert!(series.rate_on_or_before(doy_date(2020, 200)).is_none());
    }

    #[test]
    fn test_new_sorts_samples() {
        let series = RateSeries::new(vec![
            dr(doy_date(2021, 31), dec!(78)),
            dr(doy_date(2021, 0), dec!(75)),
        ]);
        assert_eq!(series.first_date().unwrap(), doy_date(2021, 0));
        assert_eq!(series.last_date().unwrap(), doy_date(2021, 31));
    }

    #[test]
    fn test_empty_series() {
        let series = RateSeries::empty();
        assert!(series.is_empty());
        assert!(series.rate_on_or_before(doy_date(2021, 0)).is_none());
    }
}
