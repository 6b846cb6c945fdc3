use std::collections::BTreeMap;

use super::execution::Execution;
use super::income::{
    AccrualRow, CashTransferRow, DividendRow, FeeRow, InterestRow, WithholdingRow,
};

// All rows of one calendar year: the unit of aggregation and reporting.
// A None table means the statement simply had no such section that year,
// which contributes zero to every sum and is never an error.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct YearLedger {
    pub year: i32,
    pub executions: Vec<Execution>,
    pub dividends: Option<Vec<DividendRow>>,
    pub withholding_tax: Option<Vec<WithholdingRow>>,
    pub accrual_corrections: Option<Vec<AccrualRow>>,
    pub fees: Option<Vec<FeeRow>>,
    pub interest: Option<Vec<InterestRow>>,
    pub cash_transfers: Option<Vec<CashTransferRow>>,
}

impl YearLedger {
    pub fn new(year: i32) -> YearLedger {
        YearLedger {
            year: year,
            executions: Vec::new(),
            dividends: None,
            withholding_tax: None,
            accrual_corrections: None,
            fees: None,
            interest: None,
            cash_transfers: None,
        }
    }
}

// Years must be processed oldest-first: a security's open positions have
// to reflect every prior-year buy before its current-year sells can be
// matched. The BTreeMap makes the ascending walk the only walk there is.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MultiYearLedger {
    years: BTreeMap<i32, YearLedger>,
}

impl MultiYearLedger {
    pub fn new() -> MultiYearLedger {
        MultiYearLedger {
            years: BTreeMap::new(),
        }
    }

    pub fn from_ledgers(ledgers: Vec<YearLedger>) -> MultiYearLedger {
        let mut m = MultiYearLedger::new();
        for l in ledgers {
            m.insert(l);
        }
        m
    }

    pub fn insert(&mut self, ledger: YearLedger) {
        self.years.insert(ledger.year, ledger);
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.years.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.years.keys().next_back().copied()
    }

    pub fn get(&self, year: i32) -> Option<&YearLedger> {
        self.years.get(&year)
    }

    pub fn iter_ascending(&self) -> impl Iterator<Item = &YearLedger> {
        self.years.values()
    }
}

#[cfg(test)]
mod tests {
    use super::{MultiYearLedger, YearLedger};

    #[test]
    fn test_ascending_iteration() {
        let ledgers = MultiYearLedger::from_ledgers(vec![
            YearLedger::new(2021),
            YearLedger::new(2019),
            YearLedger::new(2020),
        ]);
        let years: Vec<i32> =
            ledgers.iter_ascending().map(|l| l.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
        assert_eq!(ledgers.first_year(), Some(2019));
        assert_eq!(ledgers.last_year(), Some(2021));
        assert!(!ledgers.is_empty());
    }

    #[test]
    fn test_empty() {
        let ledgers = MultiYearLedger::new();
        assert!(ledgers.is_empty());
        assert_eq!(ledgers.first_year(), None);
    }
}
