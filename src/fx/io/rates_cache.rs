use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    path::PathBuf,
    str::FromStr,
};

use rust_decimal::Decimal;

use crate::{
    fx::DailyRate,
    ledger::Currency,
    log::WriteHandle,
    util::{date, rc::RcRefCell, sys::home_dir_file_path},
};

use super::Error;

pub trait RatesCache {
    fn write_rates(
        &mut self,
        currency: &Currency,
        rates: &Vec<DailyRate>,
    ) -> Result<(), Error>;
    fn get_rates(&mut self, currency: &Currency)
        -> Result<Option<Vec<DailyRate>>, Error>;
}

pub struct InMemoryRatesCache {
    pub rates_by_currency: RcRefCell<HashMap<String, Vec<DailyRate>>>,
}

impl RatesCache for InMemoryRatesCache {
    fn write_rates(
        &mut self,
        currency: &Currency,
        rates: &Vec<DailyRate>,
    ) -> Result<(), Error> {
        self.rates_by_currency
            .borrow_mut()
            .insert(currency.as_str().to_string(), rates.clone());
        Ok(())
    }

    fn get_rates(
        &mut self,
        currency: &Currency,
    ) -> Result<Option<Vec<DailyRate>>, Error> {
        Ok(self
            .rates_by_currency
            .borrow()
            .get(currency.as_str())
            .map(|f| f.clone()))
    }
}

pub struct CsvRatesCache {
    err_writer: WriteHandle,
}

impl CsvRatesCache {
    pub fn new(err_writer: WriteHandle) -> CsvRatesCache {
        CsvRatesCache {
            err_writer: err_writer,
        }
    }

    fn get_rates_from_csv(&mut self, r: &mut dyn Read) -> Result<Vec<DailyRate>, Error> {
        let mut csv_r = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(r);

        let mut rates: Vec<DailyRate> = Vec::new();

        for record_res in csv_r.records() {
            let record = match record_res {
                Ok(r) => r,
                Err(e) => {
                    let _ = writeln!(
                        self.err_writer,
                        "Error reading rates csv record: {}",
                        e
                    );
                    continue;
                }
            };
            let date_val = match record.get(0) {
                Some(ds) => match date::parse_standard_date(ds) {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = writeln!(
                            self.err_writer,
                            "Error parsing rates csv date: {}",
                            e
                        );
                        continue;
                    }
                },
                None => {
                    let _ = writeln!(
                        self.err_writer,
                        "Error reading rates from csv: Row has no fields"
                    );
                    continue;
                }
            };

            let rate = match record.get(1) {
                Some(ds) => match Decimal::from_str(ds) {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = writeln!(
                            self.err_writer,
                            "Error parsing rates csv rate for {}: {}",
                            date_val, e
                        );
                        continue;
                    }
                },
                None => {
                    let _ = writeln!(
                        self.err_writer,
                        "Error reading rates from csv: {} has no rate",
                        date_val
                    );
                    continue;
                }
            };

            rates.push(DailyRate {
                date: date_val,
                foreign_to_base_rate: rate,
            })
        }

        Ok(rates)
    }
}

fn open_rates_csv_file(currency: &Currency, write_mode: bool) -> Result<File, Error> {
    let fname_only = format!("rates-{}.csv", currency);
    let fname_only_path = PathBuf::from(fname_only);
    let file_path = home_dir_file_path(&fname_only_path)?;

    (if write_mode {
        File::create(file_path)
    } else {
        File::open(file_path)
    })
    .map_err(|e| e.to_string())
}

impl RatesCache for CsvRatesCache {
    fn write_rates(
        &mut self,
        currency: &Currency,
        rates: &Vec<DailyRate>,
    ) -> Result<(), Error> {
        let file = open_rates_csv_file(currency, true)?;

        // CSV file of date,exchange_rate

        let mut csv_w = csv::Writer::from_writer(file);
        for rate in rates {
            csv_w
                .write_record(vec![
                    rate.date.to_string(),
                    rate.foreign_to_base_rate.to_string(),
                ])
                .map_err(|e| e.to_string())?;
        }
        csv_w.flush().map_err(|e| e.to_string())
    }

    fn get_rates(
        &mut self,
        currency: &Currency,
    ) -> Result<Option<Vec<DailyRate>>, Error> {
        let mut file = match open_rates_csv_file(currency, false) {
            Ok(f) => f,
            // A cache file that was never written is a miss, not an error.
            Err(_) => return Ok(None),
        };
        self.get_rates_from_csv(&mut file).map(|v| Some(v))
    }
}
