use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use time::macros::format_description;
use time::Date;

use crate::ledger::Currency;
use crate::util::date;
use crate::verboseln;
use crate::{fx::DailyRate, util::decimal::is_positive};

use super::Error;

// CBR series identifiers for the tracked foreign currencies.
const CBR_USD_SERIES: &str = "R01235";
const CBR_EUR_SERIES: &str = "R01239";

pub fn cbr_series_code(currency: &Currency) -> Option<&'static str> {
    match currency.as_str() {
        "USD" => Some(CBR_USD_SERIES),
        "EUR" => Some(CBR_EUR_SERIES),
        _ => None,
    }
}

fn get_fx_xml_url(series_code: &str, from: Date, to: Date) -> String {
    // The endpoint wants dd/mm/yyyy
    let url_fmt = format_description!("[day]/[month]/[year]");
    format!(
        "https://www.cbr.ru/scripts/XML_dynamic.asp?date_req1={}&date_req2={}&VAL_NM_RQ={}",
        from.format(url_fmt).unwrap(),
        to.format(url_fmt).unwrap(),
        series_code
    )
}

pub struct RateParseResult {
    pub rates: Vec<DailyRate>,
    pub non_fatal_errors: Vec<String>,
}

pub type RateLoadResult = RateParseResult;

pub trait RemoteRateLoader {
    fn get_remote_rates(
        &mut self,
        currency: &Currency,
        from: Date,
        to: Date,
    ) -> Result<RateLoadResult, Error>;
}

lazy_static! {
    static ref RECORD_RE: Regex =
        Regex::new(r#"(?s)<Record[^>]*\bDate="([^"]*)"[^>]*>(.*?)</Record>"#).unwrap();
    static ref NOMINAL_RE: Regex = Regex::new(r"<Nominal>([^<]*)</Nominal>").unwrap();
    static ref VALUE_RE: Regex = Regex::new(r"<Value>([^<]*)</Value>").unwrap();
}

// CBR XML_dynamic schema (one Record per published day):
//
// <ValCurs ID="R01235" DateRange1="01.01.2021" DateRange2="31.12.2021" name="...">
//   <Record Date="12.01.2021" Id="R01235">
//     <Nominal>1</Nominal>
//     <Value>74,5157</Value>
//   </Record>
//   ...
// </ValCurs>
//
// Values use a comma decimal separator, and some currencies are quoted
// per 10 or 100 units (the Nominal), so the per-unit rate is Value/Nominal.
fn parse_rates_xml(xml: &str) -> Result<RateParseResult, Error> {
    if !xml.contains("<ValCurs") {
        return Err(format!(
            "Error parsing CBR rates: response is not a ValCurs document"
        ));
    }

    let mut rates = Vec::new();
    let mut non_fatal_errors: Vec<String> = Vec::new();

    for caps in RECORD_RE.captures_iter(xml) {
        let date_str = caps.get(1).unwrap().as_str();
        let body = caps.get(2).unwrap().as_str();

        let rec_date = match date::parse_dotted_date(date_str) {
            Ok(d) => d,
            Err(e) => {
                non_fatal_errors
                    .push(format!("Failed to parse date {:?}: {}", date_str, e));
                continue;
            }
        };

        let value = match VALUE_RE.captures(body) {
            Some(vc) => {
                let raw = vc.get(1).unwrap().as_str().replace(',', ".");
                match Decimal::from_str(&raw) {
                    Ok(d) => d,
                    Err(e) => {
                        non_fatal_errors.push(format!(
                            "Failed to parse rate value for {}: {}",
                            date_str, e
                        ));
                        continue;
                    }
                }
            }
            None => {
                non_fatal_errors
                    .push(format!("Record for {} has no Value", date_str));
                continue;
            }
        };

        let nominal = match NOMINAL_RE.captures(body) {
            Some(nc) => match Decimal::from_str(nc.get(1).unwrap().as_str()) {
                Ok(d) => d,
                Err(e) => {
                    non_fatal_errors.push(format!(
                        "Failed to parse nominal for {}: {}",
                        date_str, e
                    ));
                    continue;
                }
            },
            None => Decimal::ONE,
        };

        if !is_positive(&value) || !is_positive(&nominal) {
            non_fatal_errors.push(format!(
                "Rate for {} is not positive ({}/{})",
                date_str, value, nominal
            ));
            continue;
        }

        rates.push(DailyRate {
            date: rec_date,
            foreign_to_base_rate: value / nominal,
        });
    }

    Ok(RateParseResult {
        rates,
        non_fatal_errors,
    })
}

pub struct CbrRemoteRateLoader {}

impl CbrRemoteRateLoader {
    pub fn new() -> CbrRemoteRateLoader {
        CbrRemoteRateLoader {}
    }
}

impl RemoteRateLoader for CbrRemoteRateLoader {
    fn get_remote_rates(
        &mut self,
        currency: &Currency,
        from: Date,
        to: Date,
    ) -> Result<RateLoadResult, Error> {
        let series_code = cbr_series_code(currency).ok_or(format!(
            "No CBR series is configured for {}",
            currency
        ))?;
        eprint!("Fetching {}/RUB exchange rates\n", currency);
        let url = get_fx_xml_url(series_code, from, to);
        verboseln!("Fetching {}", url);
        let fmt_err = |s: &str| -> Result<RateLoadResult, Error> {
            Err(format!("Error getting {} rates: {}", currency, s))
        };
        let out = match reqwest::blocking::get(url) {
            Ok(out) => out,
            Err(e) => return fmt_err(&e.to_string()),
        };
        let out = match out.error_for_status() {
            Ok(o) => o,
            Err(e) => return fmt_err(&format!("status: {:?}", &e.status())),
        };
        let text = match out.text() {
            Ok(t) => t,
            Err(e) => return fmt_err(&e.to_string()),
        };

        parse_rates_xml(&text)
    }
}

// Ideally this would be marked as cfg(test), but I want integration
// tests to also have access, so it cannot be marked test-only for it
// to be accessible there.
pub mod pub_testlib {
    use std::collections::HashMap;

    use time::Date;
    use tracing::trace;

    use crate::ledger::Currency;
    use crate::{fx::DailyRate, util::rc::RcRefCell};

    use super::{Error, RateLoadResult, RemoteRateLoader};

    pub struct MockRemoteRateLoader {
        pub remote_rates: RcRefCell<HashMap<String, Vec<DailyRate>>>,
    }

    impl RemoteRateLoader for MockRemoteRateLoader {
        fn get_remote_rates(
            &mut self,
            currency: &Currency,
            _from: Date,
            _to: Date,
        ) -> Result<RateLoadResult, Error> {
            trace!(currency = currency.as_str(),
                   "MockRemoteRateLoader::get_remote_rates");
            match self.remote_rates.borrow().get(currency.as_str()) {
                Some(rates) => Ok(RateLoadResult {
                    rates: rates.clone(),
                    non_fatal_errors: vec![],
                }),
                None => Err(format!("No rates set for {}", currency)),
            }
        }
    }
}
