use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ledger::{
    AccrualRow, CashTransferRow, Currency, DividendRow, Execution, FeeRow,
    InterestRow, MultiYearLedger, WithholdingRow, YearLedger,
};
use crate::log::WriteHandle;
use crate::util::date::{parse_statement_date, parse_standard_date};
use crate::util::decimal::is_negative;
use crate::verboseln;
use crate::write_errln;

use super::section_csv::{
    split_sections, SectionTable, SECTION_CASH_TRANSFERS, SECTION_DIVIDENDS,
    SECTION_DIV_ACCRUALS, SECTION_FEES, SECTION_INTEREST, SECTION_TRADES,
    SECTION_WITHHOLDING_TAX,
};
use super::Error;

// Numeric statement cells may carry thousands separators ("1,200").
fn parse_decimal_field(s: &str) -> Result<Decimal, String> {
    let cleaned = s.trim().replace(',', "");
    Decimal::from_str(&cleaned).map_err(|e| e.to_string())
}

// Dividend descriptions look like
// "VT (US9220427424) Cash Dividend USD 0.56 per Share". The part before
// " Cash Dividend" identifies the security.
fn dividend_security(description: &str) -> String {
    match description.split(" Cash Dividend").next() {
        Some(s) => s.trim().to_string(),
        None => description.trim().to_string(),
    }
}

struct RowReader<'a> {
    table: &'a SectionTable,
    err_stream: &'a mut WriteHandle,
}

impl<'a> RowReader<'a> {
    // Resolves required columns up front; a section missing one of its
    // columns is malformed and treated as absent.
    fn columns(&mut self, wanted: &[&[&str]]) -> Result<Vec<usize>, Error> {
        let mut indices = Vec::with_capacity(wanted.len());
        for names in wanted {
            match self.table.col_index_any(names) {
                Some(idx) => indices.push(idx),
                None => {
                    return Err(format!(
                        "Section {:?} has no {:?} column",
                        self.table.section, names[0]
                    ))
                }
            }
        }
        Ok(indices)
    }

    fn field<'r>(&mut self, row: &'r Vec<String>, idx: usize) -> Option<&'r str> {
        match row.get(idx) {
            Some(f) => Some(f.as_str()),
            None => {
                write_errln!(
                    self.err_stream,
                    "Row in section {:?} is missing fields",
                    self.table.section
                );
                None
            }
        }
    }
}

fn parse_trades(
    table: &SectionTable,
    tracked: &[Currency],
    err_stream: &mut WriteHandle,
) -> Result<Vec<Execution>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[
        &["symbol"],
        &["date/time", "date"],
        &["quantity"],
        &["t. price", "price"],
        &["comm/fee", "comm in usd", "fee"],
        &["currency"],
        &["proceeds"],
    ])?;
    let (c_sym, c_date, c_qty, c_price, c_fee, c_cur, c_proc) = (
        cols[0], cols[1], cols[2], cols[3], cols[4], cols[5], cols[6],
    );

    let mut execs: Vec<Execution> = Vec::new();
    let mut read_index: u32 = 0;

    for row in &table.rows {
        let fee_str = match rd.field(row, c_fee) {
            Some(f) => f,
            None => continue,
        };
        let fee = match parse_decimal_field(fee_str) {
            Ok(f) => f,
            // Subtotal and informational lines have no fee value.
            Err(_) => continue,
        };
        // Real fills are always charged a commission; everything else in
        // the section is summary noise.
        if !is_negative(&fee) {
            continue;
        }

        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }

        let (sym, date_str, qty_str, price_str, proc_str) = match (
            rd.field(row, c_sym),
            rd.field(row, c_date),
            rd.field(row, c_qty),
            rd.field(row, c_price),
            rd.field(row, c_proc),
        ) {
            (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
            _ => continue,
        };

        let date = match parse_statement_date(date_str) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing trade date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        let quantity = match parse_decimal_field(qty_str) {
            Ok(q) => q,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing trade quantity {:?}: {}",
                    qty_str, e
                );
                continue;
            }
        };
        let price = match parse_decimal_field(price_str) {
            Ok(p) => p,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing trade price {:?}: {}",
                    price_str, e
                );
                continue;
            }
        };
        let proceeds = match parse_decimal_field(proc_str) {
            Ok(p) => p,
            Err(_) => -price * quantity,
        };

        execs.push(Execution {
            security: sym.trim().to_string(),
            date,
            price,
            fee,
            quantity,
            currency,
            proceeds,
            read_index,
        });
        read_index += 1;
    }

    Ok(execs)
}

fn parse_dividends(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<DividendRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[
        &["currency"],
        &["date"],
        &["description"],
        &["amount"],
    ])?;
    let (c_cur, c_date, c_desc, c_amount) = (cols[0], cols[1], cols[2], cols[3]);

    let mut rows = Vec::new();
    for row in &table.rows {
        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }
        let (date_str, desc, amount_str) = match (
            rd.field(row, c_date),
            rd.field(row, c_desc),
            rd.field(row, c_amount),
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => continue,
        };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing dividend date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let amount = match parse_decimal_field(amount_str) {
            Ok(a) => a,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing dividend amount {:?}: {}",
                    amount_str, e
                );
                continue;
            }
        };
        rows.push(DividendRow {
            security: dividend_security(desc),
            date,
            amount,
            currency,
        });
    }
    Ok(rows)
}

fn parse_withholding(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<WithholdingRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[&["currency"], &["date"], &["amount"]])?;
    let (c_cur, c_date, c_amount) = (cols[0], cols[1], cols[2]);

    let mut rows = Vec::new();
    for row in &table.rows {
        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }
        let (date_str, amount_str) =
            match (rd.field(row, c_date), rd.field(row, c_amount)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing withholding date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let amount = match parse_decimal_field(amount_str) {
            Ok(a) => a,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing withholding amount {:?}: {}",
                    amount_str, e
                );
                continue;
            }
        };
        rows.push(WithholdingRow {
            date,
            amount,
            currency,
        });
    }
    Ok(rows)
}

fn parse_accruals(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<AccrualRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[
        &["symbol"],
        &["date"],
        &["gross amount"],
        &["tax"],
        &["currency"],
    ])?;
    let (c_sym, c_date, c_gross, c_tax, c_cur) =
        (cols[0], cols[1], cols[2], cols[3], cols[4]);

    let mut rows = Vec::new();
    for row in &table.rows {
        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }
        let (sym, date_str, gross_str, tax_str) = match (
            rd.field(row, c_sym),
            rd.field(row, c_date),
            rd.field(row, c_gross),
            rd.field(row, c_tax),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => continue,
        };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing accrual date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let (gross_amount, tax) = match (
            parse_decimal_field(gross_str),
            parse_decimal_field(tax_str),
        ) {
            (Ok(g), Ok(t)) => (g, t),
            _ => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing accrual amounts for {}",
                    sym
                );
                continue;
            }
        };
        rows.push(AccrualRow {
            security: sym.trim().to_string(),
            date,
            gross_amount,
            tax,
            currency,
        });
    }
    Ok(rows)
}

fn parse_fees(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<FeeRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[&["date"], &["amount"], &["currency"]])?;
    let (c_date, c_amount, c_cur) = (cols[0], cols[1], cols[2]);
    let c_subtitle = table.col_index("subtitle");

    let mut rows = Vec::new();
    for row in &table.rows {
        // "Total" subtitle lines repeat the per-row amounts.
        if let Some(c_sub) = c_subtitle {
            if row.get(c_sub).map(|s| s.as_str()) == Some("Total") {
                continue;
            }
        }
        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }
        let (date_str, amount_str) =
            match (rd.field(row, c_date), rd.field(row, c_amount)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing fee date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let amount = match parse_decimal_field(amount_str) {
            Ok(a) => a,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing fee amount {:?}: {}",
                    amount_str, e
                );
                continue;
            }
        };
        rows.push(FeeRow {
            date,
            amount,
            currency,
        });
    }
    Ok(rows)
}

fn parse_interest(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<InterestRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[
        &["currency"],
        &["date"],
        &["description"],
        &["amount"],
    ])?;
    let (c_cur, c_date, c_desc, c_amount) = (cols[0], cols[1], cols[2], cols[3]);

    let mut rows = Vec::new();
    for row in &table.rows {
        let cur_str = match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        };
        // Summary lines put "Total" where a currency belongs.
        if cur_str.starts_with("Total") {
            continue;
        }
        let currency = Currency::new(cur_str);
        if !tracked.contains(&currency) {
            continue;
        }
        let (date_str, desc, amount_str) = match (
            rd.field(row, c_date),
            rd.field(row, c_desc),
            rd.field(row, c_amount),
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => continue,
        };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing interest date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let amount = match parse_decimal_field(amount_str) {
            Ok(a) => a,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing interest amount {:?}: {}",
                    amount_str, e
                );
                continue;
            }
        };
        rows.push(InterestRow {
            date,
            description: desc.trim().to_string(),
            amount,
            currency,
        });
    }
    Ok(rows)
}

fn parse_cash_transfers(
    table: &SectionTable,
    tracked: &[Currency],
    year: i32,
    err_stream: &mut WriteHandle,
) -> Result<Vec<CashTransferRow>, Error> {
    let mut rd = RowReader { table, err_stream };
    let cols = rd.columns(&[
        &["currency"],
        &["settle date", "date"],
        &["amount"],
    ])?;
    let (c_cur, c_date, c_amount) = (cols[0], cols[1], cols[2]);

    let mut rows = Vec::new();
    for row in &table.rows {
        let currency = Currency::new(match rd.field(row, c_cur) {
            Some(c) => c,
            None => continue,
        });
        if !tracked.contains(&currency) {
            continue;
        }
        let (date_str, amount_str) =
            match (rd.field(row, c_date), rd.field(row, c_amount)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
        let date = match parse_standard_date(date_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing transfer date {:?}: {}",
                    date_str, e
                );
                continue;
            }
        };
        if date.year() != year {
            continue;
        }
        let amount = match parse_decimal_field(amount_str) {
            Ok(a) => a,
            Err(e) => {
                write_errln!(
                    rd.err_stream,
                    "Error parsing transfer amount {:?}: {}",
                    amount_str, e
                );
                continue;
            }
        };
        rows.push(CashTransferRow {
            date,
            amount,
            currency,
        });
    }
    Ok(rows)
}

// Builds one year's ledger from already-segmented section tables.
// A section that is absent (or malformed beyond use) becomes a None
// table: zero contribution, never an error.
pub fn year_ledger_from_sections(
    year: i32,
    tables: &HashMap<String, SectionTable>,
    tracked: &[Currency],
    err_stream: &mut WriteHandle,
) -> YearLedger {
    let mut ledger = YearLedger::new(year);

    let section = |name: &str| -> Option<&SectionTable> { tables.get(name) };

    if let Some(t) = section(SECTION_TRADES) {
        match parse_trades(t, tracked, err_stream) {
            Ok(execs) => ledger.executions = execs,
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_DIVIDENDS) {
        match parse_dividends(t, tracked, year, err_stream) {
            Ok(rows) => ledger.dividends = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_WITHHOLDING_TAX) {
        match parse_withholding(t, tracked, year, err_stream) {
            Ok(rows) => ledger.withholding_tax = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_DIV_ACCRUALS) {
        match parse_accruals(t, tracked, year, err_stream) {
            Ok(rows) => ledger.accrual_corrections = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_FEES) {
        match parse_fees(t, tracked, year, err_stream) {
            Ok(rows) => ledger.fees = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_INTEREST) {
        match parse_interest(t, tracked, year, err_stream) {
            Ok(rows) => ledger.interest = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }
    if let Some(t) = section(SECTION_CASH_TRANSFERS) {
        match parse_cash_transfers(t, tracked, year, err_stream) {
            Ok(rows) => ledger.cash_transfers = Some(rows),
            Err(e) => write_errln!(err_stream, "{}", e),
        }
    }

    ledger
}

// Statement files are named <YEAR>.csv, one per year.
pub fn discover_statements(dir: &Path) -> Result<Vec<(i32, PathBuf)>, Error> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Could not read {:?}: {}", dir, e))?;

    let mut found: Vec<(i32, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| e.to_string())?.path();
        if path.extension().map(|e| e != "csv").unwrap_or(true) {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        match i32::from_str(stem) {
            Ok(year) => found.push((year, path)),
            Err(_) => {
                verboseln!("Skipping {:?}: name is not a year", path);
            }
        }
    }
    found.sort();
    Ok(found)
}

pub fn load_multi_year_ledger(
    dir: &Path,
    tracked: &[Currency],
    err_stream: &mut WriteHandle,
) -> Result<MultiYearLedger, Error> {
    let mut ledgers = MultiYearLedger::new();

    for (year, path) in discover_statements(dir)? {
        verboseln!("Reading statement {:?}", path);
        let mut file = File::open(&path)
            .map_err(|e| format!("Could not open {:?}: {}", path, e))?;
        let tables = split_sections(&mut file, err_stream)?;
        ledgers.insert(year_ledger_from_sections(
            year, &tables, tracked, err_stream,
        ));
    }

    Ok(ledgers)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::ledger::Currency;
    use crate::log::WriteHandle;
    use crate::util::date::parse_standard_date;

    use super::super::section_csv::split_sections;
    use super::{dividend_security, year_ledger_from_sections};

    const SAMPLE: &str = "\
Trades,Header,DataDiscriminator,Asset Category,Currency,Symbol,Date/Time,Quantity,T. Price,Comm/Fee,Proceeds
Trades,Data,Order,Stocks,USD,VT,\"2020-06-11, 09:30:00\",\"1,200\",80.5,-1,-96600
Trades,Data,Order,Stocks,USD,VT,\"2020-07-11, 09:30:00\",-200,85,-1,17000
Trades,Data,Total,Stocks,USD,VT,,1000,,,
Dividends,Header,Currency,Date,Description,Amount
Dividends,Data,USD,2020-06-12,VT (US9220427424) Cash Dividend USD 0.5 per Share,5
Dividends,Data,GBP,2020-06-12,Untracked Cash Dividend,5
Dividends,Data,USD,2019-06-12,Stale Cash Dividend,5
Withholding Tax,Header,Currency,Date,Description,Amount
Withholding Tax,Data,USD,2020-06-12,VT Div Tax,-0.5
Change in Dividend Accruals,Header,Currency,Symbol,Date,Gross Amount,Tax
Change in Dividend Accruals,Data,USD,VT,2020-12-31,-3,-0.3
Fees,Header,Subtitle,Currency,Date,Description,Amount
Fees,Data,Other Fees,USD,2020-03-01,Market data,-4.5
Fees,Data,Total,USD,,,-4.5
Interest,Header,Currency,Date,Description,Amount
Interest,Data,USD,2020-04-01,USD Credit Interest,0.8
Interest,Data,Total,,,0.8
Deposits & Withdrawals,Header,Currency,Settle Date,Description,Amount
Deposits & Withdrawals,Data,RUB,2020-01-15,Wire in,100000
Deposits & Withdrawals,Data,USD,2020-02-15,Wire out,-300
";

    fn tracked() -> Vec<Currency> {
        vec![Currency::rub(), Currency::usd(), Currency::eur()]
    }

    #[test]
    fn test_dividend_security() {
        assert_eq!(
            dividend_security(
                "VT (US9220427424) Cash Dividend USD 0.5 per Share"
            ),
            "VT (US9220427424)"
        );
        assert_eq!(dividend_security("no marker"), "no marker");
    }

    #[test]
    fn test_full_statement() {
        let (mut errs, err_buff) = WriteHandle::string_buff_write_handle();
        let tables =
            split_sections(&mut SAMPLE.as_bytes(), &mut errs).unwrap();
        let ledger =
            year_ledger_from_sections(2020, &tables, &tracked(), &mut errs);

        assert_eq!(err_buff.borrow().as_str(), "");

        // Trades: the Total line (no negative fee) is dropped; thousands
        // separators parse.
        assert_eq!(ledger.executions.len(), 2);
        let buy = &ledger.executions[0];
        assert_eq!(buy.security, "VT");
        assert_eq!(buy.quantity, dec!(1200));
        assert_eq!(buy.price, dec!(80.5));
        assert_eq!(buy.fee, dec!(-1));
        assert_eq!(buy.proceeds, dec!(-96600));
        assert_eq!(
            buy.date,
            parse_standard_date("2020-06-11").unwrap()
        );
        assert_eq!(ledger.executions[1].quantity, dec!(-200));

        // Dividends: untracked GBP row and 2019 row dropped.
        let divs = ledger.dividends.as_ref().unwrap();
        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].security, "VT (US9220427424)");
        assert_eq!(divs[0].amount, dec!(5));

        let wh = ledger.withholding_tax.as_ref().unwrap();
        assert_eq!(wh.len(), 1);
        assert_eq!(wh[0].amount, dec!(-0.5));

        let accr = ledger.accrual_corrections.as_ref().unwrap();
        assert_eq!(accr.len(), 1);
        assert_eq!(accr[0].security, "VT");
        assert_eq!(accr[0].gross_amount, dec!(-3));
        assert_eq!(accr[0].tax, dec!(-0.3));

        // Fees: the Total subtitle line is dropped.
        let fees = ledger.fees.as_ref().unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].amount, dec!(-4.5));

        // Interest: the Total currency line is dropped.
        let interest = ledger.interest.as_ref().unwrap();
        assert_eq!(interest.len(), 1);
        assert_eq!(interest[0].description, "USD Credit Interest");

        let transfers = ledger.cash_transfers.as_ref().unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].currency, Currency::rub());
        assert_eq!(transfers[1].amount, dec!(-300));
    }

    #[test]
    fn test_absent_sections_are_none() {
        let (mut errs, _) = WriteHandle::string_buff_write_handle();
        let input = "Trades,Header,DataDiscriminator,Asset Category,\
                     Currency,Symbol,Date/Time,Quantity,T. Price,Comm/Fee,Proceeds\n";
        let tables = split_sections(&mut input.as_bytes(), &mut errs).unwrap();
        let ledger =
            year_ledger_from_sections(2020, &tables, &tracked(), &mut errs);

        assert_eq!(ledger.executions.len(), 0);
        assert!(ledger.dividends.is_none());
        assert!(ledger.withholding_tax.is_none());
        assert!(ledger.accrual_corrections.is_none());
        assert!(ledger.fees.is_none());
        assert!(ledger.interest.is_none());
        assert!(ledger.cash_transfers.is_none());
    }
}
