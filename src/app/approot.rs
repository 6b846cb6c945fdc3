use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use time::{Date, Month};
use tracing::info;

use crate::app::outfmt::csv::CsvWriter;
use crate::app::outfmt::model::{OutputType, ReportWriter};
use crate::app::outfmt::text::TextWriter;
use crate::fx::io::{CbrRemoteRateLoader, CsvRatesCache, RateLoader};
use crate::fx::RateResolver;
use crate::ledger::aggregate::{
    aggregate_accruals, aggregate_cash_transfers, aggregate_dividends,
    aggregate_fees, aggregate_interest, dividend_final_summary,
};
use crate::ledger::bookkeeping::{
    find_harvestable_losses, trade_report, LotMatcher,
};
use crate::ledger::io::{load_multi_year_ledger, YahooPriceQuoter};
use crate::ledger::render::{
    cashflow_table, dividend_summary_table, dividend_table, fee_table,
    harvest_table, interest_table, trade_tables,
};
use crate::ledger::{Currency, YearLedger};
use crate::log::WriteHandle;
use crate::util::date::today_local;
use crate::write_errln;

pub type Error = String;

pub struct Config {
    pub statements_dir: String,
    pub tax_rate: Decimal,
    pub force_download: bool,
    pub csv_output_dir: Option<String>,
    pub no_advisor: bool,
}

fn foreign_currencies() -> Vec<Currency> {
    vec![Currency::usd(), Currency::eur()]
}

fn tracked_currencies() -> Vec<Currency> {
    let mut curs = vec![Currency::default()];
    curs.append(&mut foreign_currencies());
    curs
}

fn print_all(
    writers: &mut Vec<Box<dyn ReportWriter>>,
    out_type: OutputType,
    name: &str,
    table: &crate::ledger::render::RenderTable,
) -> Result<(), Error> {
    for w in writers.iter_mut() {
        w.print_render_table(out_type, name, table)?;
    }
    Ok(())
}

fn process_year(
    ledger: &YearLedger,
    matcher: &mut LotMatcher,
    resolver: &RateResolver,
    cfg: &Config,
    writers: &mut Vec<Box<dyn ReportWriter>>,
    err_stream: &mut WriteHandle,
) -> Result<(), Error> {
    let year = ledger.year;
    let year_name = year.to_string();
    info!("processing year {}", year);

    // Trades: matching always advances the queues; a rate failure only
    // loses this year's trade table.
    let year_match = matcher.match_year(&ledger.executions, err_stream);
    match trade_report(&year_match, resolver, cfg.tax_rate) {
        Ok(report) => {
            let tables = trade_tables(&report, resolver.base());
            print_all(
                writers,
                OutputType::Trades,
                &format!("{} equity", year),
                &tables.equity,
            )?;
            print_all(
                writers,
                OutputType::Trades,
                &format!("{} derivative", year),
                &tables.derivative,
            )?;
        }
        Err(e) => {
            write_errln!(
                err_stream,
                "Could not compute the {} trade report: {}",
                year, e
            );
        }
    }

    // Dividends and their accrual corrections
    let div_report = match aggregate_dividends(
        &ledger.dividends,
        &ledger.withholding_tax,
        resolver,
        cfg.tax_rate,
        err_stream,
    ) {
        Ok(r) => r,
        Err(e) => {
            write_errln!(
                err_stream,
                "Could not compute {} dividends: {}",
                year, e
            );
            None
        }
    };
    let accr_report = match aggregate_accruals(
        &ledger.accrual_corrections,
        resolver,
        cfg.tax_rate,
    ) {
        Ok(r) => r,
        Err(e) => {
            write_errln!(
                err_stream,
                "Could not compute {} dividend accruals: {}",
                year, e
            );
            None
        }
    };

    if let Some(report) = &div_report {
        print_all(
            writers,
            OutputType::Dividends,
            &year_name,
            &dividend_table(report, resolver.base()),
        )?;
    }
    if let Some(report) = &accr_report {
        print_all(
            writers,
            OutputType::DividendAccruals,
            &year_name,
            &dividend_table(report, resolver.base()),
        )?;
    }
    if div_report.is_some() || accr_report.is_some() {
        let summary =
            dividend_final_summary(div_report.as_ref(), accr_report.as_ref());
        print_all(
            writers,
            OutputType::DividendSummary,
            &year_name,
            &dividend_summary_table(&summary, resolver.base()),
        )?;
    }

    match aggregate_fees(&ledger.fees, resolver) {
        Ok(Some(report)) => {
            print_all(
                writers,
                OutputType::Fees,
                &year_name,
                &fee_table(&report, resolver.base()),
            )?;
        }
        Ok(None) => (),
        Err(e) => {
            write_errln!(err_stream, "Could not compute {} fees: {}", year, e);
        }
    }

    match aggregate_interest(&ledger.interest, resolver, cfg.tax_rate) {
        Ok(Some(report)) => {
            print_all(
                writers,
                OutputType::Interest,
                &year_name,
                &interest_table(&report, resolver.base()),
            )?;
        }
        Ok(None) => (),
        Err(e) => {
            write_errln!(
                err_stream,
                "Could not compute {} interest: {}",
                year, e
            );
        }
    }

    if let Some(report) =
        aggregate_cash_transfers(&ledger.cash_transfers, resolver)
    {
        print_all(
            writers,
            OutputType::CashTransfers,
            &year_name,
            &cashflow_table(&report),
        )?;
    }

    Ok(())
}

pub fn run(cfg: &Config) -> Result<(), Error> {
    let mut err_stream = WriteHandle::stderr_write_handle();

    let tracked = tracked_currencies();
    let ledgers = load_multi_year_ledger(
        Path::new(&cfg.statements_dir),
        &tracked,
        &mut err_stream,
    )?;
    if ledgers.is_empty() {
        return Err(format!(
            "No statements found in {:?}. Expected one csv activity \
             statement per year, named like 2021.csv",
            cfg.statements_dir
        ));
    }

    let first_year = ledgers.first_year().unwrap();
    let range_start =
        Date::from_calendar_date(first_year, Month::January, 1).unwrap();
    let today = today_local();

    let mut rate_loader = RateLoader::new(
        cfg.force_download,
        Box::new(CsvRatesCache::new(err_stream.clone())),
        Box::new(CbrRemoteRateLoader::new()),
        err_stream.clone(),
    );
    let mut series = HashMap::new();
    for cur in foreign_currencies() {
        let s = rate_loader.get_rate_series(&cur, range_start, today)?;
        series.insert(cur, s);
    }
    let resolver = RateResolver::new(Currency::default(), series);

    let mut writers: Vec<Box<dyn ReportWriter>> = vec![Box::new(
        TextWriter::new(WriteHandle::stdout_write_handle()),
    )];
    if let Some(dir) = &cfg.csv_output_dir {
        writers.push(Box::new(
            CsvWriter::new(dir).map_err(|e| e.to_string())?,
        ));
    }

    let mut matcher = LotMatcher::new();
    for ledger in ledgers.iter_ascending() {
        process_year(
            ledger,
            &mut matcher,
            &resolver,
            cfg,
            &mut writers,
            &mut err_stream,
        )?;
    }

    // The advisor only makes sense against today's prices, for lots that
    // are still open after the newest statement.
    if !cfg.no_advisor && ledgers.last_year() == Some(today.year()) {
        let mut quoter = YahooPriceQuoter::new();
        let suggestions = find_harvestable_losses(
            matcher.positions(),
            &resolver,
            &mut quoter,
            &mut err_stream,
        );
        let table = harvest_table(&suggestions, resolver.base());
        print_all(&mut writers, OutputType::Harvest, "today", &table)?;
    }

    for w in writers {
        w.finish()?;
    }

    Ok(())
}
