use std::str::FromStr;

use clap::Parser;
use rust_decimal::Decimal;

const ABOUT: &str =
    "Annual tax report generator for Interactive Brokers statements";

const LONG_ABOUT: &str = "\
A cli tool which turns per-year Interactive Brokers activity statement
exports into tax-relevant summaries: realized gains and losses (FIFO lot
matching), dividend tax owed net of tax withheld, fee and interest totals,
and net cash movement, all converted into RUB with official CBR rates.

Statement files must be csv exports, one per year, named like 2021.csv.
Exchange rates are downloaded from cbr.ru and cached under ~/.ibtax/.";

fn parse_tax_rate(s: &str) -> Result<Decimal, String> {
    let rate = Decimal::from_str(s).map_err(|e| e.to_string())?;
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(format!("Tax rate must be within [0, 1), got {}", rate));
    }
    Ok(rate)
}

#[derive(Parser, Debug)]
#[command(version, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    /// Directory with per-year statement exports, named YEAR.csv
    #[arg(default_value = "reports")]
    pub statements_dir: String,

    /// Print verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Download exchange rates, even if they are cached
    #[arg(short, long, default_value_t = false)]
    pub force_download: bool,

    /// Flat tax rate applied to income in the base currency
    #[arg(long, value_parser = parse_tax_rate, default_value = "0.13")]
    pub tax_rate: Decimal,

    /// Write result tables as CSV into the specified directory, in
    /// addition to printing them.
    #[arg(short = 'd', long)]
    pub csv_output_dir: Option<String>,

    /// Skip the tax-loss harvesting suggestions (which need live market
    /// prices).
    #[arg(long, default_value_t = false)]
    pub no_advisor: bool,
}

pub fn command_main() {
    crate::tracing::setup_tracing();
    let args = Args::parse();
    crate::log::set_verbose(args.verbose);

    let cfg = crate::app::Config {
        statements_dir: args.statements_dir,
        tax_rate: args.tax_rate,
        force_download: args.force_download,
        csv_output_dir: args.csv_output_dir,
        no_advisor: args.no_advisor,
    };

    if let Err(e) = crate::app::run(&cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::parse_tax_rate;

    #[test]
    fn test_parse_tax_rate() {
        assert_eq!(parse_tax_rate("0.13").unwrap(), dec!(0.13));
        assert_eq!(parse_tax_rate("0").unwrap(), dec!(0));
        assert!(parse_tax_rate("1").is_err());
        assert!(parse_tax_rate("-0.1").is_err());
        assert!(parse_tax_rate("x").is_err());
    }
}
