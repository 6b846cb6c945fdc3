use std::collections::HashMap;
use std::io::Read;

use crate::log::WriteHandle;
use crate::write_errln;

use super::Error;

// An activity statement export is several logical CSV tables in one
// file. Every line starts with the section name and a Header/Data
// discriminator:
//
//   Trades,Header,DataDiscriminator,Asset Category,Currency,Symbol,...
//   Trades,Data,Order,Stocks,USD,VT,"2020-06-11, 09:30:00",...
//   Dividends,Header,Currency,Date,Description,Amount
//   Dividends,Data,USD,2020-06-12,VT Cash Dividend ...,12.3
//
pub const SECTION_CASH_TRANSFERS: &str = "Deposits & Withdrawals";
pub const SECTION_TRADES: &str = "Trades";
pub const SECTION_FEES: &str = "Fees";
pub const SECTION_DIVIDENDS: &str = "Dividends";
pub const SECTION_WITHHOLDING_TAX: &str = "Withholding Tax";
pub const SECTION_DIV_ACCRUALS: &str = "Change in Dividend Accruals";
pub const SECTION_INTEREST: &str = "Interest";

pub const SUPPORTED_SECTIONS: [&str; 7] = [
    SECTION_CASH_TRANSFERS,
    SECTION_TRADES,
    SECTION_FEES,
    SECTION_DIVIDENDS,
    SECTION_WITHHOLDING_TAX,
    SECTION_DIV_ACCRUALS,
    SECTION_INTEREST,
];

// One segmented section: lower-cased column names from its first Header
// line, plus every Data row that followed (under any repeated header).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SectionTable {
    pub section: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SectionTable {
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    // The statement renames a few columns between export versions.
    pub fn col_index_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.col_index(n))
    }
}

pub fn split_sections(
    r: &mut dyn Read,
    err_stream: &mut WriteHandle,
) -> Result<HashMap<String, SectionTable>, Error> {
    let mut csv_r = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(r);

    let mut tables: HashMap<String, SectionTable> = HashMap::new();

    for record_res in csv_r.records() {
        let record = match record_res {
            Ok(rec) => rec,
            Err(e) => {
                write_errln!(err_stream, "Error reading statement record: {}", e);
                continue;
            }
        };

        let section = match record.get(0) {
            Some(s) => s,
            None => continue,
        };
        if !SUPPORTED_SECTIONS.contains(&section) {
            continue;
        }
        let discriminator = match record.get(1) {
            Some(d) => d,
            None => continue,
        };
        let fields: Vec<String> =
            record.iter().skip(2).map(|f| f.to_string()).collect();

        match discriminator {
            "Header" => {
                // Some exports carry a per-account Trades sub-table; its
                // header starts with "Account" and its data rows belong
                // to the main table's columns anyway.
                if section == SECTION_TRADES
                    && fields.first().map(|f| f.as_str()) == Some("Account")
                {
                    continue;
                }
                // Repeated headers within a section continue the first
                // table rather than starting a new one.
                tables
                    .entry(section.to_string())
                    .or_insert_with(|| SectionTable {
                        section: section.to_string(),
                        columns: fields
                            .iter()
                            .map(|f| f.to_lowercase())
                            .collect(),
                        rows: Vec::new(),
                    });
            }
            "Data" => {
                match tables.get_mut(section) {
                    Some(table) => table.rows.push(fields),
                    None => {
                        write_errln!(
                            err_stream,
                            "Data row in section {:?} before any header",
                            section
                        );
                    }
                }
            }
            // Total/SubTotal and similar summary lines
            _ => continue,
        }
    }

    Ok(tables)
}
