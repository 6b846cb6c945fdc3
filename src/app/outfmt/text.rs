use std::io::Write;

use tabled::settings::{object::Rows, Alignment};

use crate::{ledger::render::RenderTable, log::WriteHandle};

use super::model::{OutputType, ReportWriter};

pub struct TextWriter {
    w: WriteHandle,
}

impl TextWriter {
    pub fn new(w: WriteHandle) -> TextWriter {
        TextWriter { w: w }
    }
}

impl ReportWriter for TextWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), super::model::Error> {
        let map_write_err = |e| format!("{e}");

        for err in &table_model.errors {
            writeln!(self.w, "[!] {}", err).map_err(map_write_err)?;
        }

        let title = match out_type {
            OutputType::Trades => format!("Trades for {}", name),
            OutputType::Dividends => format!("Dividends for {}", name),
            OutputType::DividendAccruals => {
                format!("Dividend accrual corrections for {}", name)
            }
            OutputType::DividendSummary => {
                format!("Final dividend figures for {}", name)
            }
            OutputType::Fees => format!("Fees for {}", name),
            OutputType::Interest => format!("Interest for {}", name),
            OutputType::CashTransfers => format!("Cash transfers for {}", name),
            OutputType::Harvest => "Tax-loss harvesting suggestions".to_string(),
        };
        writeln!(self.w, "{}", title).map_err(map_write_err)?;

        if table_model.rows.is_empty() {
            writeln!(self.w, "  (no rows)\n").map_err(map_write_err)?;
            for note in &table_model.notes {
                writeln!(self.w, "{note}").map_err(map_write_err)?;
            }
            return Ok(());
        }

        let mut table_bldr = tabled::builder::Builder::default();
        table_bldr.push_record(
            table_model
                .header
                .iter()
                .map(|h| h.to_uppercase())
                .collect::<Vec<String>>(),
        );
        for row in &table_model.rows {
            table_bldr.push_record(row);
        }

        // The footer acts as a smaller table under the main table,
        // separated by a single blank row.
        if table_model.footer.len() > 0 {
            let mut split_line = Vec::with_capacity(table_model.footer.len());
            split_line.resize_with(table_model.footer.len(), || String::new());
            table_bldr.push_record(split_line);
            table_bldr.push_record(table_model.footer.clone());
        }

        let mut table = table_bldr.build();
        table.with(tabled::settings::Style::ascii());
        // Center the header
        table.modify(Rows::first(), Alignment::center());

        writeln!(self.w, "{table}").map_err(map_write_err)?;

        for note in &table_model.notes {
            writeln!(self.w, "{note}").map_err(map_write_err)?;
        }

        writeln!(self.w, "").map_err(map_write_err)?;
        Ok(())
    }
}
