use crate::ledger::render::RenderTable;

#[derive(Clone, Copy)]
pub enum OutputType {
    Trades,
    Dividends,
    DividendAccruals,
    DividendSummary,
    Fees,
    Interest,
    CashTransfers,
    Harvest,
}

pub type Error = String;

pub trait ReportWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error>;

    fn finish(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}
