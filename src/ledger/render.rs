use rust_decimal::Decimal;

use crate::util::decimal::dollar_precision_str;

use super::aggregate::{
    CashflowReport, DividendFinalSummary, DividendReport, FeeReport,
    InterestReport,
};
use super::bookkeeping::{LossHarvestSuggestion, TradeReport};
use super::{Currency, SecurityClass};

pub struct RenderTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
}

impl RenderTable {
    fn new(header: Vec<&str>) -> RenderTable {
        RenderTable {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            footer: Vec::new(),
            notes: Vec::new(),
            errors: Vec::new(),
        }
    }
}

fn money(d: &Decimal) -> String {
    dollar_precision_str(d)
}

// Repeated security cells are blanked for readability; rows arrive
// sorted by security already.
fn blank_repeats(rows: &mut Vec<Vec<String>>, col: usize) {
    let mut last = String::new();
    for row in rows {
        if row[col] == last {
            row[col] = String::new();
        } else {
            last = row[col].clone();
        }
    }
}

pub struct TradeTables {
    pub equity: RenderTable,
    pub derivative: RenderTable,
}

pub fn trade_tables(report: &TradeReport, base: &Currency) -> TradeTables {
    let build = |class: SecurityClass,
                 income_sum: &Decimal,
                 tax_sum: &Decimal|
     -> RenderTable {
        let amount_base_hdr = format!("Amount ({})", base);
        let mut table = RenderTable::new(vec![
            "Security",
            "Side",
            "Date",
            "Quantity",
            "Price",
            "Fee",
            "Currency",
            "Amount",
            "Rate",
            amount_base_hdr.as_str(),
            "Tax est.",
        ]);

        for row in report.rows_of_class(class) {
            table.rows.push(vec![
                row.security.clone(),
                row.side.to_string(),
                row.date.to_string(),
                row.quantity.to_string(),
                money(&row.price),
                money(&row.fee),
                row.currency.to_string(),
                money(&row.amount),
                row.rate.to_string(),
                money(&row.amount_base),
                money(&row.tax_estimate),
            ]);
        }
        blank_repeats(&mut table.rows, 0);

        let mut footer = vec![String::new(); table.header.len()];
        footer[8] = "Total:".to_string();
        footer[9] = money(income_sum);
        footer[10] = money(tax_sum);
        table.footer = footer;

        for sec in &report.rejected {
            if super::classify(sec) == class {
                table.errors.push(format!(
                    "{} was sold in a greater quantity than was bought; \
                     its trades are excluded from this table.",
                    sec
                ));
            }
        }

        table
    };

    TradeTables {
        equity: build(
            SecurityClass::Equity,
            &report.income_base_sum_equity,
            &report.tax_estimate_sum_equity,
        ),
        derivative: build(
            SecurityClass::Derivative,
            &report.income_base_sum_derivative,
            &report.tax_estimate_sum_derivative,
        ),
    }
}

pub fn dividend_table(report: &DividendReport, base: &Currency) -> RenderTable {
    let amount_base_hdr = format!("Amount ({})", base);
    let tax_paid_base_hdr = format!("Tax paid ({})", base);
    let tax_full_base_hdr = format!("Tax full ({})", base);
    let tax_rest_base_hdr = format!("Tax due ({})", base);
    let mut table = RenderTable::new(vec![
        "Security",
        "Date",
        "Amount",
        "Currency",
        "Tax paid",
        "Rate",
        amount_base_hdr.as_str(),
        tax_paid_base_hdr.as_str(),
        tax_full_base_hdr.as_str(),
        tax_rest_base_hdr.as_str(),
    ]);

    for row in &report.rows {
        table.rows.push(vec![
            row.security.clone(),
            row.date.to_string(),
            money(&row.amount),
            row.currency.to_string(),
            money(&row.tax_paid),
            row.rate.to_string(),
            money(&row.amount_base),
            money(&row.tax_paid_base),
            money(&row.tax_full_base),
            money(&row.tax_rest_base),
        ]);
    }

    let mut footer = vec![String::new(); table.header.len()];
    footer[5] = "Total:".to_string();
    footer[6] = money(&report.amount_base_sum);
    footer[7] = money(&report.tax_paid_base_sum);
    footer[8] = money(&report.tax_full_base_sum);
    footer[9] = money(&report.tax_rest_base_sum);
    table.footer = footer;

    table
}

pub fn dividend_summary_table(
    summary: &DividendFinalSummary,
    base: &Currency,
) -> RenderTable {
    let mut table = RenderTable::new(vec![
        format!("Dividends ({})", base).as_str(),
        format!("Tax paid ({})", base).as_str(),
        format!("Tax full ({})", base).as_str(),
        format!("Tax due ({})", base).as_str(),
    ]);
    table.rows.push(vec![
        money(&summary.amount_base_sum),
        money(&summary.tax_paid_base_sum),
        money(&summary.tax_full_base_sum),
        money(&summary.tax_rest_base_sum),
    ]);
    table
        .notes
        .push("Dividends and accrual corrections, combined.".to_string());
    table
}

pub fn fee_table(report: &FeeReport, base: &Currency) -> RenderTable {
    let fee_base_hdr = format!("Fee ({})", base);
    let mut table = RenderTable::new(vec![
        "Date",
        "Fee",
        "Currency",
        "Rate",
        fee_base_hdr.as_str(),
    ]);
    for row in &report.rows {
        table.rows.push(vec![
            row.date.to_string(),
            money(&row.fee),
            row.currency.to_string(),
            row.rate.to_string(),
            money(&row.fee_base),
        ]);
    }
    let mut footer = vec![String::new(); table.header.len()];
    footer[3] = "Total:".to_string();
    footer[4] = money(&report.fee_base_sum);
    table.footer = footer;
    table
}

pub fn interest_table(report: &InterestReport, base: &Currency) -> RenderTable {
    let amount_base_hdr = format!("Amount ({})", base);
    let mut table = RenderTable::new(vec![
        "Date",
        "Description",
        "Amount",
        "Currency",
        "Rate",
        amount_base_hdr.as_str(),
        "Tax est.",
    ]);
    for row in &report.rows {
        table.rows.push(vec![
            row.date.to_string(),
            row.description.clone(),
            money(&row.amount),
            row.currency.to_string(),
            row.rate.to_string(),
            money(&row.amount_base),
            money(&row.tax_estimate),
        ]);
    }
    let mut footer = vec![String::new(); table.header.len()];
    footer[4] = "Total:".to_string();
    footer[5] = money(&report.amount_base_sum);
    footer[6] = money(&report.tax_estimate_sum);
    table.footer = footer;
    table
}

pub fn cashflow_table(report: &CashflowReport) -> RenderTable {
    let mut table =
        RenderTable::new(vec!["Date", "Type", "Amount", "Currency"]);
    for row in &report.rows {
        table.rows.push(vec![
            row.date.to_string(),
            row.kind.to_string(),
            money(&row.amount),
            row.currency.to_string(),
        ]);
    }
    for (cur, sum) in &report.sums_by_currency {
        table.notes.push(format!("Net {}: {}", cur, money(sum)));
    }
    table
}

pub fn harvest_table(
    suggestions: &[LossHarvestSuggestion],
    base: &Currency,
) -> RenderTable {
    let loss_hdr = format!("Realizable loss ({})", base);
    let mut table = RenderTable::new(vec![
        "Security",
        "Sellable quantity",
        loss_hdr.as_str(),
    ]);
    for s in suggestions {
        table.rows.push(vec![
            s.security.clone(),
            s.sellable_quantity.to_string(),
            money(&s.unrealized_loss_base.abs()),
        ]);
        table.notes.push(format!(
            "Selling {} units of {} today would realize a paper loss of {} {}.",
            s.sellable_quantity,
            s.security,
            money(&s.unrealized_loss_base.abs()),
            base
        ));
    }
    if suggestions.is_empty() {
        table
            .notes
            .push("No open lots are currently at a loss.".to_string());
    }
    table
}
