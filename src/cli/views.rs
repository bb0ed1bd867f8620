//! Read-only rendering of store data for the terminal.

use crate::cli::ui;
use crate::core::investment::{Asset, Investment};
use crate::core::valuation;
use crate::store::{PortfolioSummary, sync::SyncOutcome};
use comfy_table::Cell;

/// Group an amount with dot separators, Indonesian style (1.050.000).
pub fn format_amount(value: f64) -> String {
    let rounded = value.abs().round() as u64;
    let negative = value < 0.0 && rounded > 0;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn holdings_table(records: &[Investment], currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Name"),
        ui::header_cell("Type"),
        ui::header_cell(&format!("Invested ({currency})")),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("P/L (%)"),
        ui::header_cell("Status"),
        ui::header_cell("Synced"),
        ui::header_cell("Id"),
    ]);

    for record in records {
        let invested = record.asset.invested_value();
        let profit_loss = valuation::profit_loss(record.current_value, invested);
        let pct = valuation::profit_loss_pct(profit_loss, invested);

        table.add_row(vec![
            Cell::new(record.asset.display_name()),
            Cell::new(record.kind().to_string()),
            Cell::new(format_amount(invested)),
            Cell::new(format_amount(record.current_value)),
            ui::change_cell(pct),
            ui::status_cell(record.price_status),
            Cell::new(if record.synced { "yes" } else { "no" }),
            Cell::new(&record.id),
        ]);
    }

    table.to_string()
}

/// One-record detail block, shown after add/edit/refresh of a single id.
pub fn record_detail(record: &Investment, currency: &str) -> String {
    let mut lines = vec![
        format!(
            "{} [{}] {}",
            ui::style_text(record.asset.display_name(), ui::StyleType::Title),
            record.kind(),
            ui::style_text(&record.id, ui::StyleType::Subtle)
        ),
        format!(
            "Value ({}): {}  (status: {})",
            currency,
            ui::style_text(&format_amount(record.current_value), ui::StyleType::TotalValue),
            record.price_status
        ),
    ];

    if let Asset::Deposito(deposit) = &record.asset {
        let interest =
            valuation::deposito_interest(deposit.principal, deposit.annual_rate, deposit.tenor);
        lines.push(format!(
            "Matures {}: interest {} gross, {} after {:.0}% tax",
            deposit.maturity_date(),
            format_amount(interest),
            format_amount(valuation::net_interest(interest, deposit.tax_rate)),
            deposit.tax_rate,
        ));
    }
    if let Some(notes) = &record.notes {
        lines.push(ui::style_text(notes, ui::StyleType::Subtle));
    }
    lines.join("\n")
}

pub fn summary_block(summary: &PortfolioSummary, currency: &str) -> String {
    let mut output = format!(
        "{}\n\n",
        ui::style_text("Portfolio Summary", ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&format!("Invested ({currency})")),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell(&format!("P/L ({currency})")),
        ui::header_cell("P/L (%)"),
    ]);
    table.add_row(vec![
        Cell::new(format_amount(summary.total_invested)),
        Cell::new(format_amount(summary.total_value)),
        Cell::new(format_amount(summary.profit_loss)),
        ui::change_cell(summary.profit_loss_pct),
    ]);
    output.push_str(&table.to_string());

    output.push_str(&format!(
        "\n\n{} records: {} updated, {} pending, {} failed, {} static",
        summary.total_count,
        summary.status.updated,
        summary.status.pending,
        summary.status.failed,
        summary.status.static_,
    ));
    output.push_str(&format!(
        "\nSynced: {}/{} ({:.0}%)",
        summary.synced_count, summary.total_count, summary.synced_pct
    ));
    output
}

pub fn sync_outcomes_table(outcomes: &[SyncOutcome]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Result"),
        ui::header_cell("Error"),
    ]);
    for outcome in outcomes {
        table.add_row(vec![
            Cell::new(&outcome.id),
            Cell::new(if outcome.ok { "synced" } else { "failed" }),
            Cell::new(outcome.error.as_deref().unwrap_or("-")),
        ]);
    }
    table.to_string()
}
