//! Plain-text rendering of balances, the balances chart and the transaction log.

use crate::config::ChartConfig;
use crate::model::{DisplayRow, Transaction, Yen};

/// Renders the balances as a markdown table.
pub(crate) fn balance_table(rows: &[DisplayRow]) -> String {
    let mut out = String::new();
    out.push_str("| Account | Previous balance | Pending | Current balance |\n");
    out.push_str("|---|--:|--:|--:|\n");
    for row in rows {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.account(),
            row.previous_balance(),
            row.pending_delta(),
            row.current_balance()
        ));
    }
    out
}

/// Renders the transaction log as a markdown table.
pub(crate) fn ledger_table(transactions: &[Transaction]) -> String {
    let mut out = String::new();
    out.push_str("| ID | Created at (UTC) | Account | Type | Amount |\n");
    out.push_str("|--:|---|---|---|--:|\n");
    for t in transactions {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            t.id(),
            t.created_at_string(),
            t.account(),
            t.kind(),
            t.yen()
        ));
    }
    out
}

/// The value at the top of the chart scale: the largest current balance plus the configured
/// headroom, but never less than the configured floor.
pub(crate) fn chart_scale(rows: &[DisplayRow], chart: &ChartConfig) -> i64 {
    let largest = rows
        .iter()
        .map(|r| r.current_balance().value())
        .max()
        .unwrap_or_default();
    largest.saturating_add(chart.headroom).max(chart.floor)
}

/// Length of the bar for `value`. Negative balances have no bar.
fn bar_len(value: i64, scale: i64, width: usize) -> usize {
    if value <= 0 || scale <= 0 {
        return 0;
    }
    let len = i128::from(value) * width as i128 / i128::from(scale);
    usize::try_from(len).unwrap_or(width).min(width)
}

/// Renders a horizontal bar chart of the current balances.
pub(crate) fn bar_chart(rows: &[DisplayRow], chart: &ChartConfig) -> String {
    let scale = chart_scale(rows, chart);
    let name_width = rows
        .iter()
        .map(|r| r.account().chars().count())
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    for row in rows {
        let name = row.account();
        let padding = " ".repeat(name_width - name.chars().count());
        let current = row.current_balance();
        let bar = "█".repeat(bar_len(current.value(), scale, chart.width));
        out.push_str(&format!("{name}{padding} | {bar} {current}\n"));
    }
    out.push_str(&format!("(scale: {} to {})\n", Yen::new(0), Yen::new(scale)));
    out
}
