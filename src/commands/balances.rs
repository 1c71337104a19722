use crate::args::DeltaArg;
use crate::comment::{comment_source, motivational_comment, Mode};
use crate::commands::Out;
use crate::error::Error;
use crate::model::{DisplayRow, PendingDeltas};
use crate::{render, Config, Result};
use tracing::{debug, warn};

/// Shows the current balance of every configured account, in configured order.
///
/// `deltas` are applied on top of the stored balances for display only; nothing is written.
/// When `chart` is set a bar chart follows the table. Unless `no_comment` is set (or comments are
/// disabled in the config), a motivational comment is placed above the table. A failure to get a
/// comment never fails the command.
pub async fn balances(
    config: &Config,
    deltas: &[DeltaArg],
    chart: bool,
    no_comment: bool,
    api_key: Option<&str>,
    mode: Mode,
) -> Result<Out<Vec<DisplayRow>>> {
    let pending = pending_deltas(config, deltas)?;
    let rows = config.engine().current_balances(&pending).await?;

    let mut message = String::new();
    if !no_comment && config.comment().enabled() {
        let source = comment_source(config.comment(), api_key, mode);
        if let Some(text) = motivational_comment(source.as_ref()).await {
            message.push_str(&text);
            message.push_str("\n\n");
        }
    } else {
        debug!("Skipping the motivational comment");
    }

    message.push_str(&render::balance_table(&rows));
    if chart {
        message.push('\n');
        message.push_str(&render::bar_chart(&rows, config.chart()));
    }

    Ok(Out::new(message.trim_end(), rows))
}

/// Sums the deltas per account. Deltas for accounts that are not configured are dropped with a
/// warning.
fn pending_deltas(config: &Config, deltas: &[DeltaArg]) -> Result<PendingDeltas> {
    let accounts = config.account_names();
    let mut pending = PendingDeltas::new();
    for delta in deltas {
        if !accounts.iter().any(|a| a == delta.account()) {
            warn!("Ignoring the pending delta for unknown account '{}'", delta.account());
            continue;
        }
        let entry = pending.entry(delta.account().to_string()).or_default();
        *entry = entry.checked_add(delta.amount()).ok_or_else(|| {
            Error::validation(format!(
                "The pending deltas for '{}' overflow",
                delta.account()
            ))
        })?;
    }
    Ok(pending)
}
