use crate::commands::Out;
use crate::model::{Kind, Transaction, Yen};
use crate::{Config, Result};

/// Records `amount` against `account`. A `Liability` decreases the account.
pub async fn record(config: &Config, account: &str, amount: Yen, kind: Kind) -> Result<Out<Transaction>> {
    let transaction = config
        .engine()
        .record_transaction(account, amount.value(), kind)
        .await?;
    Ok(Out::new(
        format!(
            "Added {} ({}) to {}",
            amount,
            transaction.kind(),
            transaction.account()
        ),
        transaction,
    ))
}
