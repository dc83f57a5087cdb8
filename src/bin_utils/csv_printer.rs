use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{account::AccountType, id::AccountId};

/// Final state of one account opened by a script.
#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub account: String,
    pub id: AccountId,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub balance: Decimal,
    pub transactions: usize,
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl IntoIterator<Item = AccountRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for row in accounts {
        let alias = row.account.clone();
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write account `{alias}` to CSV"))?;
    }
    writer.flush().context("Failed to flush CSV writer")
}
