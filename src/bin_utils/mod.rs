//! Drives a [`Bank`] from a CSV command script and prints the resulting
//! accounts. Kept in the library so the integration tests can run it.

use std::collections::HashMap;
use std::io::{Read, Write};

use anyhow::Result;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    bank::{Bank, BankError, OpenAccountRequest},
    id::AccountId,
    store::{BankStore, in_memory_store::InMemoryBankStore},
};
use csv_parser::{Command, CsvCommandParser, Operation};
use csv_printer::{AccountRow, print_accounts};

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error("Column `{field}` is required for {op:?}")]
    MissingField {
        op: Operation,
        field: &'static str,
    },
    #[error("Account `{0}` was never opened")]
    UnknownAccount(String),
    #[error("Account `{0}` is already opened")]
    DuplicateAccount(String),
    #[error(transparent)]
    Bank(#[from] BankError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, ServiceError)>,
}

/// Script aliases in opening order.
#[derive(Default)]
struct Aliases {
    order: Vec<String>,
    ids: HashMap<String, AccountId>,
}

impl Aliases {
    fn resolve(&self, alias: &str) -> Result<AccountId, ServiceError> {
        self.ids
            .get(alias)
            .copied()
            .ok_or_else(|| ServiceError::UnknownAccount(alias.to_string()))
    }
}

fn required<T>(value: Option<T>, op: Operation, field: &'static str) -> Result<T, ServiceError> {
    value.ok_or(ServiceError::MissingField { op, field })
}

fn execute<S: BankStore>(
    bank: &Bank<S>,
    aliases: &mut Aliases,
    cmd: Command,
) -> Result<(), ServiceError> {
    let amount = |cmd: &Command| -> Result<Decimal, ServiceError> {
        required(cmd.amount, cmd.op, "amount")
    };
    match cmd.op {
        Operation::Open => {
            if aliases.ids.contains_key(&cmd.account) {
                return Err(ServiceError::DuplicateAccount(cmd.account));
            }
            let name = required(cmd.name, cmd.op, "name")?;
            let (first_name, last_name) = name.split_once(' ').unwrap_or((name.as_str(), ""));
            let opened = bank.open_account(OpenAccountRequest {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth: required(cmd.dob, cmd.op, "dob")?,
                account_type: required(cmd.kind, cmd.op, "kind")?,
            })?;
            aliases.ids.insert(cmd.account.clone(), opened.account_id);
            aliases.order.push(cmd.account);
        }
        Operation::Deposit => {
            bank.deposit(aliases.resolve(&cmd.account)?, amount(&cmd)?)?;
        }
        Operation::Withdraw => {
            bank.withdraw(aliases.resolve(&cmd.account)?, amount(&cmd)?)?;
        }
        Operation::Transfer => {
            let to = required(cmd.to.as_deref(), cmd.op, "to")?;
            bank.transfer(
                aliases.resolve(&cmd.account)?,
                aliases.resolve(to)?,
                amount(&cmd)?,
            )?;
        }
    }
    Ok(())
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvCommandParser::new(self.input);

        let bank = Bank::<InMemoryBankStore>::in_memory();
        let mut aliases = Aliases::default();

        for (line, row) in parser {
            let outcome = row
                .map_err(ServiceError::from)
                .and_then(|cmd| execute(&bank, &mut aliases, cmd));
            if let Err(err) = outcome {
                (self.error_printer)(line, err);
            }
        }

        let mut rows = Vec::with_capacity(aliases.order.len());
        for alias in aliases.order {
            let id = aliases.ids[&alias];
            let details = bank.account(id)?;
            rows.push(AccountRow {
                account: alias,
                id,
                account_type: details.account_type,
                balance: details.balance,
                transactions: bank.transactions(id)?.len(),
            });
        }
        print_accounts(self.output, rows)
    }
}
