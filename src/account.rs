use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    customer::Customer,
    id::{AccountId, IdGenerator, TransactionId},
    lock_order::{PoisonedLockExt, lock_pair},
    transaction::{Transaction, TransactionError, TransactionKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Deposit,
    Savings,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountTypeError {
    #[error("Unknown account type `{0}`")]
    Unknown(String),
}

impl FromStr for AccountType {
    type Err = AccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(AccountType::Deposit),
            "SAVINGS" => Ok(AccountType::Savings),
            _ => Err(AccountTypeError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Deposit => f.write_str("DEPOSIT"),
            AccountType::Savings => f.write_str("SAVINGS"),
        }
    }
}

/// Why an account left its state untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("Insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountId),
    #[error("Cannot transfer from an account to itself")]
    SameAccount,
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Both halves of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLegs {
    pub debit: TransactionId,
    pub credit: TransactionId,
}

/// Mutable state of an account, only ever touched under the account lock.
#[derive(Debug, Default)]
struct Ledger {
    balance: Decimal,
    transactions: Vec<Transaction>,
}

impl Ledger {
    fn record(&mut self, txn: Transaction, balance: Decimal) -> TransactionId {
        let id = txn.id();
        self.transactions.push(txn);
        self.balance = balance;
        id
    }

    fn credit(
        &mut self,
        owner: AccountId,
        amount: Decimal,
        from: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Result<TransactionId, AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeAmount(amount));
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow(owner))?;
        let txn = Transaction::new(
            ids.next_id(),
            amount,
            TransactionKind::Credit,
            from,
            Some(owner),
        )?;
        let txn_id = self.record(txn, balance);
        debug!(account_id = owner, txn_id, %amount, ?from, %balance, "Credited");
        Ok(txn_id)
    }

    fn debit(
        &mut self,
        owner: AccountId,
        amount: Decimal,
        to: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Result<TransactionId, AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeAmount(amount));
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        let balance = self.balance - amount;
        let txn = Transaction::new(ids.next_id(), amount, TransactionKind::Debit, Some(owner), to)?;
        let txn_id = self.record(txn, balance);
        debug!(account_id = owner, txn_id, %amount, ?to, %balance, "Debited");
        Ok(txn_id)
    }
}

fn ignored<T>(account_id: AccountId, result: Result<T, AccountError>) -> Option<T> {
    result
        .inspect_err(|err| warn!(account_id, %err, "Operation ignored"))
        .ok()
}

/// A customer's account. Balance and history live behind a single mutex;
/// everything else is fixed at opening.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    customer: Arc<Customer>,
    account_type: AccountType,
    created_at: DateTime<Utc>,
    ledger: Mutex<Ledger>,
}

impl Account {
    pub fn new(id: AccountId, customer: Arc<Customer>, account_type: AccountType) -> Self {
        Self {
            id,
            customer,
            account_type,
            created_at: Utc::now(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn customer(&self) -> &Arc<Customer> {
        &self.customer
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn balance(&self) -> Decimal {
        self.ledger.ensure_lock().balance
    }

    /// Snapshot of the history, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ledger.ensure_lock().transactions.clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger.ensure_lock().transactions.len()
    }

    /// Credits `amount`, optionally recording the account it came from.
    ///
    /// Negative amounts are ignored and `None` is returned. Zero is recorded.
    pub fn deposit(
        &self,
        amount: Decimal,
        from: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Option<TransactionId> {
        ignored(self.id, self.try_deposit(amount, from, ids))
    }

    /// Same as [`Account::deposit`], reporting why nothing was recorded.
    pub fn try_deposit(
        &self,
        amount: Decimal,
        from: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Result<TransactionId, AccountError> {
        self.ledger.ensure_lock().credit(self.id, amount, from, ids)
    }

    /// Debits `amount`, optionally recording the account it went to.
    ///
    /// Negative amounts and amounts above the current balance are ignored
    /// and `None` is returned.
    pub fn withdraw(
        &self,
        amount: Decimal,
        to: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Option<TransactionId> {
        ignored(self.id, self.try_withdraw(amount, to, ids))
    }

    /// Same as [`Account::withdraw`], reporting why nothing was recorded.
    pub fn try_withdraw(
        &self,
        amount: Decimal,
        to: Option<AccountId>,
        ids: &dyn IdGenerator,
    ) -> Result<TransactionId, AccountError> {
        self.ledger.ensure_lock().debit(self.id, amount, to, ids)
    }

    /// Moves `amount` from this account to `to` with both accounts locked.
    ///
    /// Locks are taken in account id order, so concurrent transfers in
    /// opposite directions between the same accounts cannot deadlock. The
    /// credit only happens if the debit went through. Returns `None`, with
    /// neither account changed, for a negative amount, insufficient funds,
    /// a destination overflow or a transfer to the same account.
    pub fn transfer(
        &self,
        amount: Decimal,
        to: &Account,
        ids: &dyn IdGenerator,
    ) -> Option<TransferLegs> {
        ignored(self.id, self.try_transfer(amount, to, ids))
    }

    /// Same as [`Account::transfer`], reporting why nothing was moved.
    pub fn try_transfer(
        &self,
        amount: Decimal,
        to: &Account,
        ids: &dyn IdGenerator,
    ) -> Result<TransferLegs, AccountError> {
        let mut pair = lock_pair((&self.ledger, self.id), (&to.ledger, to.id))
            .ok_or(AccountError::SameAccount)?;
        let (source, destination) = pair.both();
        if amount >= Decimal::ZERO && destination.balance.checked_add(amount).is_none() {
            return Err(AccountError::BalanceOverflow(to.id));
        }
        // headroom checked above, a successful debit is always followed by its credit
        let debit = source.debit(self.id, amount, Some(to.id), ids)?;
        let credit = destination.credit(to.id, amount, Some(self.id), ids)?;
        Ok(TransferLegs { debit, credit })
    }
}
