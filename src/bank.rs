use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    account::{Account, AccountError, AccountType, AccountTypeError},
    id::{AccountId, CustomerId, TransactionId},
    store::{BankStore, in_memory_store::InMemoryBankStore},
    transaction::{Transaction, TransactionKind},
};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Customer {0} not found")]
    CustomerNotFound(CustomerId),
    #[error("Insufficient funds in account {account_id}: balance is {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountId),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    AccountType(#[from] AccountTypeError),
    #[error(transparent)]
    Rejected(#[from] AccountError),
}

#[derive(Debug, Clone)]
pub struct OpenAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub account_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenedAccount {
    pub account_id: AccountId,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: Decimal,
}

/// Outcome of a deposit or withdrawal. `transaction_id` is empty when the
/// account ignored the request (negative amount).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub transaction_id: Option<TransactionId>,
    pub balance: AccountBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub debit: Option<TransactionId>,
    pub credit: Option<TransactionId>,
    pub from: AccountBalance,
    pub to: AccountBalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    pub id: TransactionId,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionView {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id(),
            from_account: txn.from(),
            to_account: txn.to(),
            amount: txn.amount(),
            kind: txn.kind(),
            created_at: txn.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDetails {
    pub account_id: AccountId,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

/// Entry point for callers outside the crate. Resolves ids through the
/// store, turns missing records and insufficient funds into [`BankError`]s
/// and delegates the money movement to [`Account`].
pub struct Bank<S> {
    store: S,
}

impl Bank<InMemoryBankStore> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryBankStore::default())
    }
}

impl<S> Bank<S>
where
    S: BankStore,
{
    /// Transaction ids come from the store's generator, so they never
    /// collide with account or customer ids.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn find_account(&self, id: AccountId) -> Result<Arc<Account>, BankError> {
        self.store.account(id).ok_or(BankError::AccountNotFound(id))
    }

    fn opened(account: &Account) -> OpenedAccount {
        info!(
            account_id = account.id(),
            customer_id = account.customer().id(),
            account_type = %account.account_type(),
            "Opened account"
        );
        OpenedAccount {
            account_id: account.id(),
            customer_id: account.customer().id(),
            account_type: account.account_type(),
            balance: account.balance(),
            created_at: account.created_at(),
        }
    }

    /// Opens an account for a new customer.
    pub fn open_account(&self, request: OpenAccountRequest) -> Result<OpenedAccount, BankError> {
        let first_name = request.first_name.trim();
        let last_name = request.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(BankError::InvalidArgument(
                "customer first and last name are required".to_string(),
            ));
        }
        let account_type: AccountType = request.account_type.parse()?;
        let customer = self
            .store
            .create_customer(first_name, last_name, request.date_of_birth);
        let account = self
            .store
            .create_account(customer.id(), account_type)
            .ok_or(BankError::CustomerNotFound(customer.id()))?;
        Ok(Self::opened(&account))
    }

    /// Opens another account for an existing customer.
    pub fn open_account_for_customer(
        &self,
        customer_id: CustomerId,
        account_type: &str,
    ) -> Result<OpenedAccount, BankError> {
        let account_type: AccountType = account_type.parse()?;
        let account = self
            .store
            .create_account(customer_id, account_type)
            .ok_or(BankError::CustomerNotFound(customer_id))?;
        Ok(Self::opened(&account))
    }

    pub fn balance(&self, account_id: AccountId) -> Result<AccountBalance, BankError> {
        let account = self.find_account(account_id)?;
        Ok(AccountBalance {
            account_id,
            balance: account.balance(),
        })
    }

    pub fn account(&self, account_id: AccountId) -> Result<AccountDetails, BankError> {
        let account = self.find_account(account_id)?;
        let customer = account.customer();
        Ok(AccountDetails {
            account_id,
            account_type: account.account_type(),
            balance: account.balance(),
            created_at: account.created_at(),
            customer_id: customer.id(),
            first_name: customer.first_name(),
            last_name: customer.last_name(),
            date_of_birth: customer.date_of_birth(),
        })
    }

    pub fn deposit(&self, account_id: AccountId, amount: Decimal) -> Result<Posting, BankError> {
        let account = self.find_account(account_id)?;
        let transaction_id =
            settle(account_id, account.try_deposit(amount, None, self.store.ids()))?;
        debug!(account_id, %amount, ?transaction_id, "Deposit");
        Ok(Posting {
            transaction_id,
            balance: AccountBalance {
                account_id,
                balance: account.balance(),
            },
        })
    }

    pub fn withdraw(&self, account_id: AccountId, amount: Decimal) -> Result<Posting, BankError> {
        let account = self.find_account(account_id)?;
        ensure_funds(&account, amount)?;
        // the account decides under its lock; a caller that drained it after
        // the check above surfaces here as insufficient funds
        let transaction_id =
            settle(account_id, account.try_withdraw(amount, None, self.store.ids()))?;
        debug!(account_id, %amount, ?transaction_id, "Withdrawal");
        Ok(Posting {
            transaction_id,
            balance: AccountBalance {
                account_id,
                balance: account.balance(),
            },
        })
    }

    pub fn transfer(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, BankError> {
        if from_id == to_id {
            return Err(BankError::InvalidArgument(format!(
                "cannot transfer from account {from_id} to itself"
            )));
        }
        let from = self.find_account(from_id)?;
        let to = self.find_account(to_id)?;
        ensure_funds(&from, amount)?;
        let legs = settle(from_id, from.try_transfer(amount, &to, self.store.ids()))?;
        debug!(from_id, to_id, %amount, ?legs, "Transfer");
        Ok(TransferReceipt {
            debit: legs.map(|legs| legs.debit),
            credit: legs.map(|legs| legs.credit),
            from: AccountBalance {
                account_id: from_id,
                balance: from.balance(),
            },
            to: AccountBalance {
                account_id: to_id,
                balance: to.balance(),
            },
        })
    }

    pub fn transactions(&self, account_id: AccountId) -> Result<Vec<TransactionView>, BankError> {
        let account = self.find_account(account_id)?;
        Ok(account
            .transactions()
            .iter()
            .map(TransactionView::from)
            .collect())
    }
}

/// Maps an account-level outcome. Only a negative amount stays a silent
/// no-op, every other refusal becomes a typed failure.
fn settle<T>(
    account_id: AccountId,
    result: Result<T, AccountError>,
) -> Result<Option<T>, BankError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AccountError::NegativeAmount(amount)) => {
            debug!(account_id, %amount, "Ignoring negative amount");
            Ok(None)
        }
        Err(AccountError::InsufficientFunds { balance, requested }) => {
            Err(BankError::InsufficientFunds {
                account_id,
                balance,
                requested,
            })
        }
        Err(AccountError::BalanceOverflow(id)) => Err(BankError::BalanceOverflow(id)),
        Err(AccountError::SameAccount) => Err(BankError::InvalidArgument(format!(
            "cannot transfer from account {account_id} to itself"
        ))),
        Err(err) => Err(err.into()),
    }
}

fn ensure_funds(account: &Account, amount: Decimal) -> Result<(), BankError> {
    let balance = account.balance();
    if balance < amount {
        return Err(BankError::InsufficientFunds {
            account_id: account.id(),
            balance,
            requested: amount,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(account_type: &str) -> OpenAccountRequest {
        OpenAccountRequest {
            first_name: "Florin".to_string(),
            last_name: "Adochiei".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1977, 4, 4).unwrap(),
            account_type: account_type.to_string(),
        }
    }

    fn open(bank: &Bank<InMemoryBankStore>) -> AccountId {
        bank.open_account(request("DEPOSIT")).unwrap().account_id
    }

    #[test]
    fn open_account() {
        let bank = Bank::in_memory();
        let opened = bank.open_account(request("DEPOSIT")).unwrap();
        assert_eq!(opened.balance, Decimal::ZERO);
        assert_eq!(opened.account_type, AccountType::Deposit);
        assert_ne!(opened.account_id, opened.customer_id);

        let second = bank
            .open_account_for_customer(opened.customer_id, "savings")
            .unwrap();
        assert_eq!(second.customer_id, opened.customer_id);
        assert_eq!(second.account_type, AccountType::Savings);
        assert_eq!(bank.store().account_count(), 2);
        assert_eq!(bank.store().customer_count(), 1);

        let details = bank.account(second.account_id).unwrap();
        assert_eq!(details.first_name, "Florin");
        assert_eq!(details.last_name, "Adochiei");
        assert_eq!(details.account_type, AccountType::Savings);
    }

    #[test]
    fn open_account_errors() {
        let bank = Bank::in_memory();
        let err = bank.open_account_for_customer(77, "DEPOSIT").unwrap_err();
        assert!(matches!(err, BankError::CustomerNotFound(77)));

        let err = bank.open_account(request("CHEQUE")).unwrap_err();
        assert!(matches!(err, BankError::AccountType(_)));
        assert_eq!(err.to_string(), "Unknown account type `CHEQUE`");

        let err = bank
            .open_account(OpenAccountRequest {
                first_name: "  ".to_string(),
                ..request("DEPOSIT")
            })
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidArgument(_)));
        assert_eq!(bank.store().account_count(), 0);
    }

    #[test]
    fn deposit() {
        let bank = Bank::in_memory();
        let id = open(&bank);
        bank.deposit(id, Decimal::from(1500)).unwrap();
        bank.deposit(id, Decimal::from(200)).unwrap();
        let posting = bank.deposit(id, Decimal::from(300)).unwrap();
        assert!(posting.transaction_id.is_some());
        assert_eq!(posting.balance.account_id, id);
        assert_eq!(posting.balance.balance, Decimal::from(2000));

        let txns = bank.transactions(id).unwrap();
        assert_eq!(txns.len(), 3);
        assert!(txns.iter().all(|t| t.kind == TransactionKind::Credit));
    }

    #[test]
    fn negative_deposit_is_ignored() {
        let bank = Bank::in_memory();
        let id = open(&bank);
        let posting = bank.deposit(id, Decimal::from(-5)).unwrap();
        assert_eq!(posting.transaction_id, None);
        assert_eq!(posting.balance.balance, Decimal::ZERO);
        assert!(bank.transactions(id).unwrap().is_empty());
    }

    #[test]
    fn unknown_accounts() {
        let bank = Bank::in_memory();
        let id = open(&bank);
        assert!(matches!(
            bank.deposit(999, Decimal::ONE).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
        assert!(matches!(
            bank.withdraw(999, Decimal::ONE).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
        assert!(matches!(
            bank.transfer(id, 999, Decimal::ONE).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
        assert!(matches!(
            bank.transfer(999, id, Decimal::ONE).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
        assert!(matches!(
            bank.transactions(999).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
        assert!(matches!(
            bank.balance(999).unwrap_err(),
            BankError::AccountNotFound(999)
        ));
    }

    #[test]
    fn withdraw() {
        let bank = Bank::in_memory();
        let id = open(&bank);

        let err = bank.withdraw(id, Decimal::from(200)).unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(
            err.to_string(),
            format!("Insufficient funds in account {id}: balance is 0, requested 200")
        );
        assert_eq!(bank.balance(id).unwrap().balance, Decimal::ZERO);

        bank.deposit(id, Decimal::from(1500)).unwrap();
        let posting = bank.withdraw(id, Decimal::from(500)).unwrap();
        assert!(posting.transaction_id.is_some());
        assert_eq!(posting.balance.balance, Decimal::from(1000));
    }

    #[test]
    fn transfer() {
        let bank = Bank::in_memory();
        let from = open(&bank);
        let to = open(&bank);
        bank.deposit(from, Decimal::from(1500)).unwrap();

        let receipt = bank.transfer(from, to, Decimal::from(500)).unwrap();
        assert_eq!(receipt.from.account_id, from);
        assert_eq!(receipt.to.account_id, to);
        assert_eq!(receipt.from.balance, Decimal::from(1000));
        assert_eq!(receipt.to.balance, Decimal::from(500));
        assert_eq!(bank.balance(from).unwrap().balance, Decimal::from(1000));

        let debit = bank.transactions(from).unwrap().pop().unwrap();
        assert_eq!(Some(debit.id), receipt.debit);
        assert_eq!(debit.kind, TransactionKind::Debit);
        assert_eq!(debit.from_account, Some(from));
        assert_eq!(debit.to_account, Some(to));

        let credits = bank.transactions(to).unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(Some(credits[0].id), receipt.credit);
        assert_eq!(credits[0].kind, TransactionKind::Credit);
        assert_eq!(credits[0].from_account, Some(from));
        assert_eq!(credits[0].to_account, Some(to));
    }

    #[test]
    fn transfer_errors() {
        let bank = Bank::in_memory();
        let from = open(&bank);
        let to = open(&bank);
        bank.deposit(from, Decimal::from(100)).unwrap();

        let err = bank.transfer(from, to, Decimal::from(101)).unwrap_err();
        assert!(matches!(
            err,
            BankError::InsufficientFunds { account_id, .. } if account_id == from
        ));
        let err = bank.transfer(from, from, Decimal::ONE).unwrap_err();
        assert!(matches!(err, BankError::InvalidArgument(_)));

        assert_eq!(bank.balance(from).unwrap().balance, Decimal::from(100));
        assert_eq!(bank.transactions(from).unwrap().len(), 1);
        assert!(bank.transactions(to).unwrap().is_empty());
    }

    #[test]
    fn transaction_views() {
        let bank = Bank::in_memory();
        let source = open(&bank);
        let destination = open(&bank);
        bank.deposit(source, Decimal::from(1500)).unwrap();
        bank.withdraw(source, Decimal::from(200)).unwrap();
        bank.transfer(source, destination, Decimal::from(300)).unwrap();

        let txns = bank.transactions(source).unwrap();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].kind, TransactionKind::Credit);
        assert_eq!(txns[0].amount, Decimal::from(1500));
        assert_eq!(txns[0].to_account, Some(source));
        assert_eq!(txns[0].from_account, None);
        assert_eq!(txns[1].kind, TransactionKind::Debit);
        assert_eq!(txns[1].from_account, Some(source));
        assert_eq!(txns[1].to_account, None);
        assert_eq!(txns[2].to_account, Some(destination));
        assert!(txns.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn racing_withdrawals_never_overdraw() {
        let bank = Bank::in_memory();
        let id = open(&bank);
        bank.deposit(id, Decimal::from(100)).unwrap();

        let succeeded: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..50)
                            .filter(|_| bank.withdraw(id, Decimal::ONE).is_ok())
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(succeeded, 100);
        assert_eq!(bank.balance(id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn concurrent_transfers_conserve_total() {
        let bank = Bank::in_memory();
        let a = open(&bank);
        let b = open(&bank);
        bank.deposit(a, Decimal::from(50)).unwrap();
        bank.deposit(b, Decimal::from(50)).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        let _ = bank.transfer(a, b, Decimal::from(7));
                    }
                });
                s.spawn(|| {
                    for _ in 0..1_000 {
                        let _ = bank.transfer(b, a, Decimal::from(7));
                    }
                });
            }
        });

        let total = bank.balance(a).unwrap().balance + bank.balance(b).unwrap().balance;
        assert_eq!(total, Decimal::from(100));
    }

    #[test]
    fn refused_debit_is_never_reported_as_success() {
        // the account refused under its lock even though an earlier check passed
        let err = settle::<TransactionId>(
            7,
            Err(AccountError::InsufficientFunds {
                balance: Decimal::ZERO,
                requested: Decimal::ONE,
            }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BankError::InsufficientFunds { account_id: 7, balance, requested }
                if balance == Decimal::ZERO && requested == Decimal::ONE
        ));

        let ignored = settle::<TransactionId>(7, Err(AccountError::NegativeAmount(-Decimal::ONE)));
        assert_eq!(ignored.unwrap(), None);
        assert_eq!(settle(7, Ok(11u64)).unwrap(), Some(11));
        assert!(matches!(
            settle::<TransactionId>(7, Err(AccountError::BalanceOverflow(8))).unwrap_err(),
            BankError::BalanceOverflow(8)
        ));
    }

    #[test]
    fn destination_overflow_is_not_insufficient_funds() {
        let bank = Bank::in_memory();
        let from = open(&bank);
        let to = open(&bank);
        bank.deposit(from, Decimal::from(10)).unwrap();
        bank.deposit(to, Decimal::MAX).unwrap();

        let err = bank.transfer(from, to, Decimal::ONE).unwrap_err();
        assert!(matches!(err, BankError::BalanceOverflow(id) if id == to));
        let err = bank.deposit(to, Decimal::ONE).unwrap_err();
        assert!(matches!(err, BankError::BalanceOverflow(id) if id == to));

        assert_eq!(bank.balance(from).unwrap().balance, Decimal::from(10));
        assert_eq!(bank.transactions(to).unwrap().len(), 1);
    }

    #[test]
    fn transaction_ids_come_from_the_store_generator() {
        let bank = Bank::in_memory();
        let id = open(&bank);
        let customer_id = bank.account(id).unwrap().customer_id;
        let txn_id = bank.deposit(id, Decimal::ONE).unwrap().transaction_id.unwrap();
        assert!(txn_id > id && txn_id > customer_id);
        assert_eq!(bank.store().ids().next_id(), txn_id + 1);
    }
}
