use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::id::{AccountId, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => f.write_str("CREDIT"),
            TransactionKind::Debit => f.write_str("DEBIT"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction must reference a source or a destination account")]
    MissingAccount,
    #[error("Transaction amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
}

/// A single ledger movement. Never changes once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    amount: Decimal,
    kind: TransactionKind,
    from: Option<AccountId>,
    to: Option<AccountId>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        amount: Decimal,
        kind: TransactionKind,
        from: Option<AccountId>,
        to: Option<AccountId>,
    ) -> Result<Self, TransactionError> {
        if from.is_none() && to.is_none() {
            return Err(TransactionError::MissingAccount);
        }
        if amount < Decimal::ZERO {
            return Err(TransactionError::NegativeAmount(amount));
        }
        Ok(Self {
            id,
            amount,
            kind,
            from,
            to,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn from(&self) -> Option<AccountId> {
        self.from
    }

    pub fn to(&self) -> Option<AccountId> {
        self.to
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Effect of this transaction on the owning account's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Credit => self.amount,
            TransactionKind::Debit => -self.amount,
        }
    }
}
