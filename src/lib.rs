/// Identifier types and the injectable id source shared by all entities.
pub mod id;

/// Deadlock-free acquisition of two locks, ordered by a stable key.
pub mod lock_order;

/// Immutable ledger entries.
pub mod transaction;

/// Customer records, each field guarded on its own.
pub mod customer;

/// Accounts own their balance and history behind a single lock.
/// Transfers lock both accounts through [`lock_order`].
pub mod account;

/// Account/customer lookup interface, plus "in memory" implementation.
pub mod store;

/// Request-facing API: resolves ids, reports typed failures and
/// delegates money movement to [`account`].
pub mod bank;

/// Ideally, this module should exist on its own crate, as a way to
/// bootstrap the library from a binary. It lives here so integration
/// tests can drive it.
pub mod bin_utils;
