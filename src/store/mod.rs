use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    account::{Account, AccountType},
    customer::Customer,
    id::{AccountId, CustomerId, IdGenerator},
};

pub mod in_memory_store;

/// Lookup store for accounts and customers, keyed by id.
///
/// Implementations are shared between threads, so every method takes `&self`.
pub trait BankStore: Send + Sync {
    /// Generator behind every id the store hands out. Transactions recorded
    /// against its accounts draw from it as well.
    fn ids(&self) -> &dyn IdGenerator;

    fn create_customer(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> Arc<Customer>;

    /// Opens a new, empty account owned by a customer of this store.
    /// Returns `None` if the store does not know `customer_id`.
    fn create_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
    ) -> Option<Arc<Account>>;

    fn account(&self, id: AccountId) -> Option<Arc<Account>>;

    fn customer(&self, id: CustomerId) -> Option<Arc<Customer>>;

    fn account_count(&self) -> usize;

    fn customer_count(&self) -> usize;
}
