use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::debug;

use crate::{
    account::{Account, AccountType},
    customer::Customer,
    id::{AccountId, CustomerId, IdGenerator, SequentialIdGenerator},
};

use super::BankStore;

/// Store backed by two concurrent maps.
///
/// Opening an account for a new customer writes the customer and then the
/// account as two separate inserts. A concurrent reader may briefly see a
/// new customer whose account is not visible yet; no account is ever
/// visible without its customer, because accounts can only be created for
/// customers already stored.
pub struct InMemoryBankStore {
    ids: Arc<dyn IdGenerator>,
    customers: DashMap<CustomerId, Arc<Customer>>,
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl InMemoryBankStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            customers: DashMap::new(),
            accounts: DashMap::new(),
        }
    }
}

impl Default for InMemoryBankStore {
    fn default() -> Self {
        Self::new(Arc::new(SequentialIdGenerator::default()))
    }
}

impl BankStore for InMemoryBankStore {
    fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    fn create_customer(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> Arc<Customer> {
        let customer = Arc::new(Customer::new(
            self.ids.next_id(),
            first_name,
            last_name,
            date_of_birth,
        ));
        self.customers.insert(customer.id(), customer.clone());
        customer
    }

    fn create_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
    ) -> Option<Arc<Account>> {
        let customer = self.customer(customer_id)?;
        let account = Arc::new(Account::new(self.ids.next_id(), customer, account_type));
        self.accounts.insert(account.id(), account.clone());
        debug!(account_id = account.id(), customer_id, %account_type, "Stored account");
        Some(account)
    }

    fn account(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| entry.value().clone())
    }

    fn customer(&self, id: CustomerId) -> Option<Arc<Customer>> {
        self.customers.get(&id).map(|entry| entry.value().clone())
    }

    fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn customer_count(&self) -> usize {
        self.customers.len()
    }
}
