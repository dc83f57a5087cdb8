use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;

use crate::id::CustomerId;

/// A bank customer. Every attribute is guarded on its own, so updates to
/// different fields are not atomic with respect to each other.
#[derive(Debug)]
pub struct Customer {
    id: CustomerId,
    first_name: RwLock<String>,
    last_name: RwLock<String>,
    date_of_birth: RwLock<NaiveDate>,
}

fn read<T: Clone>(field: &RwLock<T>) -> T {
    field.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write<T>(field: &RwLock<T>, value: T) {
    *field.write().unwrap_or_else(PoisonError::into_inner) = value;
}

impl Customer {
    pub fn new(
        id: CustomerId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            id,
            first_name: RwLock::new(first_name.into()),
            last_name: RwLock::new(last_name.into()),
            date_of_birth: RwLock::new(date_of_birth),
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn first_name(&self) -> String {
        read(&self.first_name)
    }

    pub fn last_name(&self) -> String {
        read(&self.last_name)
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        read(&self.date_of_birth)
    }

    pub fn set_first_name(&self, first_name: impl Into<String>) {
        write(&self.first_name, first_name.into());
    }

    pub fn set_last_name(&self, last_name: impl Into<String>) {
        write(&self.last_name, last_name.into());
    }

    pub fn set_date_of_birth(&self, date_of_birth: NaiveDate) {
        write(&self.date_of_birth, date_of_birth);
    }
}
