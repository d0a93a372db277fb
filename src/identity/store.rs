//! Identity store abstraction and the in-memory implementation.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// An account as held by the identity system.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Partial write; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl AccountUpdate {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            disabled: None,
        }
    }

    pub fn disabled(disabled: bool) -> Self {
        Self {
            email: None,
            disabled: Some(disabled),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("account {0} not found")]
    NotFound(String),
    #[error("identity system unavailable: {0}")]
    Unavailable(String),
    #[error("identity system rejected the update: {0}")]
    Rejected(String),
}

/// Read/write access to the identity system, keyed by principal id.
pub trait IdentityStore: Send + Sync {
    /// Current account, or `None` when the id is unknown.
    fn get_account<'a>(&'a self, id: &'a str)
        -> BoxFuture<'a, Result<Option<AccountRecord>, IdentityError>>;

    /// Apply a partial update.
    fn update_account<'a>(
        &'a self,
        id: &'a str,
        update: AccountUpdate,
    ) -> BoxFuture<'a, Result<(), IdentityError>>;
}

/// Process-local accounts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    accounts: Arc<DashMap<String, AccountRecord>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing accounts.
    pub fn with_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = AccountRecord>,
    {
        let store = Self::new();
        for account in accounts {
            store.accounts.insert(account.id.clone(), account);
        }
        store
    }

    pub fn account(&self, id: &str) -> Option<AccountRecord> {
        self.accounts.get(id).map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.accounts.len()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn get_account<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<AccountRecord>, IdentityError>> {
        let account = self.account(id);
        Box::pin(async move { Ok(account) })
    }

    fn update_account<'a>(
        &'a self,
        id: &'a str,
        update: AccountUpdate,
    ) -> BoxFuture<'a, Result<(), IdentityError>> {
        let result = match self.accounts.get_mut(id) {
            Some(mut account) => {
                if let Some(email) = update.email {
                    account.email = Some(email);
                }
                if let Some(disabled) = update.disabled {
                    account.disabled = disabled;
                }
                Ok(())
            }
            None => Err(IdentityError::NotFound(id.to_string())),
        };
        Box::pin(async move { result })
    }
}
