//! Identity store backed by a remote account admin API.
//!
//! - `GET   {base_url}/accounts/{id}` → `AccountRecord` (404 = unknown)
//! - `PATCH {base_url}/accounts/{id}` with an `AccountUpdate` body

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use url::Url;

use crate::identity::store::{AccountRecord, AccountUpdate, IdentityError, IdentityStore};

#[derive(Debug, Clone)]
pub struct HttpIdentityStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base_url}/accounts/{id}` with `id` as one percent-encoded segment.
    fn account_url(&self, id: &str) -> Result<Url, IdentityError> {
        if matches!(id, "" | "." | "..") {
            return Err(IdentityError::Rejected(format!("invalid account id `{}`", id)));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| IdentityError::Unavailable(format!("bad base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| IdentityError::Unavailable("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .push("accounts")
            .push(id);
        Ok(url)
    }
}

impl IdentityStore for HttpIdentityStore {
    fn get_account<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<AccountRecord>, IdentityError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.account_url(id)?)
                .send()
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => response
                    .json::<AccountRecord>()
                    .await
                    .map(Some)
                    .map_err(|e| IdentityError::Unavailable(e.to_string())),
                status => Err(IdentityError::Unavailable(format!("status {}", status))),
            }
        })
    }

    fn update_account<'a>(
        &'a self,
        id: &'a str,
        update: AccountUpdate,
    ) -> BoxFuture<'a, Result<(), IdentityError>> {
        Box::pin(async move {
            let response = self
                .client
                .patch(self.account_url(id)?)
                .json(&update)
                .send()
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => Err(IdentityError::NotFound(id.to_string())),
                status if status.is_success() => Ok(()),
                status if status.is_client_error() => {
                    Err(IdentityError::Rejected(format!("status {}", status)))
                }
                status => Err(IdentityError::Unavailable(format!("status {}", status))),
            }
        })
    }
}
