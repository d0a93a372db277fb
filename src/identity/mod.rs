//! Identity system collaborator.
//!
//! The identity system is authoritative for account state the gateway mutates
//! as a pre-action (email, lock status). Two implementations:
//! - `store.rs`: trait plus a `DashMap`-backed in-memory store
//! - `http.rs`: remote account admin API over `reqwest`

pub mod http;
pub mod store;

pub use http::HttpIdentityStore;
pub use store::{AccountRecord, AccountUpdate, IdentityError, IdentityStore, InMemoryIdentityStore};
