//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

/// Which identity provider vouched for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Firebase,
    Google,
}

/// The authenticated caller, attached to a request by the principal guard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub provider: Provider,
}
