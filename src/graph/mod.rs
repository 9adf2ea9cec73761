//! Authenticated Microsoft Graph access.
//!
//! The wrapper in [`client`] is the core state machine: look up the stored
//! grant, attempt the call with the stored access token, and on any failure
//! refresh the tokens and retry exactly once. Typed operations for the
//! Graph endpoints the application uses are thin layers over that wrapper.

mod client;

pub use client::GraphClient;

use serde::{Deserialize, Serialize};

/// Microsoft Graph v1.0 base URL
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Subset of the Graph user profile returned by `/me`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountInfo {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: Option<String>,
}

/// One OneDrive item as returned by the drive listing endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "webUrl")]
    pub web_url: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified: Option<String>,
}

/// Graph collection envelope for drive listings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriveItemList {
    pub value: Vec<DriveItem>,
}
