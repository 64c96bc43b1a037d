//! # ledgerlink
//!
//! An async Rust client for an accounting REST API that wraps every entity
//! body in a named envelope (`{"PriceList": {...}}`).
//!
//! All providers share one dispatch pipeline:
//!
//! - **Schema filtering**: outbound bodies are reduced to the provider's
//!   writeable fields and checked for required ones before anything is sent
//! - **Rate limiting**: `429 Too Many Requests` responses are retried with a
//!   backoff derived from the configured requests-per-second limit
//! - **Decoding**: JSON, XML and binary responses are told apart by content
//!   type; XML is converted into the same tree JSON would produce
//! - **Errors**: both casings of the remote error envelope are normalised
//!   into one [`RemoteError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledgerlink::{Client, ClientConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> ledgerlink::Result<()> {
//!     let config = ClientConfig::new("https://api.example.com/3/")?
//!         .with_access_token("access-token")
//!         .with_client_secret("client-secret");
//!     let client = Client::new(config)?;
//!
//!     // Create a price list; unknown fields are dropped before sending
//!     client
//!         .price_lists()
//!         .create(json!({"Code": "B", "Description": "Wholesale", "Extra": 1}))
//!         .await?;
//!
//!     // Walk every contract accrual, page by page
//!     let accruals = client.contract_accruals();
//!     let all = accruals.list(&accruals.query()?.unlimited()).await?;
//!     println!("Found {} accruals", all.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! [`ClientConfig::from_env`] reads `LEDGERLINK_BASE_URL`,
//! `LEDGERLINK_ACCESS_TOKEN`, `LEDGERLINK_CLIENT_SECRET`,
//! `LEDGERLINK_RATE_LIMIT` and `LEDGERLINK_TIMEOUT_SECS`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod client;
pub mod error;
pub mod models;

// Re-export primary types at crate root for convenience
pub use error::{Error, RemoteError, Result};
pub use client::{Client, ClientConfig, RateLimit, RetryConfig};
pub use models::{AttributeSchema, Decoded, Method, QueryOptions, Request, SortOrder};

/// Prelude module for convenient imports.
///
/// ```rust
/// use ledgerlink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{ArchiveService, ResourceDefinition, ResourceService};
    pub use crate::client::{
        Client, ClientConfig, Page, PageInfo, PaginatedStream, RateLimit, RetryConfig, Sleeper,
    };
    pub use crate::error::{Error, RemoteError, Result};
    pub use crate::models::{
        AttributeSchema, Decoded, Limit, Method, QueryOptions, Request, RequestBuilder, SortOrder,
        Timespan,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers_declare_valid_schemas() {
        for definition in [&api::PRICE_LISTS, &api::CONTRACT_ACCRUALS, &api::ACCOUNTS] {
            let schema = definition.schema().unwrap();
            for field in definition.required_create() {
                assert!(schema.is_writeable(field), "{} requires {}", definition.path(), field);
            }
        }
    }

    #[test]
    fn test_client_exposes_providers() {
        let client = Client::new(ClientConfig::new("https://api.example.com/3/").unwrap()).unwrap();
        assert_eq!(client.price_lists().definition().wrapper_key(), "PriceList");
        assert_eq!(client.contract_accruals().definition().list_key(), "ContractAccruals");
        assert_eq!(client.accounts().definition().path(), "accounts");
    }
}
