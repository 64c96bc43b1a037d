//! HTTP client and dispatch pipeline.
//!
//! [`Client`] is the entry point. Every provider call goes through the same
//! steps: the body is filtered against the provider's schema, the request is
//! sent with credentials attached, throttled responses are retried after a
//! wait derived from the configured rate limit, and the body is decoded by
//! content type.
//!
//! # Example
//!
//! ```no_run
//! use ledgerlink::Client;
//!
//! # async fn example() -> ledgerlink::Result<()> {
//! let client = Client::from_env()?;
//!
//! let accounts = client.accounts();
//! let page = accounts.list(&accounts.query()?.filter("active")).await?;
//! println!("{} accounts", page.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod decode;
mod http;
mod paginated;
mod retry;

pub use config::{ClientConfig, Credentials, RateLimit, RetryConfig, CONFIG_PREFIX, DEFAULT_RATE_LIMIT};
pub use decode::{decode, xml_to_json};
pub use http::Client;
pub use paginated::{Page, PageInfo, PaginatedStream, MAX_PAGE_SIZE};
pub use retry::{Sleeper, TokioSleeper};
pub(crate) use http::ClientInner;
