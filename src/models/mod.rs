//! Value types shared by the dispatch pipeline.
//!
//! - [`request`] - Request descriptors and their builder
//! - [`schema`] - Attribute schemas and the outbound payload filter
//! - [`query`] - Paging, filtering and sorting for list endpoints
//! - [`response`] - Decoded response bodies

pub mod request;
pub mod schema;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use request::*;
pub use schema::*;
pub use query::*;
pub use response::*;
