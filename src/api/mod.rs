//! Resource providers.
//!
//! Each provider is a static [`ResourceDefinition`] naming the endpoint,
//! its body wrapper and its field sets. [`ResourceService`] turns any
//! definition into CRUD calls over the shared dispatch pipeline; the
//! archive has its own service since it moves files rather than JSON.

mod accounts;
mod archive;
mod contract_accruals;
mod price_lists;
mod resource;

pub use accounts::ACCOUNTS;
pub use archive::ArchiveService;
pub use contract_accruals::CONTRACT_ACCRUALS;
pub use price_lists::PRICE_LISTS;
pub use resource::{ResourceDefinition, ResourceService};
