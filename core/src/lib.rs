//! Shared resource-access layer for the Exa Websets API.
//!
//! Every tool in the MCP runtime is a thin composition of the pieces in this
//! crate: route resolution, query composition, authenticated request
//! execution, response projection, batch mutation, and cursor pagination.

pub mod batch;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod page;
pub mod project;
pub mod query;
pub mod types;

pub use batch::{BatchCoordinator, BatchMutation, BatchOutcome, BatchProfile, BatchStrategy};
pub use client::{ClientConfig, WebsetsClient};
pub use error::CoreError;
pub use page::{Page, PageRequest};
pub use query::{ItemListFilters, Query};
pub use types::VerificationStatus;
