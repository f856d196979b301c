//! aiqx-catalog: remote pack catalog.
//!
//! Lists and fetches assessment packs from a GitHub repository, caches the
//! listing in the workspace store, and imports many packs concurrently.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod import;
pub mod mock;

pub use cache::{list_cached, Listing, ListingCache};
pub use config::{load_config, load_config_from, AiqxConfig, CatalogConfig};
pub use error::FetchError;
pub use github::GitHubSource;
pub use import::{apply_imports, download, fetch_packs, FetchOptions, ImportReport, ImportStatus};
