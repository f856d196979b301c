//! Trait seam for remote pack catalogs.
//!
//! Implemented by the `aiqx-catalog` crate. The core only cares whether a
//! listing or a document could be fetched, never how.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pack::{normalize_pack, Pack};

/// A remote source of pack documents.
#[async_trait]
pub trait PackSource: Send + Sync {
    /// Human-readable source name (e.g. "github").
    fn name(&self) -> &str;

    /// Every pack document the source offers.
    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>>;

    /// Fetch one document by its catalog path. The result is not yet
    /// validated.
    async fn fetch(&self, path: &str) -> anyhow::Result<Value>;

    /// Fetch a document and run it through pack validation.
    async fn fetch_pack(&self, path: &str) -> anyhow::Result<Pack> {
        let raw = self.fetch(path).await?;
        Ok(normalize_pack(raw)?)
    }
}

/// One listed pack document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Path inside the catalog, used as the fetch identifier.
    pub path: String,
    /// Contributed by the community rather than the maintainers.
    #[serde(default)]
    pub community: bool,
    /// Blob size in bytes, when the listing reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl CatalogEntry {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            community: path.contains(COMMUNITY_DIR),
            path,
            size: None,
        }
    }

    /// The path with the catalog directories stripped, for display.
    pub fn display_name(&self) -> String {
        self.path
            .replacen(PACKS_DIR, "", 1)
            .replacen(COMMUNITY_DIR, "", 1)
    }

    /// Last path segment, used when saving the document locally.
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Top-level catalog directory.
pub const PACKS_DIR: &str = "Test-Packs/";
/// Sub-directory holding community-contributed packs.
pub const COMMUNITY_DIR: &str = "Community-Packs/";

/// Last `/`-separated segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
