//! Mock pack source for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use aiqx_core::traits::{CatalogEntry, PackSource};

use crate::error::FetchError;

/// An in-memory catalog for exercising listing, caching and imports
/// without network access.
///
/// Documents are listed in insertion order. Failures can be queued per path
/// and are returned before the document is served.
#[derive(Default)]
pub struct MockSource {
    documents: Vec<(String, Value)>,
    failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    list_failure: Option<FetchError>,
    /// Artificial latency per fetch.
    delay: Option<Duration>,
    list_count: AtomicU32,
    fetch_count: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: &str, doc: Value) -> Self {
        self.documents.push((path.to_string(), doc));
        self
    }

    /// Fail the next fetch of `path` with `error`. Repeated calls queue
    /// further failures.
    pub fn with_failure(self, path: &str, error: FetchError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push_back(error);
        self
    }

    pub fn with_list_failure(mut self, error: FetchError) -> Self {
        self.list_failure = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn list_count(&self) -> u32 {
        self.list_count.load(Ordering::Relaxed)
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_failure(&self, path: &str) -> Option<FetchError> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(path)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl PackSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        self.list_count.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = &self.list_failure {
            return Err(err.clone().into());
        }
        Ok(self
            .documents
            .iter()
            .map(|(path, _)| CatalogEntry::new(path.as_str()))
            .collect())
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<Value> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.next_failure(path) {
            return Err(err.into());
        }
        self.documents
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| FetchError::NotFound(path.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn serves_documents_in_order() {
        let source = MockSource::new()
            .with_document("Test-Packs/b.json", json!({"id": "b"}))
            .with_document("Test-Packs/Community-Packs/a.json", json!({"id": "a"}));

        let entries = source.list().await.unwrap();
        assert_eq!(entries[0].path, "Test-Packs/b.json");
        assert!(entries[1].community);

        assert_eq!(source.fetch("Test-Packs/b.json").await.unwrap()["id"], "b");
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn queued_failures_come_first() {
        let source = MockSource::new()
            .with_document("p.json", json!({}))
            .with_failure("p.json", FetchError::Timeout(1));

        let err = source.fetch("p.json").await.unwrap_err();
        assert!(matches!(err.downcast_ref(), Some(FetchError::Timeout(1))));
        assert!(source.fetch("p.json").await.is_ok());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let source = MockSource::new();
        let err = source.fetch("nope.json").await.unwrap_err();
        assert!(FetchError::is_permanent_error(&err));
    }
}
