//! Audit store seam and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use thiserror::Error;
use uuid::Uuid;

use crate::query::{AuditFilter, Page, PageRequest};
use crate::record::AuditRecord;

/// Audit persistence error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditStoreError {
    /// A record with this event id already exists. The expected signal under
    /// at-least-once delivery; consumers treat it as a successful no-op.
    #[error("duplicate event id: {0}")]
    DuplicateEventId(Uuid),

    /// Some other integrity constraint was violated. Retrying cannot fix it.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The store could not be reached. Retryable.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only record store with a filtered, paginated read side.
pub trait AuditStore: Send + Sync {
    /// Insert a record keyed by its event id.
    ///
    /// Must fail with `DuplicateEventId` when the id is already present —
    /// dedup is structural, not advisory.
    fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError>;

    /// Read records matching `filter`, sorted by event time ascending.
    fn query(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditStoreError>;
}

impl<S> AuditStore for std::sync::Arc<S>
where
    S: AuditStore + ?Sized,
{
    fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        (**self).insert(record)
    }

    fn query(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditStoreError> {
        (**self).query(filter, page)
    }
}

impl<S> AuditStore for &S
where
    S: AuditStore + ?Sized,
{
    fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        (**self).insert(record)
    }

    fn query(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditStoreError> {
        (**self).query(filter, page)
    }
}

/// In-memory audit store for tests/dev.
///
/// Mirrors the constraints of the real store: primary key on event id,
/// append-only. The outage toggle and attempt counter exist so retry
/// behavior can be observed from tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<HashMap<Uuid, AuditRecord>>,
    unavailable: AtomicBool,
    insert_attempts: AtomicU32,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage for subsequent inserts.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Total insert attempts, including failed ones.
    pub fn insert_attempts(&self) -> u32 {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("audit lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, event_id: Uuid) -> Option<AuditRecord> {
        self.records
            .read()
            .expect("audit lock poisoned")
            .get(&event_id)
            .cloned()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuditStoreError::Unavailable("injected outage".into()));
        }
        if record.entity_name.is_empty() || record.action.is_empty() {
            return Err(AuditStoreError::Integrity(
                "entity_name and action must not be empty".into(),
            ));
        }

        let mut records = self.records.write().expect("audit lock poisoned");
        if records.contains_key(&record.event_id) {
            return Err(AuditStoreError::DuplicateEventId(record.event_id));
        }
        records.insert(record.event_id, record);
        Ok(())
    }

    fn query(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditStoreError> {
        let records = self.records.read().expect("audit lock poisoned");

        let mut matched: Vec<AuditRecord> = records
            .values()
            .filter(|r| filter.matches(&r.action, &r.entity_name))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.event_time);

        let total_elements = matched.len();
        let items = matched
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();

        Ok(Page {
            items,
            page: page.page,
            size: page.size,
            total_elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn record(action: &str, entity: &str, offset_secs: i64) -> AuditRecord {
        AuditRecord {
            event_id: Uuid::now_v7(),
            event_time: Utc::now() + Duration::seconds(offset_secs),
            actor_id: None,
            entity_name: entity.to_string(),
            entity_id: None,
            action: action.to_string(),
            message: None,
            source_service: "corehr-service".to_string(),
            correlation_id: None,
            payload: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_event_id_is_rejected_with_its_own_variant() {
        let store = InMemoryAuditStore::new();
        let rec = record("CREATE", "EMPLOYEE", 0);
        store.insert(rec.clone()).unwrap();

        assert_eq!(
            store.insert(rec.clone()).unwrap_err(),
            AuditStoreError::DuplicateEventId(rec.event_id)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn query_filters_and_sorts_by_event_time_ascending() {
        let store = InMemoryAuditStore::new();
        store.insert(record("TERMINATE", "EMPLOYEE", 30)).unwrap();
        store.insert(record("CREATE", "EMPLOYEE", 10)).unwrap();
        store.insert(record("CREATE", "DEPARTMENT", 20)).unwrap();

        let page = store
            .query(&AuditFilter::search("create"), &PageRequest::default())
            .unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.items[0].entity_name, "EMPLOYEE");
        assert_eq!(page.items[1].entity_name, "DEPARTMENT");
    }

    #[test]
    fn query_paginates() {
        let store = InMemoryAuditStore::new();
        for i in 0..25 {
            store.insert(record("CREATE", "EMPLOYEE", i)).unwrap();
        }

        let first = store
            .query(&AuditFilter::default(), &PageRequest::default())
            .unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.total_pages(), 2);

        let second = store
            .query(&AuditFilter::default(), &PageRequest::new(1, 20))
            .unwrap();
        assert_eq!(second.items.len(), 5);
    }
}
