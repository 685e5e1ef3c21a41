//! Stratum Dimension-Index Resolver
//!
//! Translates a property id into the `(index_id, dimension_count)` pair that
//! addresses its shard. Resolution is memoized in an injected process-global
//! cache with no expiry and no invalidation: the dimension width of a
//! property is fixed at creation, so the memo is a cache of an immutable
//! fact. Concurrent first lookups for the same id may both issue the catalog
//! query; both resolve to the same stable value.
//!
//! Deleting and recreating a property id with a different width within one
//! process lifetime is unsupported.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use stratum_common::{IndexId, PropertyId, Result, StratumError};

use crate::backend::{RelationalBackend, Statement};

// =============================================================================
// Index Entry
// =============================================================================

/// Resolved shard address for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub index_id: IndexId,
    pub num_dimensions: usize,
}

// =============================================================================
// Cache
// =============================================================================

/// Explicit, injectable memo of resolved entries. Shared by every caller in
/// the process; `reset` exists for tests.
#[derive(Default)]
pub struct DimensionIndexCache {
    entries: RwLock<HashMap<PropertyId, IndexEntry>>,
}

impl DimensionIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property_id: &PropertyId) -> Option<IndexEntry> {
        self.entries.read().get(property_id).copied()
    }

    pub fn insert(&self, property_id: PropertyId, entry: IndexEntry) {
        self.entries.write().insert(property_id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every memoized entry.
    pub fn reset(&self) {
        self.entries.write().clear();
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Read-through resolver over the relational catalog.
pub struct DimensionIndexResolver {
    cache: Arc<DimensionIndexCache>,
    backend: Arc<dyn RelationalBackend>,
}

impl DimensionIndexResolver {
    pub fn new(cache: Arc<DimensionIndexCache>, backend: Arc<dyn RelationalBackend>) -> Self {
        Self { cache, backend }
    }

    /// Resolve a property id to its shard address. Fails with `NotFound`
    /// when the property has no catalog row or no dimensions.
    pub async fn resolve(&self, property_id: &PropertyId) -> Result<IndexEntry> {
        if let Some(entry) = self.cache.get(property_id) {
            return Ok(entry);
        }

        let rows = self
            .backend
            .execute(Statement::SelectIndex {
                property_id: property_id.clone(),
            })
            .await?
            .rows()?;

        if rows.len() != 1 {
            return Err(StratumError::NotFound(property_id.0.clone()));
        }

        let row = &rows[0];
        let index_id = row
            .first()
            .and_then(|v| v.as_timestamp())
            .ok_or_else(|| StratumError::Backend("malformed index row".to_string()))?;
        let num_dimensions = row
            .get(1)
            .and_then(|v| v.as_timestamp())
            .ok_or_else(|| StratumError::Backend("malformed index row".to_string()))?;

        let entry = IndexEntry {
            index_id: IndexId(index_id),
            num_dimensions: num_dimensions as usize,
        };
        debug!(property_id = %property_id, index_id = %entry.index_id, num_dimensions = entry.num_dimensions, "resolved dimension index");
        self.cache.insert(property_id.clone(), entry);
        Ok(entry)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ExecuteResult;
    use crate::memory::MemoryBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stratum_common::{Dimension, EntityId, Value};

    /// Counts catalog lookups so memoization is observable.
    struct CountingBackend {
        inner: MemoryBackend,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl RelationalBackend for CountingBackend {
        async fn execute(&self, statement: Statement) -> Result<ExecuteResult> {
            if matches!(statement, Statement::SelectIndex { .. }) {
                self.lookups.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.execute(statement).await
        }
    }

    async fn seed(backend: &dyn RelationalBackend, id: &str, dims: usize) -> IndexId {
        let index_id = backend
            .execute(Statement::InsertProperty {
                id: PropertyId::new(id),
                name: id.to_string(),
                description: String::new(),
                type_name: String::new(),
                entity_id: EntityId::new("thing-1"),
            })
            .await
            .expect("insert property")
            .last_insert_id()
            .expect("index id");
        backend
            .execute(Statement::InsertDimensions {
                index_id: IndexId(index_id),
                dimensions: (0..dims)
                    .map(|i| Dimension::new(format!("Value{}", i + 1), "", ""))
                    .collect(),
            })
            .await
            .expect("insert dimensions");
        IndexId(index_id)
    }

    #[tokio::test]
    async fn test_resolve_memoizes() {
        let backend = Arc::new(CountingBackend {
            inner: MemoryBackend::new(),
            lookups: AtomicUsize::new(0),
        });
        let expected = seed(backend.as_ref(), "p1", 3).await;

        let cache = Arc::new(DimensionIndexCache::new());
        let resolver = DimensionIndexResolver::new(cache.clone(), backend.clone());

        let first = resolver.resolve(&PropertyId::new("p1")).await.expect("resolves");
        assert_eq!(first.index_id, expected);
        assert_eq!(first.num_dimensions, 3);

        let second = resolver.resolve(&PropertyId::new("p1")).await.expect("resolves");
        assert_eq!(second, first);
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_property() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = DimensionIndexResolver::new(Arc::new(DimensionIndexCache::new()), backend);
        let err = resolver
            .resolve(&PropertyId::new("missing"))
            .await
            .expect_err("not found");
        assert!(matches!(err, StratumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reset_forces_relookup() {
        let backend = Arc::new(CountingBackend {
            inner: MemoryBackend::new(),
            lookups: AtomicUsize::new(0),
        });
        seed(backend.as_ref(), "p1", 1).await;

        let cache = Arc::new(DimensionIndexCache::new());
        let resolver = DimensionIndexResolver::new(cache.clone(), backend.clone());

        resolver.resolve(&PropertyId::new("p1")).await.expect("resolves");
        cache.reset();
        assert!(cache.is_empty());
        resolver.resolve(&PropertyId::new("p1")).await.expect("resolves");
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_value_helper_reads_integers() {
        // Guards the row decoding assumption used by the resolver.
        assert_eq!(Value::Integer(9).as_timestamp(), Some(9));
    }
}
