//! Stratum Relational Value Store
//!
//! Ingests and reads property value rows against the fixed relational
//! schema. Creation inserts the catalog row and one row per dimension;
//! ingestion classifies raw rows, backfills server timestamps, and routes
//! surviving rows to the shard selected by dimension count as a single
//! idempotent batch. Reads are point-in-time (no range) or an inclusive
//! ascending range.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use std::sync::Arc;
use tracing::{debug, info, warn};

use stratum_common::config::RelationalConfig;
use stratum_common::{
    utils, BatchPlan, Class, EntityId, IndexId, IngestionReport, Property, PropertyId, Result,
    StratumError,
};

use crate::backend::{kind_from_label, RelationalBackend, Row, Statement};
use crate::resolver::{DimensionIndexCache, DimensionIndexResolver};
use crate::shard::{Shard, ShardSet};

// =============================================================================
// Relational Value Store
// =============================================================================

pub struct RelationalValueStore {
    backend: Arc<dyn RelationalBackend>,
    shards: ShardSet,
    resolver: DimensionIndexResolver,
}

impl RelationalValueStore {
    pub fn new(
        backend: Arc<dyn RelationalBackend>,
        config: &RelationalConfig,
        cache: Arc<DimensionIndexCache>,
    ) -> Self {
        Self {
            shards: ShardSet::new(config),
            resolver: DimensionIndexResolver::new(cache, backend.clone()),
            backend,
        }
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Insert the property catalog row and its dimensions. The dimension
    /// width is validated against the pre-provisioned shard set before any
    /// write; a duplicate catalog id surfaces as `Conflict`.
    pub async fn create_property(&self, property: &Property) -> Result<PropertyId> {
        let entity_id = property
            .entity_id
            .clone()
            .ok_or_else(|| StratumError::Schema("property has no owning entity".to_string()))?;

        if !property.dimensions.is_empty() {
            self.shards.for_dimensions(&property.dimensions)?;
        }

        let index_id = self
            .backend
            .execute(Statement::InsertProperty {
                id: property.id.clone(),
                name: property.name.clone(),
                description: property.description.clone(),
                type_name: property.type_name.clone(),
                entity_id,
            })
            .await?
            .last_insert_id()?;

        if !property.dimensions.is_empty() {
            self.backend
                .execute(Statement::InsertDimensions {
                    index_id: IndexId(index_id),
                    dimensions: property.dimensions.clone(),
                })
                .await?;
        }

        info!(property_id = %property.id, index_id, dimensions = property.dimensions.len(), "created property");
        Ok(property.id.clone())
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Ingest the property's transient value buffer as one idempotent batch.
    /// Always returns a well-formed report; an empty buffer yields all-zero
    /// counters.
    pub async fn update_values(&self, property: &Property) -> Result<IngestionReport> {
        if property.values.is_empty() {
            return Ok(IngestionReport::empty());
        }

        let entry = self.resolver.resolve(&property.id).await?;
        let plan = BatchPlan::classify(&property.values, entry.num_dimensions, utils::now_millis());

        if plan.malformed > 0 {
            warn!(property_id = %property.id, malformed = plan.malformed, "dropped malformed rows");
        }

        if plan.rows.is_empty() {
            return Ok(plan.into_report(0));
        }

        let shard = self.shard_for(property, entry.num_dimensions)?.clone();
        let rows = plan.rows.clone();
        let stored = self
            .backend
            .execute(Statement::InsertValues {
                shard,
                index_id: entry.index_id,
                rows,
            })
            .await?
            .affected()?;

        let report = plan.into_report(stored as usize);
        debug!(property_id = %property.id, received = report.received, stored = report.stored, duplicates = report.duplicates, "ingested value batch");
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Value Reads
    // -------------------------------------------------------------------------

    /// Read value rows for a property. No bounds returns the single most
    /// recent row; both bounds return `[from, to]` ascending; one bound is
    /// open-ended. Column order matches the property's dimensions.
    pub async fn read_values(
        &self,
        property: &Property,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Property> {
        let entry = self.resolver.resolve(&property.id).await?;
        let shard = self.shard_for(property, entry.num_dimensions)?.clone();

        let rows = self
            .backend
            .execute(Statement::SelectValues {
                shard,
                index_id: entry.index_id,
                from,
                to,
            })
            .await?
            .rows()?;

        let mut result = property.clone();
        result.values = rows;
        Ok(result)
    }

    fn shard_for(&self, property: &Property, num_dimensions: usize) -> Result<&Shard> {
        if property.is_text_valued() {
            Ok(self.shards.text())
        } else {
            self.shards.for_width(num_dimensions)
        }
    }

    // -------------------------------------------------------------------------
    // Catalog Reads
    // -------------------------------------------------------------------------

    /// Read one property's catalog row with its dimensions (and classes for
    /// CLASS-typed properties). Fails `NotFound` when absent.
    pub async fn read_property(
        &self,
        entity_id: &EntityId,
        property_id: &PropertyId,
    ) -> Result<Property> {
        let rows = self
            .backend
            .execute(Statement::SelectProperty {
                entity_id: entity_id.clone(),
                property_id: property_id.clone(),
            })
            .await?
            .rows()?;

        let mut properties = group_join_rows(rows);
        let mut property = properties
            .pop()
            .ok_or_else(|| StratumError::NotFound(property_id.0.clone()))?;

        if property.type_name == "CLASS" {
            property.classes = self.list_classes(property_id).await?;
        }
        Ok(property)
    }

    /// List every property of an entity.
    pub async fn list_properties(&self, entity_id: &EntityId) -> Result<Vec<Property>> {
        let rows = self
            .backend
            .execute(Statement::SelectProperties {
                entity_id: entity_id.clone(),
            })
            .await?
            .rows()?;

        let mut properties = group_join_rows(rows);
        for property in &mut properties {
            if property.type_name == "CLASS" {
                property.classes = self.list_classes(&property.id).await?;
            }
        }
        Ok(properties)
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    /// Update name and description; the dimension list is immutable.
    pub async fn update_property(&self, property: &Property) -> Result<()> {
        let affected = self
            .backend
            .execute(Statement::UpdateProperty {
                id: property.id.clone(),
                name: Some(property.name.clone()),
                description: Some(property.description.clone()),
            })
            .await?
            .affected()?;
        if affected == 0 {
            return Err(StratumError::NotFound(property.id.0.clone()));
        }
        Ok(())
    }

    /// Remove the catalog row. Orphaned shard rows are left in place.
    pub async fn delete_property(&self, property_id: &PropertyId) -> Result<()> {
        let affected = self
            .backend
            .execute(Statement::DeleteProperty {
                id: property_id.clone(),
            })
            .await?
            .affected()?;
        if affected == 0 {
            return Err(StratumError::NotFound(property_id.0.clone()));
        }
        info!(property_id = %property_id, "deleted property");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Classes
    // -------------------------------------------------------------------------

    /// Insert-ignore class labels; returns how many were new.
    pub async fn insert_classes(
        &self,
        property_id: &PropertyId,
        classes: Vec<Class>,
    ) -> Result<u64> {
        if classes.is_empty() {
            return Ok(0);
        }
        self.backend
            .execute(Statement::InsertClasses {
                property_id: property_id.clone(),
                classes,
            })
            .await?
            .affected()
    }

    pub async fn list_classes(&self, property_id: &PropertyId) -> Result<Vec<Class>> {
        let rows = self
            .backend
            .execute(Statement::SelectClasses {
                property_id: property_id.clone(),
            })
            .await?
            .rows()?;

        Ok(rows
            .into_iter()
            .map(|row| Class {
                name: text_at(&row, 0),
                description: text_at(&row, 1),
                value: row.get(2).and_then(|v| v.as_timestamp()).unwrap_or(0),
                property_id: Some(property_id.clone()),
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    /// Number of properties declared with the given type.
    pub async fn count_properties_by_type(&self, type_name: &str) -> Result<u64> {
        let rows = self
            .backend
            .execute(Statement::CountByType {
                type_name: type_name.to_string(),
            })
            .await?
            .rows()?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_timestamp())
            .unwrap_or(0) as u64)
    }
}

// =============================================================================
// Join-Row Grouping
// =============================================================================

/// Reassemble properties from catalog join rows (one row per dimension).
/// Rows arrive grouped per property; dimension order is the insertion order
/// and is preserved.
fn group_join_rows(rows: Vec<Row>) -> Vec<Property> {
    let mut properties: Vec<Property> = Vec::new();

    for row in rows {
        let id = text_at(&row, 0);
        if properties.last().map(|p| p.id.as_str() != id).unwrap_or(true) {
            let mut property = Property::new(id.as_str(), text_at(&row, 1))
                .with_description(text_at(&row, 2))
                .with_type(text_at(&row, 3));
            property.registered_at = row.get(4).and_then(|v| v.as_timestamp());
            property.entity_id = Some(EntityId::new(text_at(&row, 5)));
            properties.push(property);
        }

        let property = properties.last_mut().expect("property was just pushed");
        let kind = kind_from_label(&text_at(&row, 9));
        let mut dimension = stratum_common::Dimension::new(
            text_at(&row, 6),
            text_at(&row, 7),
            text_at(&row, 8),
        );
        dimension.kind = kind;
        property.add_dimension(dimension);
    }

    properties
}

fn text_at(row: &Row, index: usize) -> String {
    row.get(index)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use stratum_common::{Dimension, RawRow, Value};

    fn store() -> RelationalValueStore {
        RelationalValueStore::new(
            Arc::new(MemoryBackend::new()),
            &RelationalConfig::default(),
            Arc::new(DimensionIndexCache::new()),
        )
    }

    fn numeric_property(id: &str, width: usize) -> Property {
        Property::new(id, format!("Property {}", id))
            .with_dimensions(
                (1..=width)
                    .map(|i| Dimension::new(format!("Value{}", i), "", ""))
                    .collect(),
            )
            .with_entity("thing-1")
    }

    fn float_row(timestamp: i64, values: &[f64]) -> RawRow {
        let mut row = vec![Value::Integer(timestamp)];
        row.extend(values.iter().map(|v| Value::Float(*v)));
        row
    }

    #[tokio::test]
    async fn test_create_and_read_preserves_dimension_order() {
        let store = store();
        for width in [1usize, 7, 15] {
            let id = format!("p{}", width);
            let property = numeric_property(&id, width);
            store.create_property(&property).await.expect("create");

            let read = store
                .read_property(&EntityId::new("thing-1"), &PropertyId::new(id.as_str()))
                .await
                .expect("read");
            assert_eq!(read.num_dimensions(), width);
            let names: Vec<&str> = read.dimensions.iter().map(|d| d.name.as_str()).collect();
            let expected: Vec<String> = (1..=width).map(|i| format!("Value{}", i)).collect();
            assert_eq!(names, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
            assert!(read.registered_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let store = store();
        let property = numeric_property("p1", 2);
        store.create_property(&property).await.expect("create");
        let err = store.create_property(&property).await.expect_err("duplicate");
        assert!(matches!(err, StratumError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_unsupported_width_fails() {
        let store = store();
        let property = numeric_property("wide", 16);
        let err = store.create_property(&property).await.expect_err("too wide");
        assert!(matches!(err, StratumError::Schema(_)));
    }

    #[tokio::test]
    async fn test_update_values_idempotent() {
        let store = store();
        let mut property = numeric_property("p1", 3);
        store.create_property(&property).await.expect("create");

        property.values = vec![
            float_row(1000, &[1.0, 2.0, 3.0]),
            float_row(2000, &[4.0, 5.0, 6.0]),
        ];

        let first = store.update_values(&property).await.expect("first batch");
        assert_eq!(first.received, 2);
        assert_eq!(first.stored, 2);
        assert_eq!(first.duplicates, 0);
        assert_eq!(first.malformed, 0);
        assert_eq!(first.timestamp_added, 0);

        let second = store.update_values(&property).await.expect("second batch");
        assert_eq!(second.stored, 0);
        assert_eq!(second.duplicates, 2);
    }

    #[tokio::test]
    async fn test_update_values_stamps_missing_timestamps() {
        let store = store();
        let mut property = numeric_property("p1", 2);
        store.create_property(&property).await.expect("create");

        let before = utils::now_millis();
        property.values = vec![vec![Value::Float(1.0), Value::Float(2.0)]];
        let report = store.update_values(&property).await.expect("ingest");
        let after = utils::now_millis();

        assert_eq!(report.stored, 1);
        assert_eq!(report.timestamp_added, 1);

        let read = store.read_values(&property, Some(0), Some(i64::MAX)).await.expect("read");
        assert_eq!(read.values.len(), 1);
        let stamped = read.values[0][0].as_timestamp().expect("timestamp");
        assert!(stamped >= before && stamped <= after);
    }

    #[tokio::test]
    async fn test_update_values_counts_malformed() {
        let store = store();
        let mut property = numeric_property("p1", 3);
        store.create_property(&property).await.expect("create");

        property.values = vec![
            vec![Value::Float(1.0), Value::Float(2.0)],
            float_row(1000, &[1.0, 2.0, 3.0]),
        ];
        let report = store.update_values(&property).await.expect("ingest");
        assert_eq!(report.received, 2);
        assert_eq!(report.stored, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.timestamp_added, 0);
        assert_eq!(report.malformed_indices, vec![0]);
    }

    #[tokio::test]
    async fn test_update_values_empty_buffer_zero_report() {
        let store = store();
        let property = numeric_property("p1", 1);
        store.create_property(&property).await.expect("create");
        let report = store.update_values(&property).await.expect("ingest");
        assert_eq!(report, IngestionReport::empty());
    }

    #[tokio::test]
    async fn test_update_values_unknown_property() {
        let store = store();
        let mut property = numeric_property("ghost", 1);
        property.values = vec![float_row(1, &[1.0])];
        let err = store.update_values(&property).await.expect_err("not found");
        assert!(matches!(err, StratumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_range_and_point_reads() {
        let store = store();
        let mut property = numeric_property("p1", 1);
        store.create_property(&property).await.expect("create");

        property.values = vec![
            float_row(1000, &[1.0]),
            float_row(2000, &[2.0]),
            float_row(3000, &[3.0]),
        ];
        store.update_values(&property).await.expect("ingest");

        let range = store
            .read_values(&property, Some(1000), Some(2000))
            .await
            .expect("range read");
        assert_eq!(range.values.len(), 2);
        assert_eq!(range.values[0][0], Value::Integer(1000));
        assert_eq!(range.values[1][0], Value::Integer(2000));

        let point = store.read_values(&property, None, None).await.expect("point read");
        assert_eq!(point.values.len(), 1);
        assert_eq!(point.values[0][0], Value::Integer(3000));

        let tail = store.read_values(&property, Some(2000), None).await.expect("open read");
        assert_eq!(tail.values.len(), 2);
    }

    #[tokio::test]
    async fn test_text_property_roundtrip() {
        let store = store();
        let mut property = Property::new("notes", "Notes")
            .with_type("TEXT")
            .with_dimensions(vec![Dimension::text("Text", "")])
            .with_entity("thing-1");
        store.create_property(&property).await.expect("create");

        property.values = vec![vec![Value::Integer(1000), Value::Text("hello".to_string())]];
        let report = store.update_values(&property).await.expect("ingest");
        assert_eq!(report.stored, 1);

        let read = store.read_values(&property, Some(0), Some(2000)).await.expect("read");
        assert_eq!(read.values[0][1], Value::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn test_update_and_delete_property() {
        let store = store();
        let mut property = numeric_property("p1", 1);
        store.create_property(&property).await.expect("create");

        property.name = "Renamed".to_string();
        store.update_property(&property).await.expect("update");
        let read = store
            .read_property(&EntityId::new("thing-1"), &property.id)
            .await
            .expect("read");
        assert_eq!(read.name, "Renamed");

        store.delete_property(&property.id).await.expect("delete");
        let err = store
            .read_property(&EntityId::new("thing-1"), &property.id)
            .await
            .expect_err("gone");
        assert!(matches!(err, StratumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_properties_and_count() {
        let store = store();
        let a = numeric_property("a1", 2).with_type("TWO_DIMENSIONS");
        let b = numeric_property("b1", 3).with_type("THREE_DIMENSIONS");
        store.create_property(&a).await.expect("create a");
        store.create_property(&b).await.expect("create b");

        let listed = store
            .list_properties(&EntityId::new("thing-1"))
            .await
            .expect("list");
        assert_eq!(listed.len(), 2);

        let count = store
            .count_properties_by_type("THREE_DIMENSIONS")
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_classes_roundtrip() {
        let store = store();
        let property = Property::new("labels", "Labels")
            .with_type("CLASS")
            .with_dimensions(vec![Dimension::new(
                "Class",
                "Values of this dimension represents the classes of the property",
                "",
            )])
            .with_entity("thing-1");
        store.create_property(&property).await.expect("create");

        let classes = vec![
            Class {
                name: "sitting".to_string(),
                description: String::new(),
                value: 0,
                property_id: Some(property.id.clone()),
            },
            Class {
                name: "walking".to_string(),
                description: String::new(),
                value: 1,
                property_id: Some(property.id.clone()),
            },
        ];
        let inserted = store.insert_classes(&property.id, classes).await.expect("insert");
        assert_eq!(inserted, 2);

        let read = store
            .read_property(&EntityId::new("thing-1"), &property.id)
            .await
            .expect("read");
        assert_eq!(read.classes.len(), 2);
        assert_eq!(read.classes[1].value, 1);
    }
}
