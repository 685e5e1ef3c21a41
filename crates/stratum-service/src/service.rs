//! Stratum Property Service
//!
//! Orchestrates the relational and time-series value stores behind one
//! surface. The service adds request dispatch and memoization only; every
//! backend failure (`NotFound`, `Conflict`, `Schema`, `Backend`) surfaces
//! to the caller unchanged. Publishes are best-effort and never roll back
//! the durable write that preceded them.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use stratum_common::config::PublishConfig;
use stratum_common::{
    Class, Dimension, EntityId, IngestionReport, Property, PropertyId, Result, StratumError,
};
use stratum_relational::RelationalValueStore;
use stratum_streaming::Publisher;
use stratum_timeseries::{AggregateFunction, Fill, TimeSeriesValueStore};

// =============================================================================
// Read Dispatch
// =============================================================================

/// Which backend answers a ranged read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadBackend {
    #[default]
    Relational,
    Timeseries,
}

impl ReadBackend {
    /// Parse a caller-supplied backend name; unknown names are rejected.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "relational" => Some(Self::Relational),
            "timeseries" => Some(Self::Timeseries),
            _ => None,
        }
    }
}

/// Parameters of a property read. With both time bounds set the read is
/// delegated to the selected backend; otherwise the bare catalog row is
/// returned. `interval`, `function` and `fill` only apply to time-series
/// reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadRequest {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub interval: Option<i64>,
    pub function: AggregateFunction,
    pub fill: Fill,
    pub backend: ReadBackend,
}

impl ReadRequest {
    pub fn range(from: i64, to: i64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn downsample(mut self, interval: i64, function: AggregateFunction) -> Self {
        self.interval = Some(interval);
        self.function = function;
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn on_backend(mut self, backend: ReadBackend) -> Self {
        self.backend = backend;
        self
    }
}

// =============================================================================
// Property Service
// =============================================================================

pub struct PropertyService {
    relational: Arc<RelationalValueStore>,
    timeseries: Arc<TimeSeriesValueStore>,
    publisher: Arc<dyn Publisher>,
    topics: PublishConfig,
    /// Dimension memo keyed by `entityId_propertyId`, filled by the lazy
    /// hydration path in `update_values`.
    hydrated: RwLock<HashMap<String, Vec<Dimension>>>,
}

impl PropertyService {
    pub fn new(
        relational: Arc<RelationalValueStore>,
        timeseries: Arc<TimeSeriesValueStore>,
        publisher: Arc<dyn Publisher>,
        topics: PublishConfig,
    ) -> Self {
        Self {
            relational,
            timeseries,
            publisher,
            topics,
            hydrated: RwLock::new(HashMap::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Create a property: enrich its shape from the type catalog (once, at
    /// construction), write the catalog row, then publish. A publish failure
    /// is logged and does not undo the catalog write.
    pub async fn create(&self, mut property: Property) -> Result<Property> {
        stratum_catalog::enrich(&mut property);
        self.relational.create_property(&property).await?;
        self.publish_property(&property).await;
        Ok(property)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Read a property. The catalog row is read first and missing properties
    /// fail `NotFound`; only a request with both time bounds delegates to a
    /// value-store backend.
    pub async fn read(
        &self,
        entity_id: &EntityId,
        property_id: &PropertyId,
        request: ReadRequest,
    ) -> Result<Property> {
        let property = self.relational.read_property(entity_id, property_id).await?;

        let (Some(from), Some(to)) = (request.from, request.to) else {
            return Ok(property);
        };

        match request.backend {
            ReadBackend::Relational => {
                self.relational
                    .read_values(&property, Some(from), Some(to))
                    .await
            }
            ReadBackend::Timeseries => {
                self.timeseries
                    .read_values(
                        &property,
                        Some(from),
                        Some(to),
                        request.interval,
                        request.function,
                        request.fill,
                    )
                    .await
            }
        }
    }

    /// List every property of an entity.
    pub async fn list(&self, entity_id: &EntityId) -> Result<Vec<Property>> {
        self.relational.list_properties(entity_id).await
    }

    // -------------------------------------------------------------------------
    // Updates
    // -------------------------------------------------------------------------

    /// Update property metadata, then publish the new state.
    pub async fn update(&self, property: &Property) -> Result<()> {
        self.relational.update_property(property).await?;
        self.publish_property(property).await;
        Ok(())
    }

    /// Ingest a value batch. Callers commonly supply only
    /// `{id, entity_id, values}`; dimensions are then resolved through a
    /// catalog read and memoized per `entityId_propertyId` — an explicit
    /// resolve-then-ingest, so termination does not depend on recursion.
    pub async fn update_values(&self, property: Property) -> Result<IngestionReport> {
        if property.values.is_empty() {
            return Ok(IngestionReport::empty());
        }

        let property = self.hydrate(property).await?;
        let report = self.relational.update_values(&property).await?;
        self.publish_values(&property, &report).await;
        Ok(report)
    }

    /// Attach dimensions to a bare property, going to the catalog only on
    /// the first call per `entityId_propertyId` key.
    async fn hydrate(&self, mut property: Property) -> Result<Property> {
        if !property.dimensions.is_empty() {
            return Ok(property);
        }

        let entity_id = property.entity_id.clone().ok_or_else(|| {
            StratumError::NotFound(format!(
                "cannot resolve dimensions of '{}' without an entity id",
                property.id
            ))
        })?;
        let key = memo_key(&entity_id, &property.id);

        if let Some(dimensions) = self.hydrated.read().get(&key) {
            property.dimensions = dimensions.clone();
            return Ok(property);
        }

        let catalog_row = self.relational.read_property(&entity_id, &property.id).await?;
        debug!(property_id = %property.id, dimensions = catalog_row.dimensions.len(), "hydrated dimensions");
        self.hydrated
            .write()
            .insert(key, catalog_row.dimensions.clone());
        property.dimensions = catalog_row.dimensions;
        if property.type_name.is_empty() {
            property.type_name = catalog_row.type_name;
        }
        Ok(property)
    }

    // -------------------------------------------------------------------------
    // Deletion
    // -------------------------------------------------------------------------

    /// Delete the catalog row; orphaned shard rows are left in place.
    pub async fn delete(&self, property_id: &PropertyId) -> Result<()> {
        self.relational.delete_property(property_id).await
    }

    // -------------------------------------------------------------------------
    // Classes
    // -------------------------------------------------------------------------

    /// Attach class labels to a CLASS-typed property. Values continue from
    /// the highest already attributed.
    pub async fn create_classes(
        &self,
        entity_id: &EntityId,
        property_id: &PropertyId,
        mut classes: Vec<Class>,
    ) -> Result<Vec<Class>> {
        let property = self.relational.read_property(entity_id, property_id).await?;
        if property.type_name != "CLASS" {
            return Err(StratumError::Schema(
                "classes require a property of type CLASS".to_string(),
            ));
        }

        let existing = self.relational.list_classes(property_id).await?;
        let mut next = existing.iter().map(|c| c.value + 1).max().unwrap_or(0);
        for class in &mut classes {
            class.value = next;
            class.property_id = Some(property_id.clone());
            next += 1;
        }

        self.relational
            .insert_classes(property_id, classes.clone())
            .await?;
        Ok(classes)
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    /// Number of properties declared with the given type.
    pub async fn count_by_type(&self, type_name: &str) -> Result<u64> {
        self.relational.count_properties_by_type(type_name).await
    }

    // -------------------------------------------------------------------------
    // Publishing
    // -------------------------------------------------------------------------

    async fn publish_property(&self, property: &Property) {
        let payload = match serde_json::to_value(property) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(property_id = %property.id, error = %err, "failed to serialize property event");
                return;
            }
        };
        if let Err(err) = self
            .publisher
            .publish(
                &self.topics.property_topic,
                vec![payload],
                Some(property.id.as_str()),
            )
            .await
        {
            warn!(property_id = %property.id, error = %err, "property publish failed");
        }
    }

    async fn publish_values(&self, property: &Property, report: &IngestionReport) {
        if report.received == 0 {
            return;
        }
        let mut messages = Vec::with_capacity(property.values.len());
        for row in &property.values {
            match serde_json::to_value(row) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    warn!(property_id = %property.id, error = %err, "failed to serialize value row");
                    return;
                }
            }
        }
        let key = property
            .entity_id
            .as_ref()
            .map(|entity_id| memo_key(entity_id, &property.id))
            .unwrap_or_else(|| property.id.0.clone());
        if let Err(err) = self
            .publisher
            .publish(&self.topics.values_topic, messages, Some(&key))
            .await
        {
            warn!(property_id = %property.id, error = %err, "values publish failed");
        }
    }
}

fn memo_key(entity_id: &EntityId, property_id: &PropertyId) -> String {
    format!("{}_{}", entity_id, property_id)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(ReadBackend::parse("relational"), Some(ReadBackend::Relational));
        assert_eq!(ReadBackend::parse("TIMESERIES"), Some(ReadBackend::Timeseries));
        assert_eq!(ReadBackend::parse("graph"), None);
    }

    #[test]
    fn test_read_request_builder() {
        let request = ReadRequest::range(0, 3000)
            .downsample(1000, AggregateFunction::Max)
            .with_fill(Fill::Zero)
            .on_backend(ReadBackend::Timeseries);
        assert_eq!(request.from, Some(0));
        assert_eq!(request.interval, Some(1000));
        assert_eq!(request.function, AggregateFunction::Max);
        assert_eq!(request.fill, Fill::Zero);
        assert_eq!(request.backend, ReadBackend::Timeseries);
    }

    #[test]
    fn test_memo_key_shape() {
        let key = memo_key(&EntityId::new("thing-1"), &PropertyId::new("accel-1"));
        assert_eq!(key, "thing-1_accel-1");
    }
}
