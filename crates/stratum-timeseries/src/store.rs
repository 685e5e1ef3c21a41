//! Stratum Time-Series Value Store
//!
//! Writes and reads property values against the time-series backend,
//! addressing data by measurement (the property type) and entity/property
//! tags. Ingestion shares the row-shape classification of the relational
//! path, so backend choice never changes the ingestion-report contract.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use std::sync::Arc;
use tracing::{debug, warn};

use stratum_common::config::TimeSeriesConfig;
use stratum_common::{utils, BatchPlan, IngestionReport, Property, Result, StratumError};

use crate::aggregation::{AggregateFunction, Fill};
use crate::client::SeriesClient;
use crate::point::{Point, QueryOptions, WriteOptions};
use crate::query::RangeQuery;
use crate::schema::SchemaRegistry;

// =============================================================================
// Time-Series Value Store
// =============================================================================

pub struct TimeSeriesValueStore {
    client: Arc<dyn SeriesClient>,
    schemas: SchemaRegistry,
    config: TimeSeriesConfig,
}

impl TimeSeriesValueStore {
    pub fn new(
        client: Arc<dyn SeriesClient>,
        schemas: SchemaRegistry,
        config: TimeSeriesConfig,
    ) -> Self {
        Self {
            client,
            schemas,
            config,
        }
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Convert the property's raw rows to points and write them. Requires a
    /// pre-registered measurement schema for the property's type; properties
    /// without one stay on the relational store.
    pub async fn write_values(&self, property: &Property) -> Result<IngestionReport> {
        if property.values.is_empty() {
            return Ok(IngestionReport::empty());
        }

        let entity_id = property
            .entity_id
            .clone()
            .ok_or_else(|| StratumError::Schema("property has no owning entity".to_string()))?;

        let schema = self.schemas.get(&property.type_name).ok_or_else(|| {
            StratumError::Schema(format!(
                "no measurement schema registered for type '{}'",
                property.type_name
            ))
        })?;

        let plan = BatchPlan::classify(&property.values, schema.width(), utils::now_millis());
        if plan.malformed > 0 {
            warn!(property_id = %property.id, malformed = plan.malformed, "skipped malformed rows");
        }
        if plan.rows.is_empty() {
            return Ok(plan.into_report(0));
        }

        let points: Vec<Point> = plan
            .rows
            .iter()
            .map(|row| {
                let mut point = Point::new(schema.measurement.clone(), row.timestamp)
                    .tag("entity_id", entity_id.as_str())
                    .tag("property_id", property.id.as_str());
                for (field, value) in schema.fields.iter().zip(row.fields.iter()) {
                    point = point.field(field.name.clone(), value.clone());
                }
                point
            })
            .collect();

        let stored = self
            .client
            .write_points(points, &WriteOptions::from(&self.config))
            .await?;

        let report = plan.into_report(stored as usize);
        debug!(property_id = %property.id, stored = report.stored, duplicates = report.duplicates, "wrote point batch");
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Range Reads
    // -------------------------------------------------------------------------

    /// Read a time range, optionally downsampled. Returns the property with
    /// `values` populated from the first result series, or an empty list
    /// when the backend reports no series.
    pub async fn read_values(
        &self,
        property: &Property,
        from: Option<i64>,
        to: Option<i64>,
        interval: Option<i64>,
        function: AggregateFunction,
        fill: Fill,
    ) -> Result<Property> {
        let entity_id = property
            .entity_id
            .clone()
            .ok_or_else(|| StratumError::Schema("property has no owning entity".to_string()))?;

        let columns = self.columns_for(property)?;
        let mut query = RangeQuery::new(
            property.type_name.clone(),
            entity_id.as_str(),
            property.id.as_str(),
            columns,
        );
        query.from = from;
        query.to = to;
        if let Some(interval) = interval {
            query = query.downsample(interval, function).with_fill(fill);
        }

        debug!(property_id = %property.id, query = %query.to_query_string(), "range read");

        let response = self
            .client
            .query(&query, &QueryOptions::from(&self.config))
            .await?;

        let mut result = property.clone();
        result.values = response
            .first_series()
            .map(|series| series.values.clone())
            .unwrap_or_default();
        Ok(result)
    }

    /// Dimension columns for a query: the property's declared order, or the
    /// registered schema when the caller supplied a bare property.
    fn columns_for(&self, property: &Property) -> Result<Vec<String>> {
        if !property.dimensions.is_empty() {
            return Ok(property.dimensions.iter().map(|d| d.name.clone()).collect());
        }
        self.schemas
            .get(&property.type_name)
            .map(|schema| schema.fields.iter().map(|f| f.name.clone()).collect())
            .ok_or_else(|| {
                StratumError::Schema(format!(
                    "no dimensions or measurement schema for type '{}'",
                    property.type_name
                ))
            })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemorySeriesClient;
    use stratum_common::Value;

    fn store() -> TimeSeriesValueStore {
        TimeSeriesValueStore::new(
            Arc::new(MemorySeriesClient::new()),
            SchemaRegistry::with_catalog_types(),
            TimeSeriesConfig::default(),
        )
    }

    fn three_dimensions(id: &str) -> Property {
        let mut property = Property::new(id, "3 Dimensions")
            .with_type("THREE_DIMENSIONS")
            .with_entity("thing-1");
        stratum_catalog::enrich(&mut property);
        property
    }

    fn float_row(timestamp: i64, values: &[f64]) -> Vec<Value> {
        let mut row = vec![Value::Integer(timestamp)];
        row.extend(values.iter().map(|v| Value::Float(*v)));
        row
    }

    #[tokio::test]
    async fn test_write_and_read_roundtrip() {
        let store = store();
        let mut property = three_dimensions("accel-1");
        property.values = vec![
            float_row(1000, &[1.0, 2.0, 3.0]),
            float_row(2000, &[4.0, 5.0, 6.0]),
        ];

        let report = store.write_values(&property).await.expect("write");
        assert_eq!(report.received, 2);
        assert_eq!(report.stored, 2);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.malformed, 0);
        assert_eq!(report.timestamp_added, 0);

        let read = store
            .read_values(
                &property,
                Some(0),
                Some(3000),
                None,
                AggregateFunction::Mean,
                Fill::None,
            )
            .await
            .expect("read");
        assert_eq!(read.values.len(), 2);
        assert_eq!(
            read.values[0],
            vec![
                Value::Integer(1000),
                Value::Float(1.0),
                Value::Float(2.0),
                Value::Float(3.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_batch_counts_duplicates() {
        let store = store();
        let mut property = three_dimensions("accel-1");
        property.values = vec![float_row(1000, &[1.0, 2.0, 3.0])];

        store.write_values(&property).await.expect("first write");
        let second = store.write_values(&property).await.expect("second write");
        assert_eq!(second.stored, 0);
        assert_eq!(second.duplicates, 1);
    }

    #[tokio::test]
    async fn test_unregistered_type_is_schema_error() {
        let store = store();
        let mut property = Property::new("odd-1", "Odd")
            .with_type("WARP_FIELD")
            .with_entity("thing-1");
        property.values = vec![vec![Value::Float(1.0)]];

        let err = store.write_values(&property).await.expect_err("no schema");
        assert!(matches!(err, StratumError::Schema(_)));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_and_counted() {
        let store = store();
        let mut property = three_dimensions("accel-1");
        property.values = vec![
            vec![Value::Float(1.0), Value::Float(2.0)],
            float_row(1000, &[1.0, 2.0, 3.0]),
        ];

        let report = store.write_values(&property).await.expect("write");
        assert_eq!(report.received, 2);
        assert_eq!(report.stored, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.malformed_indices, vec![0]);
    }

    #[tokio::test]
    async fn test_downsampled_mean_read() {
        let store = store();
        let mut property = three_dimensions("accel-1");
        property.values = (0..10)
            .map(|i| float_row(i * 1000, &[i as f64, 0.0, 0.0]))
            .collect();
        store.write_values(&property).await.expect("write");

        let read = store
            .read_values(
                &property,
                Some(0),
                Some(9999),
                Some(5000),
                AggregateFunction::Mean,
                Fill::None,
            )
            .await
            .expect("read");
        assert_eq!(read.values.len(), 2);
        assert_eq!(read.values[0][0], Value::Integer(0));
        assert_eq!(read.values[0][1], Value::Float(2.0));
        assert_eq!(read.values[1][1], Value::Float(7.0));
    }

    #[tokio::test]
    async fn test_read_with_no_data_returns_empty_values() {
        let store = store();
        let property = three_dimensions("accel-1");
        let read = store
            .read_values(
                &property,
                Some(0),
                Some(1000),
                None,
                AggregateFunction::Mean,
                Fill::None,
            )
            .await
            .expect("read");
        assert!(read.values.is_empty());
    }

    #[tokio::test]
    async fn test_empty_buffer_zero_report() {
        let store = store();
        let property = three_dimensions("accel-1");
        let report = store.write_values(&property).await.expect("write");
        assert_eq!(report, IngestionReport::empty());
    }
}
