//! Stratum Time-Series Client Interface
//!
//! The narrow interface the time-series value store consumes, plus an
//! in-memory implementation for tests and embedded use. The in-memory
//! client interprets the typed range query directly and mirrors the
//! backend's idempotence: a point whose series/timestamp key already exists
//! is a no-op, not an overwrite.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use stratum_common::{Result, Value};

use crate::aggregation::Downsampler;
use crate::point::{Point, QueryOptions, WriteOptions};
use crate::query::{QueryResponse, RangeQuery, SeriesResult, StatementResult};

// =============================================================================
// Client Trait
// =============================================================================

/// Time-series backend client. Implemented outside this core for real
/// backends; `MemorySeriesClient` implements it in-process.
#[async_trait]
pub trait SeriesClient: Send + Sync {
    /// Write a batch of points. Returns how many points the backend
    /// actually accepted (existing series/timestamp keys are no-ops).
    async fn write_points(&self, points: Vec<Point>, options: &WriteOptions) -> Result<u64>;

    /// Execute a range query.
    async fn query(&self, query: &RangeQuery, options: &QueryOptions) -> Result<QueryResponse>;
}

// =============================================================================
// Memory Client
// =============================================================================

type SeriesKey = (String, String, String);

/// In-memory implementation of the time-series client.
#[derive(Default)]
pub struct MemorySeriesClient {
    series: RwLock<HashMap<SeriesKey, BTreeMap<i64, HashMap<String, Value>>>>,
}

impl MemorySeriesClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points held for one series.
    pub fn series_len(&self, measurement: &str, entity_id: &str, property_id: &str) -> usize {
        let series = self.series.read();
        series
            .get(&(
                measurement.to_string(),
                entity_id.to_string(),
                property_id.to_string(),
            ))
            .map(|points| points.len())
            .unwrap_or(0)
    }
}

fn series_key(point: &Point) -> SeriesKey {
    (
        point.measurement.clone(),
        point.tags.get("entity_id").cloned().unwrap_or_default(),
        point.tags.get("property_id").cloned().unwrap_or_default(),
    )
}

#[async_trait]
impl SeriesClient for MemorySeriesClient {
    async fn write_points(&self, points: Vec<Point>, _options: &WriteOptions) -> Result<u64> {
        let mut series = self.series.write();
        let mut written = 0;
        for point in points {
            let key = series_key(&point);
            let timeline = series.entry(key).or_default();
            if timeline.contains_key(&point.timestamp) {
                continue;
            }
            timeline.insert(point.timestamp, point.fields.into_iter().collect());
            written += 1;
        }
        Ok(written)
    }

    async fn query(&self, query: &RangeQuery, _options: &QueryOptions) -> Result<QueryResponse> {
        let series = self.series.read();
        let key = (
            query.measurement.clone(),
            query.entity_id.clone(),
            query.property_id.clone(),
        );

        let empty = QueryResponse {
            results: vec![StatementResult { series: Vec::new() }],
        };
        let Some(timeline) = series.get(&key) else {
            return Ok(empty);
        };

        let low = query.from.unwrap_or(i64::MIN);
        let high = query.to.unwrap_or(i64::MAX);

        // Rows with every requested column present, ascending by time.
        let rows: Vec<(i64, Vec<Value>)> = timeline
            .range(low..=high)
            .filter_map(|(timestamp, fields)| {
                let cells: Option<Vec<Value>> = query
                    .columns
                    .iter()
                    .map(|column| fields.get(column).cloned())
                    .collect();
                cells.map(|cells| (*timestamp, cells))
            })
            .collect();

        if rows.is_empty() {
            return Ok(empty);
        }

        let values: Vec<Vec<Value>> = match query.interval {
            None => rows
                .into_iter()
                .map(|(timestamp, cells)| {
                    let mut row = vec![Value::Integer(timestamp)];
                    row.extend(cells);
                    row
                })
                .collect(),
            Some(interval) => {
                let numeric: Vec<(i64, Vec<f64>)> = rows
                    .iter()
                    .filter_map(|(timestamp, cells)| {
                        let columns: Option<Vec<f64>> =
                            cells.iter().map(|cell| cell.as_f64()).collect();
                        columns.map(|columns| (*timestamp, columns))
                    })
                    .collect();
                let from = query.from.unwrap_or_else(|| numeric.first().map(|(t, _)| *t).unwrap_or(0));
                let to = query.to.unwrap_or_else(|| numeric.last().map(|(t, _)| *t).unwrap_or(0));
                let downsampler = Downsampler::new(interval, query.function);
                downsampler
                    .downsample(&numeric, query.columns.len(), from, to, query.fill)
                    .into_iter()
                    .map(|(bucket, columns)| {
                        let mut row = vec![Value::Integer(bucket)];
                        row.extend(columns.into_iter().map(Value::Float));
                        row
                    })
                    .collect()
            }
        };

        let mut columns = vec!["time".to_string()];
        columns.extend(query.columns.iter().cloned());

        Ok(QueryResponse {
            results: vec![StatementResult {
                series: vec![SeriesResult {
                    name: query.measurement.clone(),
                    columns,
                    values,
                }],
            }],
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregateFunction, Fill};

    fn options() -> (WriteOptions, QueryOptions) {
        let config = stratum_common::config::TimeSeriesConfig::default();
        (WriteOptions::from(&config), QueryOptions::from(&config))
    }

    fn point(timestamp: i64, x: f64) -> Point {
        Point::new("SPEED", timestamp)
            .tag("entity_id", "thing-1")
            .tag("property_id", "speed-1")
            .field("Speed", Value::Float(x))
    }

    fn speed_query() -> RangeQuery {
        RangeQuery::new("SPEED", "thing-1", "speed-1", vec!["Speed".to_string()])
    }

    #[tokio::test]
    async fn test_write_and_query_roundtrip() {
        let client = MemorySeriesClient::new();
        let (write, read) = options();

        let written = client
            .write_points(vec![point(1000, 1.0), point(2000, 2.0)], &write)
            .await
            .expect("write");
        assert_eq!(written, 2);

        let response = client
            .query(&speed_query().between(0, 3000), &read)
            .await
            .expect("query");
        let series = response.first_series().expect("series");
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.values[0], vec![Value::Integer(1000), Value::Float(1.0)]);
        assert_eq!(series.columns, vec!["time", "Speed"]);
    }

    #[tokio::test]
    async fn test_duplicate_points_are_noops() {
        let client = MemorySeriesClient::new();
        let (write, _) = options();

        let first = client
            .write_points(vec![point(1000, 1.0)], &write)
            .await
            .expect("write");
        let second = client
            .write_points(vec![point(1000, 9.0)], &write)
            .await
            .expect("write");
        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(client.series_len("SPEED", "thing-1", "speed-1"), 1);
    }

    #[tokio::test]
    async fn test_range_filtering() {
        let client = MemorySeriesClient::new();
        let (write, read) = options();
        client
            .write_points(
                vec![point(1000, 1.0), point(2000, 2.0), point(3000, 3.0)],
                &write,
            )
            .await
            .expect("write");

        let response = client
            .query(&speed_query().between(1000, 2000), &read)
            .await
            .expect("query");
        let series = response.first_series().expect("series");
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.values[1][0], Value::Integer(2000));
    }

    #[tokio::test]
    async fn test_downsampled_mean() {
        let client = MemorySeriesClient::new();
        let (write, read) = options();
        let points = (0..10).map(|i| point(i * 1000, i as f64)).collect();
        client.write_points(points, &write).await.expect("write");

        let query = speed_query()
            .between(0, 9999)
            .downsample(5000, AggregateFunction::Mean)
            .with_fill(Fill::None);
        let response = client.query(&query, &read).await.expect("query");
        let series = response.first_series().expect("series");
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.values[0], vec![Value::Integer(0), Value::Float(2.0)]);
        assert_eq!(series.values[1], vec![Value::Integer(5000), Value::Float(7.0)]);
    }

    #[tokio::test]
    async fn test_empty_result_reports_no_series() {
        let client = MemorySeriesClient::new();
        let (_, read) = options();
        let response = client
            .query(&speed_query().between(0, 1000), &read)
            .await
            .expect("query");
        assert!(response.first_series().is_none());
    }
}
