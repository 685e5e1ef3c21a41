//! Stratum Time-Series Queries
//!
//! Range/downsample query model and the raw response shape returned by the
//! time-series client. The query renders the backend's query language for
//! driver-backed adapters; the in-memory client interprets it directly.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};

use stratum_common::Value;

use crate::aggregation::{AggregateFunction, Fill};

// =============================================================================
// Range Query
// =============================================================================

/// A range read against one property's measurement. When `interval` is set,
/// every column is wrapped in the aggregate function and results are
/// bucketed; empty buckets are handled per the fill policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub measurement: String,
    pub entity_id: String,
    pub property_id: String,
    /// Dimension columns, in the property's declared order.
    pub columns: Vec<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    /// Bucket width in milliseconds.
    pub interval: Option<i64>,
    pub function: AggregateFunction,
    pub fill: Fill,
}

impl RangeQuery {
    pub fn new(
        measurement: impl Into<String>,
        entity_id: impl Into<String>,
        property_id: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            entity_id: entity_id.into(),
            property_id: property_id.into(),
            columns,
            from: None,
            to: None,
            interval: None,
            function: AggregateFunction::Mean,
            fill: Fill::None,
        }
    }

    pub fn between(mut self, from: i64, to: i64) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
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

    /// Render the backend query string.
    pub fn to_query_string(&self) -> String {
        let mut query = "SELECT time".to_string();
        for column in &self.columns {
            if self.interval.is_some() {
                query.push_str(&format!(", {}(\"{}\")", self.function.as_str(), column));
            } else {
                query.push_str(&format!(", \"{}\"", column));
            }
        }
        query.push_str(&format!(" FROM \"{}\"", self.measurement));
        query.push_str(&format!(
            " WHERE \"entity_id\" = '{}' AND \"property_id\" = '{}'",
            self.entity_id, self.property_id
        ));
        if let Some(from) = self.from {
            query.push_str(&format!(" AND time >= {}ms", from));
        }
        if let Some(to) = self.to {
            query.push_str(&format!(" AND time <= {}ms", to));
        }
        if let Some(interval) = self.interval {
            query.push_str(&format!(
                " GROUP BY time({}ms) fill({})",
                interval,
                self.fill.as_str()
            ));
        }
        query
    }
}

// =============================================================================
// Query Response
// =============================================================================

/// Raw response shape: statement results, each carrying zero or more
/// series. A property read consumes the first series only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<StatementResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub series: Vec<SeriesResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub name: String,
    pub columns: Vec<String>,
    /// Rows of `[time, v1, v2, ...]`.
    pub values: Vec<Vec<Value>>,
}

impl QueryResponse {
    /// The first series of the first statement, if the backend reported one.
    pub fn first_series(&self) -> Option<&SeriesResult> {
        self.results.first().and_then(|r| r.series.first())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base_query() -> RangeQuery {
        RangeQuery::new(
            "ACCELEROMETER",
            "thing-1",
            "accel-1",
            vec!["x".to_string(), "y".to_string(), "z".to_string()],
        )
    }

    #[test]
    fn test_plain_range_query_string() {
        let query = base_query().between(0, 3000);
        assert_eq!(
            query.to_query_string(),
            "SELECT time, \"x\", \"y\", \"z\" FROM \"ACCELEROMETER\" \
             WHERE \"entity_id\" = 'thing-1' AND \"property_id\" = 'accel-1' \
             AND time >= 0ms AND time <= 3000ms"
        );
    }

    #[test]
    fn test_downsampled_query_string() {
        let query = base_query()
            .between(0, 60_000)
            .downsample(5000, AggregateFunction::Mean);
        let rendered = query.to_query_string();
        assert!(rendered.contains("MEAN(\"x\"), MEAN(\"y\"), MEAN(\"z\")"));
        assert!(rendered.ends_with("GROUP BY time(5000ms) fill(none)"));
    }

    #[test]
    fn test_response_first_series() {
        let response = QueryResponse {
            results: vec![StatementResult {
                series: vec![SeriesResult {
                    name: "ACCELEROMETER".to_string(),
                    columns: vec!["time".to_string(), "x".to_string()],
                    values: vec![vec![Value::Integer(0), Value::Float(1.0)]],
                }],
            }],
        };
        assert_eq!(response.first_series().expect("series").values.len(), 1);

        let empty = QueryResponse::default();
        assert!(empty.first_series().is_none());
    }
}
