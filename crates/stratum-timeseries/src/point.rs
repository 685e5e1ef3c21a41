//! Stratum Time-Series Points
//!
//! Point representation and write/query options for the time-series client.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stratum_common::config::TimeSeriesConfig;
use stratum_common::Value;

// =============================================================================
// Point
// =============================================================================

/// A single point: measurement, identifying tags, one field per dimension,
/// and a millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: Vec<(String, Value)>,
    pub timestamp: i64,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options attached to every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub precision: String,
    pub database: String,
}

/// Options attached to every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub precision: String,
    pub database: String,
}

impl From<&TimeSeriesConfig> for WriteOptions {
    fn from(config: &TimeSeriesConfig) -> Self {
        Self {
            precision: config.precision.clone(),
            database: config.database.clone(),
        }
    }
}

impl From<&TimeSeriesConfig> for QueryOptions {
    fn from(config: &TimeSeriesConfig) -> Self {
        Self {
            precision: config.precision.clone(),
            database: config.database.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
