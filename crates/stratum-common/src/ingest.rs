//! Stratum Ingest - Row Classification and Ingestion Reports
//!
//! Shared row-shape validation for the relational and time-series value
//! stores. Both backends plan a batch through the same logic so that backend
//! choice never changes the ingestion contract: a row of length `k` gets a
//! server timestamp, a row of length `k + 1` passes verbatim, anything else
//! is dropped and counted as malformed.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};

use crate::types::{RawRow, Value};

// =============================================================================
// Ingestion Report
// =============================================================================

/// The authoritative outcome of a value-write call. Callers must not infer
/// success from the absence of an error; a call that inserts zero rows still
/// returns a well-formed all-zero report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    pub received: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub timestamp_added: usize,
    /// Input indices of the rows dropped as malformed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed_indices: Vec<usize>,
}

impl IngestionReport {
    /// Report for an empty ingestion buffer.
    pub fn empty() -> Self {
        Self::default()
    }
}

// =============================================================================
// Prepared Rows
// =============================================================================

/// A raw row that survived classification, normalized to an explicit
/// timestamp plus exactly one field per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    pub timestamp: i64,
    pub fields: Vec<Value>,
    /// True when the timestamp was substituted server-side.
    pub stamped: bool,
}

// =============================================================================
// Batch Planning
// =============================================================================

/// Classification of one ingestion batch before it reaches a backend.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub rows: Vec<PreparedRow>,
    pub received: usize,
    pub malformed: usize,
    pub timestamp_added: usize,
    pub malformed_indices: Vec<usize>,
}

impl BatchPlan {
    /// Classify every raw row against the property's dimension count.
    /// `now_ms` is the server timestamp substituted into rows that omit one.
    pub fn classify(rows: &[RawRow], num_dimensions: usize, now_ms: i64) -> Self {
        let mut plan = BatchPlan {
            received: rows.len(),
            ..Default::default()
        };

        for (index, row) in rows.iter().enumerate() {
            match prepare_row(row, num_dimensions, now_ms) {
                Some(prepared) => {
                    if prepared.stamped {
                        plan.timestamp_added += 1;
                    }
                    plan.rows.push(prepared);
                }
                None => {
                    plan.malformed += 1;
                    plan.malformed_indices.push(index);
                }
            }
        }

        plan
    }

    /// Fold the backend-reported affected-row count into the final report.
    /// Duplicates are whatever was received but neither malformed nor stored.
    pub fn into_report(self, stored: usize) -> IngestionReport {
        let duplicates = self.received.saturating_sub(self.malformed + stored);
        IngestionReport {
            received: self.received,
            stored,
            duplicates,
            malformed: self.malformed,
            timestamp_added: self.timestamp_added,
            malformed_indices: self.malformed_indices,
        }
    }
}

/// Classify a single raw row. Returns `None` when the row's length matches
/// neither `num_dimensions` nor `num_dimensions + 1`, or when the explicit
/// timestamp cell is not numeric. No partial ingestion is attempted.
pub fn prepare_row(row: &RawRow, num_dimensions: usize, now_ms: i64) -> Option<PreparedRow> {
    if row.len() == num_dimensions {
        return Some(PreparedRow {
            timestamp: now_ms,
            fields: row.clone(),
            stamped: true,
        });
    }

    if row.len() == num_dimensions + 1 {
        let timestamp = row[0].as_timestamp()?;
        return Some(PreparedRow {
            timestamp,
            fields: row[1..].to_vec(),
            stamped: false,
        });
    }

    None
}

// =============================================================================
// Tests
// =============================================================================
