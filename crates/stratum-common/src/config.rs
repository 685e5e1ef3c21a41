//! Stratum Config - Configuration Structures
//!
//! Configuration types for the Stratum components. Supports programmatic
//! construction with sensible defaults for development deployments; all
//! structures serialize for TOML/JSON config files.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// Relational Store Configuration
// =============================================================================

/// Configuration for the relational value store's shard naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    /// Prefix of the fixed-width shard tables (`d1` .. `d15`).
    pub shard_prefix: String,
    /// Name of the dedicated text-valued shard table.
    pub text_shard: String,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            shard_prefix: "d".to_string(),
            text_shard: "dtext".to_string(),
        }
    }
}

// =============================================================================
// Time-Series Store Configuration
// =============================================================================

/// Configuration for the time-series value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesConfig {
    /// Target database on the time-series backend.
    pub database: String,
    /// Timestamp precision sent with every write and query.
    pub precision: String,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            database: "stratum".to_string(),
            precision: "ms".to_string(),
        }
    }
}

// =============================================================================
// Publish Configuration
// =============================================================================

/// Topics for the outbound publish channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    pub property_topic: String,
    pub values_topic: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            property_topic: "properties".to_string(),
            values_topic: "values".to_string(),
        }
    }
}

// =============================================================================
// Aggregate Configuration
// =============================================================================

/// Top-level configuration for a Stratum deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratumConfig {
    #[serde(default)]
    pub relational: RelationalConfig,
    #[serde(default)]
    pub timeseries: TimeSeriesConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StratumConfig::default();
        assert_eq!(config.relational.shard_prefix, "d");
        assert_eq!(config.relational.text_shard, "dtext");
        assert_eq!(config.timeseries.precision, "ms");
        assert_eq!(config.publish.values_topic, "values");
    }

    #[test]
    fn test_partial_deserialization() {
        let config: StratumConfig =
            serde_json::from_str(r#"{"timeseries": {"database": "lab", "precision": "ms"}}"#)
                .expect("partial config parses");
        assert_eq!(config.timeseries.database, "lab");
        assert_eq!(config.relational.shard_prefix, "d");
    }
}
