//! Stratum Shard Dispatch
//!
//! Maps a property's dimension list to the shard table its value rows are
//! routed to. The table is built once at startup from the closed width range
//! (1 through 15, plus text); widths outside the pre-provisioned set fail
//! fast at property creation.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use stratum_common::config::RelationalConfig;
use stratum_common::{Dimension, DimensionKind, Result, StratumError};

// =============================================================================
// Shard
// =============================================================================

/// Kind of a shard table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardKind {
    /// Fixed-width numeric table holding `width` value columns.
    Numeric { width: usize },
    /// Dedicated single-column text table.
    Text,
}

/// Handle to one pre-provisioned shard table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub kind: ShardKind,
    pub table: String,
}

impl Shard {
    /// Number of value columns in this shard.
    pub fn width(&self) -> usize {
        match self.kind {
            ShardKind::Numeric { width } => width,
            ShardKind::Text => 1,
        }
    }
}

// =============================================================================
// Shard Set
// =============================================================================

/// Highest pre-provisioned numeric shard width.
pub const MAX_WIDTH: usize = 15;

/// Dispatch table over the closed set of supported shards.
#[derive(Debug, Clone)]
pub struct ShardSet {
    numeric: Vec<Shard>,
    text: Shard,
}

impl ShardSet {
    /// Build the dispatch table once from configuration.
    pub fn new(config: &RelationalConfig) -> Self {
        let numeric = (1..=MAX_WIDTH)
            .map(|width| Shard {
                kind: ShardKind::Numeric { width },
                table: format!("{}{}", config.shard_prefix, width),
            })
            .collect();
        let text = Shard {
            kind: ShardKind::Text,
            table: config.text_shard.clone(),
        };
        Self { numeric, text }
    }

    /// Select the shard for a property's declared dimensions. Text-valued
    /// properties (first dimension text-kinded) route to the text shard and
    /// must be single-dimensional; numeric widths must fall in 1..=15.
    pub fn for_dimensions(&self, dimensions: &[Dimension]) -> Result<&Shard> {
        let text_valued = dimensions
            .first()
            .map(|d| d.kind == DimensionKind::Text)
            .unwrap_or(false);

        if text_valued {
            if dimensions.len() != 1 {
                return Err(StratumError::Schema(format!(
                    "text-valued properties take exactly one dimension, got {}",
                    dimensions.len()
                )));
            }
            return Ok(&self.text);
        }

        self.for_width(dimensions.len())
    }

    /// Select the numeric shard for a dimension count.
    pub fn for_width(&self, width: usize) -> Result<&Shard> {
        if width == 0 || width > MAX_WIDTH {
            return Err(StratumError::Schema(format!(
                "unsupported dimension count: {}",
                width
            )));
        }
        Ok(&self.numeric[width - 1])
    }

    pub fn text(&self) -> &Shard {
        &self.text
    }
}

impl Default for ShardSet {
    fn default() -> Self {
        Self::new(&RelationalConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
