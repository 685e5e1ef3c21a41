//! Stratum Common - Shared Types and Utilities
//!
//! Foundational types, error handling, and configuration used across all
//! Stratum property-store components. Provides the core abstractions shared
//! by the relational and time-series value stores and the service layer.
//!
//! Key Features:
//! - Unified error types with retryable error detection
//! - Core data types (Property, Dimension, Value, IngestionReport)
//! - Row-shape classification shared by both storage backends
//! - Configuration structures for all components
//!
//! @version 0.1.0
//! @author Stratum Development Team

pub mod config;
pub mod error;
pub mod ingest;
pub mod types;
pub mod utils;

pub use error::{Result, StratumError};
pub use ingest::{BatchPlan, IngestionReport, PreparedRow};
pub use types::*;
