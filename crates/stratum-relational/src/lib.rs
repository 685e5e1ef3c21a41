//! Stratum Relational - Relational Value Store
//!
//! Persists arbitrarily-shaped measurement streams into a fixed relational
//! schema by sharding on dimensionality: one fixed-width table per supported
//! dimension count (1-15) plus a dedicated text-valued table. Ingestion is
//! idempotent (insert-ignore on the `(index_id, timestamp)` key) and every
//! write returns a structured ingestion report.
//!
//! Key Features:
//! - Typed statement model with SQL rendering for the backend interface
//! - Shard dispatch table built once at startup over the closed width range
//! - Read-through dimension-index cache with process lifetime
//! - In-memory backend honoring insert-ignore and uniqueness semantics
//!
//! @version 0.1.0
//! @author Stratum Development Team

pub mod backend;
pub mod memory;
pub mod resolver;
pub mod shard;
pub mod store;

pub use backend::{ExecuteResult, RelationalBackend, Row, Statement};
pub use memory::MemoryBackend;
pub use resolver::{DimensionIndexCache, DimensionIndexResolver, IndexEntry};
pub use shard::{Shard, ShardKind, ShardSet};
pub use store::RelationalValueStore;
