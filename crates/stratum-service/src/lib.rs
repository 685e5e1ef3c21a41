//! Stratum Service - Property Service Orchestration
//!
//! The service layer consumed by CRUD callers: creates properties through
//! the relational catalog, dispatches reads to the relational or time-series
//! backend, ingests value batches with lazy dimension hydration, and
//! publishes outcomes on the outbound channel.
//!
//! @version 0.1.0
//! @author Stratum Development Team

pub mod service;

pub use service::{PropertyService, ReadBackend, ReadRequest};
