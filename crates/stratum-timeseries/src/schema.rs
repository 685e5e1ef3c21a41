//! Stratum Measurement Schemas
//!
//! Every property type written to the time-series backend needs a
//! pre-registered measurement schema (field names and kinds). A write for
//! an unregistered type is a schema error; the relational store remains the
//! fallback for such properties.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stratum_common::DimensionKind;

// =============================================================================
// Field Definitions
// =============================================================================

/// Storage kind of a measurement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Float,
    Text,
}

/// One named field of a measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

// =============================================================================
// Measurement Schema
// =============================================================================

/// Schema for one measurement: the property type name, one field per
/// dimension, and the identifying tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSchema {
    pub measurement: String,
    pub fields: Vec<FieldDef>,
    pub tags: Vec<String>,
}

impl MeasurementSchema {
    pub fn new(measurement: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            measurement: measurement.into(),
            fields,
            tags: vec!["entity_id".to_string(), "property_id".to_string()],
        }
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

// =============================================================================
// Schema Registry
// =============================================================================

/// Registry of measurement schemas, keyed by property type.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, MeasurementSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every catalog type: the measurement is
    /// the type key, with one field per canonical dimension.
    pub fn with_catalog_types() -> Self {
        let mut registry = Self::new();
        for spec in stratum_catalog::types() {
            let fields = spec
                .dimensions
                .iter()
                .map(|dimension| FieldDef {
                    name: dimension.name.clone(),
                    kind: match dimension.kind {
                        DimensionKind::Numeric => FieldKind::Float,
                        DimensionKind::Text => FieldKind::Text,
                    },
                })
                .collect();
            registry.register(MeasurementSchema::new(spec.key, fields));
        }
        registry
    }

    pub fn register(&mut self, schema: MeasurementSchema) {
        self.schemas.insert(schema.measurement.clone(), schema);
    }

    pub fn get(&self, measurement: &str) -> Option<&MeasurementSchema> {
        self.schemas.get(measurement)
    }

    pub fn contains(&self, measurement: &str) -> bool {
        self.schemas.contains_key(measurement)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_types_are_registered() {
        let registry = SchemaRegistry::with_catalog_types();
        assert!(registry.len() >= 30);

        let schema = registry.get("THREE_DIMENSIONS").expect("registered");
        assert_eq!(schema.width(), 3);
        assert_eq!(schema.fields[0].name, "Value1");
        assert_eq!(schema.fields[0].kind, FieldKind::Float);
        assert_eq!(schema.tags, vec!["entity_id", "property_id"]);
    }

    #[test]
    fn test_text_type_has_text_field() {
        let registry = SchemaRegistry::with_catalog_types();
        let schema = registry.get("TEXT").expect("registered");
        assert_eq!(schema.fields[0].kind, FieldKind::Text);
    }

    #[test]
    fn test_unregistered_type_absent() {
        let registry = SchemaRegistry::with_catalog_types();
        assert!(!registry.contains("WARP_FIELD"));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = SchemaRegistry::new();
        registry.register(MeasurementSchema::new(
            "CUSTOM",
            vec![FieldDef {
                name: "level".to_string(),
                kind: FieldKind::Float,
            }],
        ));
        assert!(registry.contains("CUSTOM"));
    }
}
