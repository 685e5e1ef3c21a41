//! Stratum Types - Core Data Types
//!
//! Fundamental data types for the Stratum property store. A property is a
//! declared, typed, multi-dimensional measurement stream attached to an
//! entity; its raw value rows flow through a transient buffer that is
//! consumed once per ingestion call.
//!
//! Key Features:
//! - Type-safe identifiers (EntityId, PropertyId, IndexId)
//! - Dimension descriptors with numeric/text kinds
//! - Untagged measurement values matching wire-level rows
//! - Serialization support via serde
//!
//! @version 0.1.0
//! @author Stratum Development Team

use serde::{Deserialize, Serialize};

use crate::utils;

// =============================================================================
// Identifier Types
// =============================================================================

/// Unique identifier for an entity (thing, person, or interaction).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a property, derived from its name when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl PropertyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a display name (slug plus a short suffix).
    pub fn from_name(name: &str) -> Self {
        Self(utils::to_id(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Internal numeric handle assigned by the relational store at creation.
/// Stable for the life of the property; addresses its shard rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub i64);

impl std::fmt::Display for IndexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Measurement Values
// =============================================================================

/// A single cell of a value row. Rows are heterogenous on the wire
/// (`[timestamp, v1, v2, ...]`), so the representation stays untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Attempts to read this cell as a millisecond timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// A raw value row: `[timestamp?, v1, v2, ...]`. The timestamp is implicit
/// (filled server-side) when the length equals the dimension count.
pub type RawRow = Vec<Value>;

// =============================================================================
// Dimensions
// =============================================================================

/// Storage kind of a dimension's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    #[default]
    Numeric,
    Text,
}

/// One named, unit-tagged scalar channel within a property's value rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub kind: DimensionKind,
}

impl Dimension {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind: DimensionKind::Numeric,
        }
    }

    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: String::new(),
            kind: DimensionKind::Text,
        }
    }
}

// =============================================================================
// Classes
// =============================================================================

/// A named label attached to a CLASS-typed property. The integer value is
/// what appears in the property's value rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub value: i64,
    pub property_id: Option<PropertyId>,
}

impl Class {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value: 0,
            property_id: None,
        }
    }
}

// =============================================================================
// Property
// =============================================================================

/// A declared measurement stream: identity, owning entity, dimension list,
/// and a transient buffer of raw rows awaiting ingestion.
///
/// `dimensions` is the positional contract for value rows and is never
/// reordered or resized after the property is created in the relational
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub classes: Vec<Class>,
    pub entity_id: Option<EntityId>,
    pub index_id: Option<IndexId>,
    pub registered_at: Option<i64>,
    #[serde(default)]
    pub values: Vec<RawRow>,
}

impl Property {
    /// Create a property with an explicit id.
    pub fn new(id: impl Into<PropertyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            type_name: String::new(),
            dimensions: Vec::new(),
            classes: Vec::new(),
            entity_id: None,
            index_id: None,
            registered_at: None,
            values: Vec::new(),
        }
    }

    /// Create a property whose id is derived from its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = PropertyId::from_name(&name);
        Self::new(id, name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_entity(mut self, entity_id: impl Into<EntityId>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn add_dimension(&mut self, dimension: Dimension) {
        self.dimensions.push(dimension);
    }

    pub fn add_class(&mut self, class: Class) {
        self.classes.push(class);
    }

    /// Append raw rows to the transient ingestion buffer.
    pub fn add_values(&mut self, rows: Vec<RawRow>) {
        self.values.extend(rows);
    }

    /// Number of declared dimensions; determines the shard at creation.
    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// True when the first dimension is text-kinded (routes to the text
    /// shard instead of a fixed-width numeric shard).
    pub fn is_text_valued(&self) -> bool {
        self.dimensions
            .first()
            .map(|d| d.kind == DimensionKind::Text)
            .unwrap_or(false)
    }

    /// Drain the transient value buffer; it is consumed once per
    /// ingestion call.
    pub fn take_values(&mut self) -> Vec<RawRow> {
        std::mem::take(&mut self.values)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_id_from_name() {
        let id = PropertyId::from_name("My Accelerometer");
        assert!(id.as_str().starts_with("my-accelerometer-"));
    }

    #[test]
    fn test_value_as_timestamp() {
        assert_eq!(Value::Integer(1000).as_timestamp(), Some(1000));
        assert_eq!(Value::Float(1000.7).as_timestamp(), Some(1000));
        assert_eq!(Value::Text("x".to_string()).as_timestamp(), None);
    }

    #[test]
    fn test_value_untagged_serde() {
        let row: RawRow = vec![Value::Integer(1000), Value::Float(1.5), Value::Text("a".into())];
        let json = serde_json::to_string(&row).expect("row serializes");
        assert_eq!(json, r#"[1000,1.5,"a"]"#);

        let back: RawRow = serde_json::from_str(&json).expect("row deserializes");
        assert_eq!(back, row);
    }

    #[test]
    fn test_text_valued_property() {
        let mut property = Property::new("notes-1", "Notes").with_type("TEXT");
        property.add_dimension(Dimension::text("Text", ""));
        assert!(property.is_text_valued());

        let numeric = Property::new("speed-1", "Speed")
            .with_dimensions(vec![Dimension::new("Speed", "", "")]);
        assert!(!numeric.is_text_valued());
    }

    #[test]
    fn test_take_values_drains_buffer() {
        let mut property = Property::new("p1", "P1");
        property.add_values(vec![vec![Value::Integer(1000), Value::Float(1.0)]]);
        let rows = property.take_values();
        assert_eq!(rows.len(), 1);
        assert!(property.values.is_empty());
    }
}
