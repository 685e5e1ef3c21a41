//! Stratum In-Memory Relational Backend
//!
//! Interprets the typed statement model directly against in-process tables.
//! Honors the same contracts a driver-backed adapter would: uniqueness on
//! the property catalog id (surfacing `Conflict`), insert-ignore on the
//! `(index_id, timestamp)` value key, and auto-assigned index ids. One
//! statement executes under one lock, so a value batch is atomic.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use stratum_common::{utils, DimensionKind, Result, StratumError, Value};

use crate::backend::{kind_label, ExecuteResult, RelationalBackend, Row, Statement};

// =============================================================================
// Table Rows
// =============================================================================

#[derive(Debug, Clone)]
struct PropertyRow {
    id: String,
    name: String,
    description: String,
    type_name: String,
    entity_id: String,
    index_id: i64,
    registered_at: i64,
}

#[derive(Debug, Clone)]
struct DimensionRow {
    index_id: i64,
    name: String,
    description: String,
    unit: String,
    kind: DimensionKind,
}

#[derive(Debug, Clone)]
struct ClassRow {
    property_id: String,
    name: String,
    description: String,
    value: i64,
}

#[derive(Default)]
struct Tables {
    properties: Vec<PropertyRow>,
    dimensions: Vec<DimensionRow>,
    classes: Vec<ClassRow>,
    /// Shard table name -> `(index_id, timestamp)` -> field values.
    shards: HashMap<String, BTreeMap<(i64, i64), Vec<Value>>>,
    next_index_id: i64,
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-memory implementation of the relational backend interface.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held by one shard table.
    pub fn shard_len(&self, table: &str) -> usize {
        let tables = self.tables.read();
        tables.shards.get(table).map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RelationalBackend for MemoryBackend {
    async fn execute(&self, statement: Statement) -> Result<ExecuteResult> {
        let mut tables = self.tables.write();

        match statement {
            Statement::InsertProperty {
                id,
                name,
                description,
                type_name,
                entity_id,
            } => {
                if tables.properties.iter().any(|p| p.id == id.0) {
                    return Err(StratumError::Conflict(id.0));
                }
                tables.next_index_id += 1;
                let index_id = tables.next_index_id;
                tables.properties.push(PropertyRow {
                    id: id.0,
                    name,
                    description,
                    type_name,
                    entity_id: entity_id.0,
                    index_id,
                    registered_at: utils::now_millis(),
                });
                Ok(ExecuteResult::Affected {
                    count: 1,
                    last_insert_id: Some(index_id),
                })
            }

            Statement::InsertDimensions { index_id, dimensions } => {
                let count = dimensions.len() as u64;
                for dimension in dimensions {
                    tables.dimensions.push(DimensionRow {
                        index_id: index_id.0,
                        name: dimension.name,
                        description: dimension.description,
                        unit: dimension.unit,
                        kind: dimension.kind,
                    });
                }
                Ok(ExecuteResult::Affected {
                    count,
                    last_insert_id: None,
                })
            }

            Statement::SelectProperty { entity_id, property_id } => {
                let rows = tables
                    .properties
                    .iter()
                    .filter(|p| p.entity_id == entity_id.0 && p.id == property_id.0)
                    .flat_map(|p| join_rows(p, &tables.dimensions))
                    .collect();
                Ok(ExecuteResult::Rows(rows))
            }

            Statement::SelectProperties { entity_id } => {
                let mut properties: Vec<&PropertyRow> = tables
                    .properties
                    .iter()
                    .filter(|p| p.entity_id == entity_id.0)
                    .collect();
                properties.sort_by(|a, b| a.name.cmp(&b.name));
                let rows = properties
                    .into_iter()
                    .flat_map(|p| join_rows(p, &tables.dimensions))
                    .collect();
                Ok(ExecuteResult::Rows(rows))
            }

            Statement::SelectIndex { property_id } => {
                let rows = tables
                    .properties
                    .iter()
                    .filter(|p| p.id == property_id.0)
                    .filter_map(|p| {
                        let num_dimensions = tables
                            .dimensions
                            .iter()
                            .filter(|d| d.index_id == p.index_id)
                            .count();
                        if num_dimensions == 0 {
                            return None;
                        }
                        Some(vec![
                            Value::Integer(p.index_id),
                            Value::Integer(num_dimensions as i64),
                        ])
                    })
                    .collect();
                Ok(ExecuteResult::Rows(rows))
            }

            Statement::UpdateProperty { id, name, description } => {
                let mut count = 0;
                if let Some(row) = tables.properties.iter_mut().find(|p| p.id == id.0) {
                    if let Some(name) = name {
                        row.name = name;
                    }
                    if let Some(description) = description {
                        row.description = description;
                    }
                    count = 1;
                }
                Ok(ExecuteResult::Affected {
                    count,
                    last_insert_id: None,
                })
            }

            Statement::DeleteProperty { id } => {
                let before = tables.properties.len();
                tables.properties.retain(|p| p.id != id.0);
                Ok(ExecuteResult::Affected {
                    count: (before - tables.properties.len()) as u64,
                    last_insert_id: None,
                })
            }

            Statement::InsertValues { shard, index_id, rows } => {
                let table = tables.shards.entry(shard.table.clone()).or_default();
                let mut stored = 0;
                for row in rows {
                    let key = (index_id.0, row.timestamp);
                    // Insert-ignore: an existing key is a no-op, not an overwrite.
                    if let std::collections::btree_map::Entry::Vacant(slot) = table.entry(key) {
                        slot.insert(row.fields);
                        stored += 1;
                    }
                }
                Ok(ExecuteResult::Affected {
                    count: stored,
                    last_insert_id: None,
                })
            }

            Statement::SelectValues { shard, index_id, from, to } => {
                let Some(table) = tables.shards.get(&shard.table) else {
                    return Ok(ExecuteResult::Rows(Vec::new()));
                };
                let low = (index_id.0, from.unwrap_or(i64::MIN));
                let high = (index_id.0, to.unwrap_or(i64::MAX));
                let mut rows: Vec<Row> = table
                    .range(low..=high)
                    .map(|((_, timestamp), fields)| {
                        let mut row = vec![Value::Integer(*timestamp)];
                        row.extend(fields.iter().cloned());
                        row
                    })
                    .collect();
                if from.is_none() && to.is_none() {
                    // Point read: most recent row only.
                    rows = rows.pop().into_iter().collect();
                }
                Ok(ExecuteResult::Rows(rows))
            }

            Statement::InsertClasses { property_id, classes } => {
                let mut count = 0;
                for class in classes {
                    let exists = tables
                        .classes
                        .iter()
                        .any(|c| c.property_id == property_id.0 && c.name == class.name);
                    if exists {
                        continue;
                    }
                    tables.classes.push(ClassRow {
                        property_id: property_id.0.clone(),
                        name: class.name,
                        description: class.description,
                        value: class.value,
                    });
                    count += 1;
                }
                Ok(ExecuteResult::Affected {
                    count,
                    last_insert_id: None,
                })
            }

            Statement::SelectClasses { property_id } => {
                let rows = tables
                    .classes
                    .iter()
                    .filter(|c| c.property_id == property_id.0)
                    .map(|c| {
                        vec![
                            Value::Text(c.name.clone()),
                            Value::Text(c.description.clone()),
                            Value::Integer(c.value),
                        ]
                    })
                    .collect();
                Ok(ExecuteResult::Rows(rows))
            }

            Statement::CountByType { type_name } => {
                let count = tables
                    .properties
                    .iter()
                    .filter(|p| p.type_name == type_name)
                    .count();
                Ok(ExecuteResult::Rows(vec![vec![Value::Integer(count as i64)]]))
            }
        }
    }
}

/// One join row per dimension, column layout matching `SelectProperty`.
fn join_rows(property: &PropertyRow, dimensions: &[DimensionRow]) -> Vec<Row> {
    dimensions
        .iter()
        .filter(|d| d.index_id == property.index_id)
        .map(|d| {
            vec![
                Value::Text(property.id.clone()),
                Value::Text(property.name.clone()),
                Value::Text(property.description.clone()),
                Value::Text(property.type_name.clone()),
                Value::Integer(property.registered_at),
                Value::Text(property.entity_id.clone()),
                Value::Text(d.name.clone()),
                Value::Text(d.description.clone()),
                Value::Text(d.unit.clone()),
                Value::Text(kind_label(d.kind).to_string()),
            ]
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
