//! Stratum Relational Backend Interface
//!
//! The narrow interface the relational value store consumes: a typed
//! statement model executed against a connection pool, returning either
//! result rows or an affected-row count. Statements render their SQL for
//! driver-backed adapters; the in-memory backend interprets them directly.
//! A duplicate-key violation surfaces as `Conflict`, distinguishable from
//! generic backend failure.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use async_trait::async_trait;

use stratum_common::{
    Class, Dimension, DimensionKind, EntityId, IndexId, PreparedRow, PropertyId, Result,
    StratumError, Value,
};

use crate::shard::Shard;

// =============================================================================
// Statements
// =============================================================================

/// One statement against the relational backend. Every operation the value
/// store performs is expressible here; the set is closed on purpose.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Insert the property catalog row; assigns the index id.
    InsertProperty {
        id: PropertyId,
        name: String,
        description: String,
        type_name: String,
        entity_id: EntityId,
    },
    /// Insert one row per dimension, tagged with the property's index id.
    InsertDimensions {
        index_id: IndexId,
        dimensions: Vec<Dimension>,
    },
    /// Catalog row plus dimensions for one property of one entity.
    SelectProperty {
        entity_id: EntityId,
        property_id: PropertyId,
    },
    /// Catalog rows plus dimensions for every property of an entity.
    SelectProperties { entity_id: EntityId },
    /// Index id and dimension count for a property id.
    SelectIndex { property_id: PropertyId },
    /// Metadata update; only name and description are mutable.
    UpdateProperty {
        id: PropertyId,
        name: Option<String>,
        description: Option<String>,
    },
    /// Remove the catalog row. Shard rows are not cascade-deleted.
    DeleteProperty { id: PropertyId },
    /// Idempotent value batch into one shard (insert-ignore on the
    /// `(index_id, timestamp)` key). Affected count = rows actually stored.
    InsertValues {
        shard: Shard,
        index_id: IndexId,
        rows: Vec<PreparedRow>,
    },
    /// Value rows for one property. Both bounds: `[from, to]` ascending;
    /// one bound: open-ended; none: most recent row only.
    SelectValues {
        shard: Shard,
        index_id: IndexId,
        from: Option<i64>,
        to: Option<i64>,
    },
    /// Insert-ignore class labels for a CLASS-typed property.
    InsertClasses {
        property_id: PropertyId,
        classes: Vec<Class>,
    },
    /// Class labels of a property.
    SelectClasses { property_id: PropertyId },
    /// Number of properties declared with a type.
    CountByType { type_name: String },
}

impl Statement {
    /// Render placeholder SQL for driver-backed adapters.
    pub fn sql(&self) -> String {
        match self {
            Statement::InsertProperty { .. } => "INSERT INTO `properties` \
                 (`id`, `name`, `description`, `type`, `entity_id`) VALUES (?, ?, ?, ?, ?)"
                .to_string(),
            Statement::InsertDimensions { dimensions, .. } => {
                let mut sql = "INSERT IGNORE INTO `dimensions` \
                     (`name`, `description`, `unit`, `kind`, `property_index_id`) VALUES "
                    .to_string();
                sql.push_str(&placeholder_tuples(dimensions.len(), 5));
                sql
            }
            Statement::SelectProperty { .. } => "SELECT p.`id`, p.`name`, p.`description`, \
                 p.`type`, p.`registered_at`, p.`entity_id`, \
                 d.`name`, d.`description`, d.`unit`, d.`kind` \
                 FROM `properties` p \
                 JOIN `dimensions` d ON p.`index_id` = d.`property_index_id` \
                 WHERE p.`entity_id` = ? AND p.`id` = ?"
                .to_string(),
            Statement::SelectProperties { .. } => "SELECT p.`id`, p.`name`, p.`description`, \
                 p.`type`, p.`registered_at`, p.`entity_id`, \
                 d.`name`, d.`description`, d.`unit`, d.`kind` \
                 FROM `properties` p \
                 JOIN `dimensions` d ON p.`index_id` = d.`property_index_id` \
                 WHERE p.`entity_id` = ? \
                 ORDER BY p.`name`"
                .to_string(),
            Statement::SelectIndex { .. } => "SELECT p.`index_id`, COUNT(*) AS `num_dimensions` \
                 FROM `properties` p \
                 JOIN `dimensions` d ON p.`index_id` = d.`property_index_id` \
                 WHERE p.`id` = ? \
                 GROUP BY p.`index_id`"
                .to_string(),
            Statement::UpdateProperty { name, description, .. } => {
                let mut sets = Vec::new();
                if name.is_some() {
                    sets.push("`name` = ?");
                }
                if description.is_some() {
                    sets.push("`description` = ?");
                }
                format!(
                    "UPDATE `properties` SET {} WHERE `id` = ?",
                    sets.join(", ")
                )
            }
            Statement::DeleteProperty { .. } => {
                "DELETE FROM `properties` WHERE `id` = ?".to_string()
            }
            Statement::InsertValues { shard, rows, .. } => {
                let mut sql = format!(
                    "INSERT IGNORE INTO `{}` (`property_index_id`, `timestamp`",
                    shard.table
                );
                for index in 1..=shard.width() {
                    sql.push_str(&format!(", `value{}`", index));
                }
                sql.push_str(") VALUES ");
                sql.push_str(&placeholder_tuples(rows.len(), shard.width() + 2));
                sql
            }
            Statement::SelectValues { shard, from, to, .. } => {
                let mut sql = "SELECT `timestamp`".to_string();
                for index in 1..=shard.width() {
                    sql.push_str(&format!(", `value{}`", index));
                }
                sql.push_str(&format!(
                    " FROM `{}` WHERE `property_index_id` = ?",
                    shard.table
                ));
                match (from, to) {
                    (Some(_), Some(_)) => {
                        sql.push_str(" AND `timestamp` BETWEEN ? AND ? ORDER BY `timestamp`")
                    }
                    (Some(_), None) => sql.push_str(" AND `timestamp` >= ? ORDER BY `timestamp`"),
                    (None, Some(_)) => sql.push_str(" AND `timestamp` <= ? ORDER BY `timestamp`"),
                    (None, None) => sql.push_str(" ORDER BY `timestamp` DESC LIMIT 1"),
                }
                sql
            }
            Statement::InsertClasses { classes, .. } => {
                let mut sql = "INSERT IGNORE INTO `classes` \
                     (`name`, `description`, `value`, `property_id`) VALUES "
                    .to_string();
                sql.push_str(&placeholder_tuples(classes.len(), 4));
                sql
            }
            Statement::SelectClasses { .. } => "SELECT `name`, `description`, `value` \
                 FROM `classes` WHERE `property_id` = ?"
                .to_string(),
            Statement::CountByType { .. } => "SELECT COUNT(*) AS `num_properties` \
                 FROM `properties` p WHERE p.`type` = ?"
                .to_string(),
        }
    }

    /// Flattened parameter list matching the placeholders of `sql()`.
    pub fn params(&self) -> Vec<Value> {
        match self {
            Statement::InsertProperty {
                id,
                name,
                description,
                type_name,
                entity_id,
            } => vec![
                Value::Text(id.0.clone()),
                Value::Text(name.clone()),
                Value::Text(description.clone()),
                Value::Text(type_name.clone()),
                Value::Text(entity_id.0.clone()),
            ],
            Statement::InsertDimensions { index_id, dimensions } => dimensions
                .iter()
                .flat_map(|d| {
                    vec![
                        Value::Text(d.name.clone()),
                        Value::Text(d.description.clone()),
                        Value::Text(d.unit.clone()),
                        Value::Text(kind_label(d.kind).to_string()),
                        Value::Integer(index_id.0),
                    ]
                })
                .collect(),
            Statement::SelectProperty { entity_id, property_id } => vec![
                Value::Text(entity_id.0.clone()),
                Value::Text(property_id.0.clone()),
            ],
            Statement::SelectProperties { entity_id } => vec![Value::Text(entity_id.0.clone())],
            Statement::SelectIndex { property_id } => vec![Value::Text(property_id.0.clone())],
            Statement::UpdateProperty { id, name, description } => {
                let mut params = Vec::new();
                if let Some(name) = name {
                    params.push(Value::Text(name.clone()));
                }
                if let Some(description) = description {
                    params.push(Value::Text(description.clone()));
                }
                params.push(Value::Text(id.0.clone()));
                params
            }
            Statement::DeleteProperty { id } => vec![Value::Text(id.0.clone())],
            Statement::InsertValues { index_id, rows, .. } => rows
                .iter()
                .flat_map(|row| {
                    let mut params = vec![Value::Integer(index_id.0), Value::Integer(row.timestamp)];
                    params.extend(row.fields.iter().cloned());
                    params
                })
                .collect(),
            Statement::SelectValues { index_id, from, to, .. } => {
                let mut params = vec![Value::Integer(index_id.0)];
                if let Some(from) = from {
                    params.push(Value::Integer(*from));
                }
                if let Some(to) = to {
                    params.push(Value::Integer(*to));
                }
                params
            }
            Statement::InsertClasses { property_id, classes } => classes
                .iter()
                .flat_map(|c| {
                    vec![
                        Value::Text(c.name.clone()),
                        Value::Text(c.description.clone()),
                        Value::Integer(c.value),
                        Value::Text(property_id.0.clone()),
                    ]
                })
                .collect(),
            Statement::SelectClasses { property_id } => vec![Value::Text(property_id.0.clone())],
            Statement::CountByType { type_name } => vec![Value::Text(type_name.clone())],
        }
    }
}

fn placeholder_tuples(count: usize, arity: usize) -> String {
    let tuple = format!("({})", vec!["?"; arity].join(", "));
    vec![tuple; count].join(", ")
}

pub(crate) fn kind_label(kind: DimensionKind) -> &'static str {
    match kind {
        DimensionKind::Numeric => "numeric",
        DimensionKind::Text => "text",
    }
}

pub(crate) fn kind_from_label(label: &str) -> DimensionKind {
    if label == "text" {
        DimensionKind::Text
    } else {
        DimensionKind::Numeric
    }
}

// =============================================================================
// Results
// =============================================================================

/// A result row as positional values.
pub type Row = Vec<Value>;

/// Outcome of a statement execution.
#[derive(Debug, Clone)]
pub enum ExecuteResult {
    Rows(Vec<Row>),
    Affected {
        count: u64,
        last_insert_id: Option<i64>,
    },
}

impl ExecuteResult {
    /// Expect result rows; anything else is a backend contract violation.
    pub fn rows(self) -> Result<Vec<Row>> {
        match self {
            ExecuteResult::Rows(rows) => Ok(rows),
            ExecuteResult::Affected { .. } => Err(StratumError::Backend(
                "expected rows, got affected count".to_string(),
            )),
        }
    }

    /// Expect an affected-row count.
    pub fn affected(self) -> Result<u64> {
        match self {
            ExecuteResult::Affected { count, .. } => Ok(count),
            ExecuteResult::Rows(_) => Err(StratumError::Backend(
                "expected affected count, got rows".to_string(),
            )),
        }
    }

    /// Expect an insert that assigned a new key.
    pub fn last_insert_id(self) -> Result<i64> {
        match self {
            ExecuteResult::Affected {
                last_insert_id: Some(id),
                ..
            } => Ok(id),
            _ => Err(StratumError::Backend(
                "backend did not report an insert id".to_string(),
            )),
        }
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// The connection-pool-backed executor the value store talks to. Implemented
/// outside this core for real databases; `MemoryBackend` implements it for
/// tests and embedded use.
#[async_trait]
pub trait RelationalBackend: Send + Sync {
    async fn execute(&self, statement: Statement) -> Result<ExecuteResult>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::ShardSet;

    #[test]
    fn test_insert_values_sql() {
        let shards = ShardSet::default();
        let statement = Statement::InsertValues {
            shard: shards.for_width(3).expect("width 3").clone(),
            index_id: IndexId(7),
            rows: vec![PreparedRow {
                timestamp: 1000,
                fields: vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
                stamped: false,
            }],
        };
        assert_eq!(
            statement.sql(),
            "INSERT IGNORE INTO `d3` (`property_index_id`, `timestamp`, `value1`, `value2`, \
             `value3`) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            statement.params(),
            vec![
                Value::Integer(7),
                Value::Integer(1000),
                Value::Float(1.0),
                Value::Float(2.0),
                Value::Float(3.0),
            ]
        );
    }

    #[test]
    fn test_select_values_sql_variants() {
        let shards = ShardSet::default();
        let shard = shards.for_width(1).expect("width 1").clone();

        let point = Statement::SelectValues {
            shard: shard.clone(),
            index_id: IndexId(1),
            from: None,
            to: None,
        };
        assert!(point.sql().ends_with("ORDER BY `timestamp` DESC LIMIT 1"));

        let range = Statement::SelectValues {
            shard,
            index_id: IndexId(1),
            from: Some(0),
            to: Some(10),
        };
        assert!(range.sql().contains("BETWEEN ? AND ? ORDER BY `timestamp`"));
        assert_eq!(
            range.params(),
            vec![Value::Integer(1), Value::Integer(0), Value::Integer(10)]
        );
    }

    #[test]
    fn test_select_index_sql() {
        let statement = Statement::SelectIndex {
            property_id: PropertyId::new("p1"),
        };
        let sql = statement.sql();
        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("GROUP BY p.`index_id`"));
    }

    #[test]
    fn test_update_property_sql_partial() {
        let statement = Statement::UpdateProperty {
            id: PropertyId::new("p1"),
            name: Some("New".to_string()),
            description: None,
        };
        assert_eq!(statement.sql(), "UPDATE `properties` SET `name` = ? WHERE `id` = ?");
        assert_eq!(
            statement.params(),
            vec![Value::Text("New".to_string()), Value::Text("p1".to_string())]
        );
    }
}
