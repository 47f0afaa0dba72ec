//! Flattening entities into column-keyed rows for the write path.
//!
//! The flattener is chosen when a write repository is built:
//! [`MappingFlattener`] uses the hand-written [`Mapping::to_row`], while
//! [`SerdeFlattener`] serializes the entity and walks the resulting object,
//! joining nested keys with dots (`registeredOn.date`) before resolving them
//! through [`Mapping::map`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::CriteriaError;
use crate::mapping::Mapping;
use crate::scalar::{Row, Scalar};

pub trait Flattener<M: Mapping>: Send + Sync {
    /// Column-keyed values to write for `entity`.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnflattenableEntity`] when the entity cannot
    /// provide a value for a mapped property.
    fn flatten(&self, mapping: &M, entity: &M::Entity) -> Result<Row, CriteriaError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MappingFlattener;

impl<M: Mapping> Flattener<M> for MappingFlattener {
    fn flatten(&self, mapping: &M, entity: &M::Entity) -> Result<Row, CriteriaError> {
        Ok(mapping.to_row(entity))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SerdeFlattener;

impl<M> Flattener<M> for SerdeFlattener
where
    M: Mapping,
    M::Entity: Serialize,
{
    fn flatten(&self, mapping: &M, entity: &M::Entity) -> Result<Row, CriteriaError> {
        let unflattenable = |reason: String| CriteriaError::UnflattenableEntity {
            table: mapping.name().to_owned(),
            reason,
        };

        let value = serde_json::to_value(entity).map_err(|e| unflattenable(e.to_string()))?;
        let mut flat = IndexMap::new();
        flatten_into(String::new(), value, &mut flat);

        let mut row = Row::new();
        for (property, column) in mapping.map().iter() {
            let value = flat
                .swap_remove(property)
                .ok_or_else(|| unflattenable(format!("property `{property}` is not exposed")))?;
            row.insert(column, value);
        }
        Ok(row)
    }
}

fn flatten_into(prefix: String, value: Value, out: &mut IndexMap<String, Scalar>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(path, nested, out);
            }
        }
        scalar => {
            out.insert(prefix, Scalar::from_json(scalar));
        }
    }
}
