//! Typed storage values and column-keyed rows.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One storage value.
///
/// `Null` doubles as the "not yet assigned" identity of entities whose
/// identity is generated by the storage engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Integer view. Booleans read as `0`/`1` since that is how they are stored.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Bool(b) => Some(i64::from(*b)),
            Scalar::Text(s) => s.parse().ok(),
            Scalar::Null | Scalar::Float(_) => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Text(s) => s.parse().ok(),
            Scalar::Null | Scalar::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(0) => Some(false),
            Scalar::Int(1) => Some(true),
            _ => None,
        }
    }

    /// The value as it should be bound into a statement.
    ///
    /// Relational engines store booleans as integers, so `Bool` becomes `Int(0|1)`.
    #[must_use]
    pub fn bindable(&self) -> Scalar {
        match self {
            Scalar::Bool(b) => Scalar::Int(i64::from(*b)),
            other => other.clone(),
        }
    }

    /// Representation-independent key used to compare identities read back
    /// from storage with identities held by entities (`1` and `"1"` agree).
    #[must_use]
    pub fn identity_key(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Convert a decoded JSON value into a scalar.
    ///
    /// Integral numbers become `Int`, other numbers `Float`. Arrays and objects
    /// have no scalar form and are kept as their JSON text.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Scalar {
        use serde_json::Value;

        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => n.as_f64().map_or(Scalar::Null, Scalar::Float),
            },
            Value::String(s) => Scalar::Text(s),
            other @ (Value::Array(_) | Value::Object(_)) => Scalar::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("NULL"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Scalar::Null, Into::into)
    }
}

/// A storage row: column name to value, in column order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Scalar>);

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(column.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.0.get(column)
    }

    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Scalar::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Scalar::as_f64)
    }

    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Scalar::as_str)
    }

    #[must_use]
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Scalar::as_bool)
    }

    pub fn remove(&mut self, column: &str) -> Option<Scalar> {
        self.0.shift_remove(column)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a row from a decoded JSON object. Non-object values give an empty row.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, Scalar::from_json(v)))
                .collect(),
            _ => Self::new(),
        }
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Row {
    type Item = (String, Scalar);
    type IntoIter = indexmap::map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_keep_integers_integral() {
        assert_eq!(Scalar::from_json(json!(4)), Scalar::Int(4));
        assert_eq!(Scalar::from_json(json!(5.55)), Scalar::Float(5.55));
        assert_eq!(Scalar::from_json(json!(null)), Scalar::Null);
        assert_eq!(
            Scalar::from_json(json!({"a": 1})),
            Scalar::Text(r#"{"a":1}"#.to_owned())
        );
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(Scalar::Bool(true).bindable(), Scalar::Int(1));
        assert_eq!(Scalar::Bool(false).bindable(), Scalar::Int(0));
        assert_eq!(Scalar::from("x").bindable(), Scalar::from("x"));
        assert_eq!(Scalar::Int(1).as_bool(), Some(true));
    }

    #[test]
    fn identity_keys_ignore_representation() {
        assert_eq!(Scalar::Int(7).identity_key(), Scalar::from("7").identity_key());
        assert_ne!(Scalar::Int(7).identity_key(), Scalar::Int(8).identity_key());
    }

    #[test]
    fn row_preserves_column_order() {
        let row = Row::from_json(json!({
            "customer_id": 1,
            "customer_name": "John Doe",
            "total_earnings": 5.55
        }));
        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, ["customer_id", "customer_name", "total_earnings"]);
        assert_eq!(row.get_i64("customer_id"), Some(1));
        assert_eq!(row.get_str("customer_name"), Some("John Doe"));
        assert!(Row::from_json(json!([1, 2])).is_empty());
    }
}
