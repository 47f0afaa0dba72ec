//! The property/column contract for one entity type.
//!
//! A [`Mapping`] names the table, its identity column and the ordered
//! property to column dictionary every filter, sort and projection is
//! resolved against. It is built once per entity type and shared read-only.
//!
//! ```
//! use repokit_criteria::{Identity, Mapping, PropertyMap, Row, Scalar};
//!
//! struct Tag { id: i64, label: String }
//!
//! impl Identity for Tag {
//!     fn id(&self) -> Scalar { self.id.into() }
//! }
//!
//! struct TagMapping { map: PropertyMap }
//!
//! impl Mapping for TagMapping {
//!     type Entity = Tag;
//!
//!     fn name(&self) -> &str { "tags" }
//!     fn identity(&self) -> &str { "tag_id" }
//!     fn map(&self) -> &PropertyMap { &self.map }
//!
//!     fn to_row(&self, tag: &Tag) -> Row {
//!         Row::new().with("tag_id", tag.id).with("label", tag.label.as_str())
//!     }
//!
//!     fn from_row(&self, row: &Row) -> Option<Tag> {
//!         Some(Tag {
//!             id: row.get_i64("tag_id")?,
//!             label: row.get_str("label").unwrap_or_default().to_owned(),
//!         })
//!     }
//! }
//!
//! let mapping = TagMapping {
//!     map: PropertyMap::new().with("id", "tag_id").with("label", "label"),
//! };
//! assert_eq!(mapping.identity_property().unwrap(), "id");
//! ```

use indexmap::IndexMap;

use crate::error::CriteriaError;
use crate::scalar::{Row, Scalar};

/// Anything carrying a single storage identity.
///
/// `Scalar::Null` means "not assigned yet".
pub trait Identity: Send + Sync {
    fn id(&self) -> Scalar;
}

impl Identity for Scalar {
    fn id(&self) -> Scalar {
        self.clone()
    }
}

impl Identity for i64 {
    fn id(&self) -> Scalar {
        Scalar::Int(*self)
    }
}

impl Identity for String {
    fn id(&self) -> Scalar {
        Scalar::Text(self.clone())
    }
}

impl Identity for &str {
    fn id(&self) -> Scalar {
        Scalar::Text((*self).to_owned())
    }
}

/// Ordered property name to column name dictionary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: IndexMap<String, String>,
}

impl PropertyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, property: impl Into<String>, column: impl Into<String>) -> Self {
        self.insert(property, column);
        self
    }

    pub fn insert(&mut self, property: impl Into<String>, column: impl Into<String>) {
        self.entries.insert(property.into(), column.into());
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries.get(property).map(String::as_str)
    }

    /// Resolve a property to its column.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnmappedProperty`] when the property is not mapped.
    pub fn column(&self, property: &str) -> Result<&str, CriteriaError> {
        self.get(property)
            .ok_or_else(|| CriteriaError::UnmappedProperty {
                property: property.to_owned(),
            })
    }

    /// Reverse lookup: the first property stored in `column`.
    #[must_use]
    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(p, _)| p.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

/// Storage contract of one entity type.
pub trait Mapping: Send + Sync + 'static {
    type Entity: Identity + Send + Sync;

    /// Table (or collection) name.
    fn name(&self) -> &str;

    /// Name of the identity column.
    fn identity(&self) -> &str;

    /// Property to column dictionary, in declaration order.
    fn map(&self) -> &PropertyMap;

    /// Whether storage assigns the identity on insert.
    fn auto_generate_id(&self) -> bool {
        false
    }

    /// Column-keyed values of `entity`.
    fn to_row(&self, entity: &Self::Entity) -> Row;

    /// Rebuild an entity from a stored row. An empty row yields `None`.
    fn from_row(&self, row: &Row) -> Option<Self::Entity>;

    /// The property whose column is the identity column.
    ///
    /// # Errors
    /// Returns [`CriteriaError::MissingPrimaryKeyMapping`] when no property maps to it.
    fn identity_property(&self) -> Result<&str, CriteriaError> {
        self.map()
            .property_for_column(self.identity())
            .ok_or_else(|| CriteriaError::MissingPrimaryKeyMapping {
                table: self.name().to_owned(),
                identity: self.identity().to_owned(),
            })
    }
}

/// Check a mapping once, before any repository uses it.
///
/// # Errors
/// Returns [`CriteriaError::MissingPrimaryKeyMapping`] when the identity
/// column cannot be reached through [`Mapping::map`].
pub fn validate<M: Mapping + ?Sized>(mapping: &M) -> Result<(), CriteriaError> {
    mapping.identity_property().map(|_| ())
}
