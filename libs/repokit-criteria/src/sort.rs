use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortDir {
    /// Reverse the sort direction (Asc <-> Desc)
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    #[must_use]
    pub fn is_ascending(self) -> bool {
        self == SortDir::Asc
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub property: String,
    pub dir: SortDir,
}

/// Ordered `(property, direction)` list.
///
/// Setting a direction for a property that is already present replaces it
/// in place, so the original position is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<SortKey>,
}

impl Sort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same direction for several properties, in the given order.
    #[must_use]
    pub fn by<P, I>(properties: I, dir: SortDir) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = P>,
    {
        let mut sort = Self::new();
        for property in properties {
            sort.set_order_for(property, dir);
        }
        sort
    }

    #[must_use]
    pub fn asc(mut self, property: impl Into<String>) -> Self {
        self.set_order_for(property, SortDir::Asc);
        self
    }

    #[must_use]
    pub fn desc(mut self, property: impl Into<String>) -> Self {
        self.set_order_for(property, SortDir::Desc);
        self
    }

    pub fn set_order_for(&mut self, property: impl Into<String>, dir: SortDir) {
        let property = property.into();
        if let Some(key) = self.orders.iter_mut().find(|k| k.property == property) {
            key.dir = dir;
        } else {
            self.orders.push(SortKey { property, dir });
        }
    }

    #[must_use]
    pub fn order_for(&self, property: &str) -> Option<SortDir> {
        self.orders
            .iter()
            .find(|k| k.property == property)
            .map(|k| k.dir)
    }

    #[must_use]
    pub fn orders(&self) -> &[SortKey] {
        &self.orders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
