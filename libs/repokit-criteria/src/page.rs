//! Page requests and page envelopes.

use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;
use crate::fields::{DistinctFields, Fields};
use crate::filter::Filter;
use crate::sort::Sort;

/// Request for one page of results.
///
/// `page_number` starts at 1 and `page_size` is at least 1; both are checked
/// on construction and on deserialization, as is the page's row offset, which
/// must fit a signed 64-bit SQL bind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PageableRepr")]
pub struct Pageable {
    page_number: u64,
    page_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distinct_fields: Option<DistinctFields>,
}

#[derive(Deserialize)]
struct PageableRepr {
    page_number: u64,
    page_size: u64,
    #[serde(default)]
    sort: Option<Sort>,
    #[serde(default)]
    filter: Option<Filter>,
    #[serde(default)]
    fields: Option<Fields>,
    #[serde(default)]
    distinct_fields: Option<DistinctFields>,
}

impl TryFrom<PageableRepr> for Pageable {
    type Error = CriteriaError;

    fn try_from(repr: PageableRepr) -> Result<Self, Self::Error> {
        let mut pageable = Pageable::new(repr.page_number, repr.page_size)?;
        pageable.sort = repr.sort;
        pageable.filter = repr.filter;
        pageable.fields = repr.fields;
        pageable.distinct_fields = repr.distinct_fields;
        Ok(pageable)
    }
}

impl Pageable {
    /// # Errors
    /// Returns [`CriteriaError::InvalidPage`] when `page_number` or `page_size` is zero,
    /// or when the page starts or ends past `i64::MAX` rows.
    pub fn new(page_number: u64, page_size: u64) -> Result<Self, CriteriaError> {
        let limit = i64::MAX.unsigned_abs();
        let in_range = page_number
            .checked_sub(1)
            .filter(|_| page_size > 0)
            .and_then(|skipped| skipped.checked_mul(page_size))
            .and_then(|offset| offset.checked_add(page_size))
            .is_some_and(|end| end <= limit);
        if !in_range {
            return Err(CriteriaError::InvalidPage {
                page_number,
                page_size,
            });
        }
        Ok(Self {
            page_number,
            page_size,
            sort: None,
            filter: None,
            fields: None,
            distinct_fields: None,
        })
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn with_distinct_fields(mut self, distinct_fields: DistinctFields) -> Self {
        self.distinct_fields = Some(distinct_fields);
        self
    }

    #[must_use]
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Rows to skip: page 1 starts at 0.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page_number - 1) * self.page_size
    }

    #[must_use]
    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    #[must_use]
    pub fn distinct_fields(&self) -> Option<&DistinctFields> {
        self.distinct_fields.as_ref()
    }
}

/// One bounded result set plus the request that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    content: Vec<T>,
    total_elements: u64,
    page_number: u64,
    page_size: u64,
    total_pages: u64,
    sort: Option<Sort>,
    filter: Option<Filter>,
    fields: Option<Fields>,
    distinct_fields: Option<DistinctFields>,
}

impl<T> Page<T> {
    /// Page built for `pageable`; `total_pages` is `ceil(total_elements / page_size)`.
    #[must_use]
    pub fn new(content: Vec<T>, total_elements: u64, pageable: &Pageable) -> Self {
        Self {
            content,
            total_elements,
            page_number: pageable.page_number,
            page_size: pageable.page_size,
            total_pages: total_elements.div_ceil(pageable.page_size),
            sort: pageable.sort.clone(),
            filter: pageable.filter.clone(),
            fields: pageable.fields.clone(),
            distinct_fields: pageable.distinct_fields.clone(),
        }
    }

    /// The whole result set as a single page.
    ///
    /// `page_size` is the row count, at least 1; an empty result has no pages.
    #[must_use]
    pub fn single(content: Vec<T>, total_elements: u64) -> Self {
        let page_size = (content.len() as u64).max(1);
        Self {
            content,
            total_elements,
            page_number: 1,
            page_size,
            total_pages: total_elements.div_ceil(page_size),
            sort: None,
            filter: None,
            fields: None,
            distinct_fields: None,
        }
    }

    #[must_use]
    pub fn content(&self) -> &[T] {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    #[must_use]
    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    #[must_use]
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    #[must_use]
    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    #[must_use]
    pub fn distinct_fields(&self) -> Option<&DistinctFields> {
        self.distinct_fields.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Replace the content while keeping every piece of page metadata.
    #[must_use]
    pub fn map_content<U, F>(self, f: F) -> Page<U>
    where
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        Page {
            content: f(self.content),
            total_elements: self.total_elements,
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
            sort: self.sort,
            filter: self.filter,
            fields: self.fields,
            distinct_fields: self.distinct_fields,
        }
    }

    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        self.map_content(|content| content.into_iter().map(f).collect())
    }
}
