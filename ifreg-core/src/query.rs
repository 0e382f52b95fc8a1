//! Query engine: filters, sort specifications and offset pagination.
//!
//! Stores evaluate [`InterfaceFilter`] and [`SortSpec`] against their own
//! snapshot of the records; [`PageRequest`] turns page parameters into the
//! `(offset, limit)` window a store scan takes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

use crate::error::{RegistryError, RegistryResult};
use crate::model::{InterfaceId, InterfaceInfo, InterfaceStatus};

/// Predicates over interface fields. Every present predicate must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceFilter {
    #[serde(default)]
    pub id: Option<InterfaceId>,
    /// Case-insensitive substring of the name.
    #[serde(default)]
    pub name: Option<String>,
    /// Case-insensitive substring of the description.
    #[serde(default)]
    pub description: Option<String>,
    /// Case-insensitive substring of the url.
    #[serde(default)]
    pub url: Option<String>,
    /// Exact method, compared case-insensitively.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub status: Option<InterfaceStatus>,
    #[serde(default)]
    pub min_call_no: Option<u64>,
    #[serde(default)]
    pub max_call_no: Option<u64>,
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl InterfaceFilter {
    pub fn matches(&self, info: &InterfaceInfo) -> bool {
        if self.id.is_some_and(|id| id != info.id) {
            return false;
        }
        if let Some(name) = &self.name {
            if !contains_ignore_case(&info.name, name) {
                return false;
            }
        }
        if let Some(description) = &self.description {
            match &info.description {
                Some(text) if contains_ignore_case(text, description) => {}
                _ => return false,
            }
        }
        if let Some(url) = &self.url {
            if !contains_ignore_case(&info.url, url) {
                return false;
            }
        }
        if let Some(method) = &self.method {
            if !info.method.eq_ignore_ascii_case(method.trim()) {
                return false;
            }
        }
        if self.status.is_some_and(|status| status != info.status) {
            return false;
        }
        if self.min_call_no.is_some_and(|min| info.call_no < min) {
            return false;
        }
        if self.max_call_no.is_some_and(|max| info.call_no > max) {
            return false;
        }
        if self.created_after.is_some_and(|t| info.create_time < t) {
            return false;
        }
        if self.created_before.is_some_and(|t| info.create_time > t) {
            return false;
        }
        true
    }

    /// Rejects ranges that can never match.
    pub fn validate(&self) -> RegistryResult<()> {
        if let (Some(min), Some(max)) = (self.min_call_no, self.max_call_no) {
            if min > max {
                return Err(RegistryError::validation(format!(
                    "minCallNo ({}) is greater than maxCallNo ({})",
                    min, max
                )));
            }
        }
        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after > before {
                return Err(RegistryError::validation(
                    "createdAfter is later than createdBefore",
                ));
            }
        }
        Ok(())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Method,
    Url,
    Status,
    CallNo,
    CreateTime,
    UpdateTime,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[strum(serialize = "asc", serialize = "ascend")]
    Asc,
    #[strum(serialize = "desc", serialize = "descend")]
    Desc,
}

/// Sort key and direction. Ties are always broken by ascending id so that
/// pagination is deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn compare(&self, a: &InterfaceInfo, b: &InterfaceInfo) -> Ordering {
        let primary = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Method => a.method.cmp(&b.method),
            SortField::Url => a.url.cmp(&b.url),
            SortField::Status => a.status.cmp(&b.status),
            SortField::CallNo => a.call_no.cmp(&b.call_no),
            SortField::CreateTime => a.create_time.cmp(&b.create_time),
            SortField::UpdateTime => a.update_time.cmp(&b.update_time),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// 1-based page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page_size: u64,
    pub page_number: u64,
}

impl PageRequest {
    pub fn new(page_size: u64, page_number: u64) -> Self {
        Self {
            page_size,
            page_number,
        }
    }

    pub fn validate(&self, max_page_size: u64) -> RegistryResult<()> {
        if self.page_size < 1 {
            return Err(RegistryError::validation("pageSize must be at least 1"));
        }
        if self.page_size > max_page_size {
            return Err(RegistryError::validation(format!(
                "pageSize {} exceeds maximum {}",
                self.page_size, max_page_size
            )));
        }
        if self.page_number < 1 {
            return Err(RegistryError::validation("pageNumber must be at least 1"));
        }
        Ok(())
    }

    /// Start position of the page; saturates instead of overflowing.
    pub fn offset(&self) -> usize {
        let offset = (self.page_number.saturating_sub(1)).saturating_mul(self.page_size);
        usize::try_from(offset).unwrap_or(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }
}

/// A full listing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceQuery {
    #[serde(default)]
    pub filter: InterfaceFilter,
    #[serde(default)]
    pub sort: SortSpec,
    pub page: PageRequest,
}

impl InterfaceQuery {
    pub fn page(page_size: u64, page_number: u64) -> Self {
        Self {
            filter: InterfaceFilter::default(),
            sort: SortSpec::default(),
            page: PageRequest::new(page_size, page_number),
        }
    }

    pub fn with_filter(mut self, filter: InterfaceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }
}

/// One page of results and the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub page_size: u64,
    pub page_number: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}

/// Applies the offset window to an already filtered and sorted set.
pub fn window<T>(sorted: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    sorted.into_iter().skip(offset).take(limit).collect()
}
