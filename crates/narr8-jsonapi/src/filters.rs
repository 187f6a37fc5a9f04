//! Query-string filter parsing.
//!
//! Recognised parameters:
//! - `include=a,b` restricts `included` to the listed resource types
//! - `fields[type]=f1,f2` restricts the attributes serialised for `type`
//! - `page[size]`, `page[offset]` drive lookahead pagination
//!
//! Every other parameter, `include` and `fields[...]` included, is kept
//! verbatim for link reconstruction.

use std::collections::{BTreeMap, BTreeSet};

use url::form_urlencoded;

pub const PAGE_SIZE: &str = "page[size]";
pub const PAGE_OFFSET: &str = "page[offset]";

/// Structured filters parsed from a request query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilters {
    pub include_types: BTreeSet<String>,
    pub fields_by_type: BTreeMap<String, BTreeSet<String>>,
    pub page_size: Option<usize>,
    pub page_offset: Option<usize>,
    /// Non-pagination parameters in request order, already decoded.
    pub passthrough: Vec<(String, String)>,
}

impl QueryFilters {
    /// Parse a raw, URL-encoded query string. A leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filters = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                PAGE_SIZE => match value.trim().parse::<usize>() {
                    Ok(size) if size > 0 => filters.page_size = Some(size),
                    _ => tracing::debug!(value = %value, "Ignoring invalid page[size]"),
                },
                PAGE_OFFSET => match value.trim().parse::<usize>() {
                    Ok(offset) => filters.page_offset = Some(offset),
                    Err(_) => tracing::debug!(value = %value, "Ignoring invalid page[offset]"),
                },
                "include" => {
                    filters.include_types.extend(split_list(&value));
                    filters.passthrough.push((key.into_owned(), value.into_owned()));
                }
                other => {
                    if let Some(resource_type) = other
                        .strip_prefix("fields[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        filters
                            .fields_by_type
                            .entry(resource_type.to_string())
                            .or_default()
                            .extend(split_list(&value));
                    }
                    filters.passthrough.push((key.into_owned(), value.into_owned()));
                }
            }
        }

        filters
    }

    /// Whether a resource of `resource_type` may appear in `included`.
    pub fn includes_type(&self, resource_type: &str) -> bool {
        self.include_types.is_empty() || self.include_types.contains(resource_type)
    }

    /// Whether `field` of `resource_type` passes the sparse fieldset.
    pub fn allows_field(&self, resource_type: &str, field: &str) -> bool {
        self.fields_by_type
            .get(resource_type)
            .map_or(true, |fields| fields.contains(field))
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}
