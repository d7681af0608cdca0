//! Two-stage record queries.
//!
//! Stage one filters record names by the fields encoded in them, without
//! opening any file. Stage two opens the survivors and filters on their
//! attributes. Every comparison uses [`item_match`].

use crate::error::Result;
use crate::store::{Collection, RecordStore};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Parameters that steer dispatch and are never filters.
pub const RESERVED_PARAMS: [&str; 2] = ["action", "page"];

/// Attributes of one record as seen by the query engine.
pub type Attributes = Map<String, Value>;

/// Single-wildcard match.
///
/// `*` matches everything; `abc*` is a prefix match, `*abc` a suffix match;
/// anything else must be equal. A `*` in any other position is literal.
pub fn item_match(pattern: &str, item: &str) -> bool {
    if pattern == "*" || pattern == item {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if item.starts_with(prefix) {
            return true;
        }
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if item.ends_with(suffix) {
            return true;
        }
    }
    false
}

/// String form of an attribute value for matching. Strings match on their
/// raw text; everything else on its compact JSON form.
pub fn match_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Client-supplied query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Pattern for a field; absent fields match everything.
    pub fn pattern(&self, key: &str) -> &str {
        self.get(key).unwrap_or("*")
    }

    /// Parameters that may act as attribute filters: everything except
    /// reserved parameters and fields already used by the name stage.
    pub fn attribute_filters<'a>(&'a self, consumed: &[&str]) -> Vec<(&'a str, &'a str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .filter(|(k, _)| !RESERVED_PARAMS.contains(k) && !consumed.contains(k))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Stage one: keep stems whose name fields all match.
///
/// `extract` returns the values of `fields`, in order, for a stem; stems it
/// cannot decompose are dropped.
pub fn filter_by_name<F>(
    stems: Vec<String>,
    fields: &[&str],
    params: &QueryParams,
    extract: F,
) -> Vec<String>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    stems
        .into_iter()
        .filter(|stem| match extract(stem) {
            Some(values) => fields
                .iter()
                .zip(values.iter())
                .all(|(field, value)| item_match(params.pattern(field), value)),
            None => false,
        })
        .collect()
}

/// Loads the attributes of a record by stem.
pub trait AttributeSource {
    fn attributes(&self, stem: &str) -> Result<Attributes>;
}

/// Decides which attribute names may be filtered on for a candidate set.
pub trait AttributeSchema: Send + Sync {
    fn queryable(&self, candidates: &[String], source: &dyn AttributeSource)
        -> Result<BTreeSet<String>>;
}

/// Queryable attributes are the fields of the first readable candidate.
///
/// Filters naming a field that candidate lacks are ignored for the whole
/// query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchSchema;

impl AttributeSchema for FirstMatchSchema {
    fn queryable(
        &self,
        candidates: &[String],
        source: &dyn AttributeSource,
    ) -> Result<BTreeSet<String>> {
        for stem in candidates {
            match source.attributes(stem) {
                Ok(attrs) => return Ok(attrs.keys().cloned().collect()),
                Err(e) => warn!("Skipping unreadable record {} for schema: {}", stem, e),
            }
        }
        Ok(BTreeSet::new())
    }
}

/// Stage two: keep candidates whose attributes match every active filter.
///
/// A candidate that lacks a filtered field is not judged by that filter.
/// A candidate whose record cannot be read is dropped with a warning.
pub fn filter_by_attributes(
    candidates: Vec<String>,
    params: &QueryParams,
    consumed: &[&str],
    schema: &dyn AttributeSchema,
    source: &dyn AttributeSource,
) -> Result<Vec<String>> {
    let filters = params.attribute_filters(consumed);
    if filters.is_empty() || candidates.is_empty() {
        return Ok(candidates);
    }

    let queryable = schema.queryable(&candidates, source)?;
    let active: Vec<(&str, &str)> = filters
        .into_iter()
        .filter(|(k, _)| queryable.contains(*k))
        .collect();
    if active.is_empty() {
        debug!("No queryable attribute filters; skipping attribute stage");
        return Ok(candidates);
    }

    let mut matched = Vec::with_capacity(candidates.len());
    for stem in candidates {
        let attrs = match source.attributes(&stem) {
            Ok(attrs) => attrs,
            Err(e) => {
                warn!("Dropping unreadable record {} from query: {}", stem, e);
                continue;
            }
        };
        let keep = active.iter().all(|(field, pattern)| match attrs.get(*field) {
            Some(value) => item_match(pattern, &match_string(value)),
            None => true,
        });
        if keep {
            matched.push(stem);
        }
    }
    Ok(matched)
}

/// Attribute source reading whole records from a store collection.
pub struct StoreAttributes<'a> {
    store: &'a RecordStore,
    collection: Collection,
}

impl<'a> StoreAttributes<'a> {
    pub fn new(store: &'a RecordStore, collection: Collection) -> Self {
        Self { store, collection }
    }
}

impl AttributeSource for StoreAttributes<'_> {
    fn attributes(&self, stem: &str) -> Result<Attributes> {
        match self.store.load_value(self.collection, stem)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Attributes::new()),
        }
    }
}
