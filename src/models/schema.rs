//! Attribute schemas and the outbound payload filter.
//!
//! Each provider declares which fields a remote entity may contain
//! (`readable`), which of those may be sent on create/update
//! (`writeable`) and which list filters the endpoint accepts. The schema
//! is the only thing the dispatch pipeline needs to sanitize a body.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Declared field sets of one remote resource.
///
/// # Example
///
/// ```
/// use ledgerlink::models::AttributeSchema;
/// use serde_json::json;
///
/// let schema = AttributeSchema::new(
///     ["Code", "Description", "Comments", "PreSelected"],
///     ["Code", "Description", "Comments"],
/// ).unwrap();
///
/// let data = json!({"Code": "A1", "Description": "desc", "PreSelected": true});
/// let body = schema
///     .filter(&["Code"], "PriceList", data.as_object().unwrap())
///     .unwrap();
/// assert_eq!(body, json!({"PriceList": {"Code": "A1", "Description": "desc"}}));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeSchema {
    readable: BTreeSet<String>,
    writeable: BTreeSet<String>,
    filters: BTreeSet<String>,
}

impl AttributeSchema {
    /// Create a schema from its readable and writeable field names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] if a writeable field is not also
    /// readable.
    pub fn new<R, W>(readable: R, writeable: W) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        let readable: BTreeSet<String> = readable.into_iter().map(Into::into).collect();
        let writeable: BTreeSet<String> = writeable.into_iter().map(Into::into).collect();

        let stray: Vec<&str> = writeable
            .difference(&readable)
            .map(String::as_str)
            .collect();
        if !stray.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "writeable fields not readable: {}",
                stray.join(", ")
            )));
        }

        Ok(Self {
            readable,
            writeable,
            filters: BTreeSet::new(),
        })
    }

    /// Declare the list filters the endpoint accepts.
    pub fn with_filters<F>(mut self, filters: F) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// All fields the remote entity may contain.
    pub fn readable(&self) -> &BTreeSet<String> {
        &self.readable
    }

    /// Fields that may be sent on create or update.
    pub fn writeable(&self) -> &BTreeSet<String> {
        &self.writeable
    }

    /// Filters accepted by the list endpoint.
    pub fn filters(&self) -> &BTreeSet<String> {
        &self.filters
    }

    /// Returns `true` if `field` is readable.
    pub fn is_readable(&self, field: &str) -> bool {
        self.readable.contains(field)
    }

    /// Returns `true` if `field` is writeable.
    pub fn is_writeable(&self, field: &str) -> bool {
        self.writeable.contains(field)
    }

    /// Returns `true` if `filter` is one of the declared list filters.
    pub fn allows_filter(&self, filter: &str) -> bool {
        self.filters.contains(filter)
    }

    /// Find the readable field matching `field`, ignoring ASCII case.
    pub fn readable_field(&self, field: &str) -> Option<&str> {
        self.readable
            .iter()
            .find(|name| name.eq_ignore_ascii_case(field))
            .map(String::as_str)
    }

    /// Sanitize `data` for sending and nest it under `wrapper_key`.
    ///
    /// Unknown and read-only fields are dropped without error. Every name
    /// in `required` must survive, otherwise the whole required set is
    /// reported through [`Error::MissingRequiredAttribute`]. An empty
    /// `wrapper_key` returns the surviving fields unwrapped.
    pub fn filter<S: AsRef<str>>(
        &self,
        required: &[S],
        wrapper_key: &str,
        data: &Map<String, Value>,
    ) -> Result<Value> {
        let mut kept = Map::new();
        for (key, value) in data {
            if self.is_readable(key) && self.is_writeable(key) {
                kept.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(field = %key, wrapper = wrapper_key, "dropping non-writeable field");
            }
        }

        if required.iter().any(|name| !kept.contains_key(name.as_ref())) {
            return Err(Error::MissingRequiredAttribute {
                required: required.iter().map(|s| s.as_ref().to_string()).collect(),
            });
        }

        if wrapper_key.is_empty() {
            return Ok(Value::Object(kept));
        }
        let mut wrapped = Map::with_capacity(1);
        wrapped.insert(wrapper_key.to_string(), Value::Object(kept));
        Ok(Value::Object(wrapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn price_list_schema() -> AttributeSchema {
        AttributeSchema::new(
            ["Code", "Description", "Comments"],
            ["Code", "Description", "Comments"],
        )
        .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_drops_unknown_and_wraps() {
        let data = object(json!({"Code": "A1", "Description": "desc", "Extra": "drop-me"}));
        let body = price_list_schema()
            .filter(&["Code", "Description"], "Item", &data)
            .unwrap();
        assert_eq!(body, json!({"Item": {"Code": "A1", "Description": "desc"}}));
    }

    #[test]
    fn test_empty_wrapper_key_sends_fields_unwrapped() {
        let data = object(json!({"Code": "A1", "Extra": 1}));
        let body = price_list_schema().filter(&["Code"], "", &data).unwrap();
        assert_eq!(body, json!({"Code": "A1"}));
    }

    #[test]
    fn test_filter_drops_read_only_fields() {
        let schema = AttributeSchema::new(["Number", "Balance", "Description"], ["Description"]).unwrap();
        let data = object(json!({"Number": 1930, "Balance": 10.5, "Description": "Bank"}));
        let body = schema.filter::<&str>(&[], "Account", &data).unwrap();
        assert_eq!(body, json!({"Account": {"Description": "Bank"}}));
    }

    #[test]
    fn test_filter_reports_full_required_set() {
        let data = object(json!({"Code": "A1"}));
        let err = price_list_schema()
            .filter(&["Code", "Description"], "Item", &data)
            .unwrap_err();
        match err {
            Error::MissingRequiredAttribute { required } => {
                assert_eq!(required, vec!["Code".to_string(), "Description".to_string()]);
            }
            other => panic!("Expected MissingRequiredAttribute, got {other:?}"),
        }
    }

    #[test]
    fn test_required_must_be_writeable() {
        let schema = AttributeSchema::new(["Code", "Id"], ["Code"]).unwrap();
        let data = object(json!({"Code": "A1", "Id": 3}));
        assert!(schema.filter(&["Id"], "Item", &data).is_err());
    }

    #[test]
    fn test_empty_required_always_passes() {
        let body = price_list_schema()
            .filter::<&str>(&[], "Item", &Map::new())
            .unwrap();
        assert_eq!(body, json!({"Item": {}}));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let schema = price_list_schema();
        let data = object(json!({"Code": "A1", "Comments": "c", "Bogus": 1}));
        let once = schema.filter(&["Code"], "Item", &data).unwrap();
        let inner = object(once["Item"].clone());
        let twice = schema.filter(&["Code"], "Item", &inner).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filtered_keys_are_subset_of_writeable() {
        let schema = AttributeSchema::new(["A", "B", "C"], ["A", "B"]).unwrap();
        let data = object(json!({"A": 1, "B": 2, "C": 3, "D": 4}));
        let body = schema.filter::<&str>(&[], "W", &data).unwrap();
        for key in body["W"].as_object().unwrap().keys() {
            assert!(schema.is_writeable(key) && schema.is_readable(key));
        }
    }

    #[test]
    fn test_schema_rejects_writeable_outside_readable() {
        let err = AttributeSchema::new(["Code"], ["Code", "Secret"]).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(msg) if msg.contains("Secret")));
    }

    #[test]
    fn test_readable_field_lookup_ignores_case() {
        let schema = price_list_schema();
        assert_eq!(schema.readable_field("description"), Some("Description"));
        assert_eq!(schema.readable_field("nope"), None);
    }
}
