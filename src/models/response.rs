//! Decoded response bodies.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// A response body converted according to its declared content type.
///
/// JSON and XML both become a generic [`Value`] tree so callers can treat
/// them alike; binary payloads such as PDFs are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// `application/json` body
    Json(Value),
    /// `application/xml` body, converted to the same tree shape as JSON
    Xml(Value),
    /// Binary body, e.g. a PDF
    Binary {
        /// Declared media type
        content_type: String,
        /// Raw bytes
        bytes: Bytes,
    },
    /// No body at all (e.g. `204 No Content`)
    Empty,
}

impl Decoded {
    /// The structured tree for JSON and XML bodies.
    pub fn tree(&self) -> Option<&Value> {
        match self {
            Decoded::Json(value) | Decoded::Xml(value) => Some(value),
            _ => None,
        }
    }

    /// Consume into the structured tree for JSON and XML bodies.
    pub fn into_tree(self) -> Option<Value> {
        match self {
            Decoded::Json(value) | Decoded::Xml(value) => Some(value),
            _ => None,
        }
    }

    /// The raw bytes of a binary body.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Decoded::Binary { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// Returns `true` for a bodiless response.
    pub fn is_empty(&self) -> bool {
        matches!(self, Decoded::Empty)
    }

    /// Deserialize the tree stored under `key` into a typed value.
    ///
    /// Resource bodies arrive wrapped (`{"PriceList": {...}}`), so this is
    /// the usual way to get at a typed entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the body is not a tree or lacks
    /// `key`, or [`Error::Json`] if the value does not match `T`.
    pub fn extract<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let tree = self
            .tree()
            .ok_or_else(|| Error::InvalidInput("response has no structured body".to_string()))?;
        let value = tree
            .get(key)
            .ok_or_else(|| Error::InvalidInput(format!("response has no `{}` key", key)))?;
        Ok(T::deserialize(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tree_accessors() {
        let json = Decoded::Json(json!({"A": 1}));
        let xml = Decoded::Xml(json!({"A": "1"}));
        let pdf = Decoded::Binary {
            content_type: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        };

        assert!(json.tree().is_some());
        assert!(xml.tree().is_some());
        assert!(pdf.tree().is_none());
        assert_eq!(pdf.bytes().map(|b| b.as_ref()), Some(&b"%PDF-1.4"[..]));
        assert!(Decoded::Empty.is_empty());
    }

    #[test]
    fn test_extract() {
        #[derive(serde::Deserialize)]
        struct PriceList {
            #[serde(rename = "Code")]
            code: String,
        }

        let decoded = Decoded::Json(json!({"PriceList": {"Code": "A1", "Comments": null}}));
        let list: PriceList = decoded.extract("PriceList").unwrap();
        assert_eq!(list.code, "A1");

        assert!(decoded.extract::<PriceList>("Other").is_err());
        assert!(Decoded::Empty.extract::<PriceList>("PriceList").is_err());
    }
}
