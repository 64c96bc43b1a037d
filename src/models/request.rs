//! Request descriptors.
//!
//! A [`Request`] describes exactly one outbound call. It is assembled with
//! [`RequestBuilder`] and is read-only afterwards; the dispatch pipeline
//! never mutates it, which is what makes retrying the same descriptor safe.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a resource or a listing
    Get,
    /// Create a resource or upload a file
    Post,
    /// Update a resource or replace a file
    Put,
    /// Remove a resource
    Delete,
}

impl Method {
    /// Returns `true` for methods that carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Description of one outbound call.
///
/// # Example
///
/// ```
/// use ledgerlink::models::{Method, Request};
/// use serde_json::json;
///
/// let request = Request::builder(Method::Post)
///     .segment("pricelists")
///     .wrapper_key("PriceList")
///     .required(["Code", "Description"])
///     .data(json!({"Code": "A1", "Description": "Standard"}))
///     .build();
///
/// assert_eq!(request.path(), "pricelists");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    data: Map<String, Value>,
    wrapper_key: Option<String>,
    required: Vec<String>,
    file_path: Option<PathBuf>,
    accept: Option<String>,
}

impl Request {
    /// Start building a request with the given method.
    pub fn builder(method: Method) -> RequestBuilder {
        RequestBuilder::new(method)
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path segments joined with `/`.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Query parameters in order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Body fields before schema filtering.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Key the body is nested under, empty if unset.
    ///
    /// With an empty key the filtered fields are sent without a wrapper.
    pub fn wrapper_key(&self) -> &str {
        self.wrapper_key.as_deref().unwrap_or_default()
    }

    /// Fields that must survive filtering.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// File to upload, if any. Takes precedence over [`data`](Self::data).
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Media type requested through the `Accept` header, if overridden.
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }
}

/// Fluent builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder for the given method.
    pub fn new(method: Method) -> Self {
        Self {
            request: Request {
                method,
                segments: Vec::new(),
                query: Vec::new(),
                data: Map::new(),
                wrapper_key: None,
                required: Vec::new(),
                file_path: None,
                accept: None,
            },
        }
    }

    /// Append one path segment. Empty segments are skipped.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        let trimmed = segment.trim_matches('/');
        if !trimmed.is_empty() {
            self.request.segments.push(trimmed.to_string());
        }
        self
    }

    /// Append several path segments.
    pub fn segments<I>(self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        segments.into_iter().fold(self, |builder, s| builder.segment(s))
    }

    /// Append one query parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request
            .query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the body fields.
    ///
    /// Non-object values are ignored; the remote service only accepts
    /// objects as resource bodies.
    pub fn data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.request.data = map;
        }
        self
    }

    /// Set the key the body is nested under.
    pub fn wrapper_key(mut self, key: impl Into<String>) -> Self {
        self.request.wrapper_key = Some(key.into());
        self
    }

    /// Set the fields that must be present after filtering.
    pub fn required<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.request.required.clear();
        for field in fields {
            let field = field.into();
            if !self.request.required.contains(&field) {
                self.request.required.push(field);
            }
        }
        self
    }

    /// Attach a file to upload instead of a JSON body.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.file_path = Some(path.into());
        self
    }

    /// Ask for a specific response media type, e.g. `application/pdf`.
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.request.accept = Some(media_type.into());
        self
    }

    /// Finish building the request.
    pub fn build(self) -> Request {
        self.request
    }
}
