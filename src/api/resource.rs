//! Generic CRUD service over a declared resource.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use futures_util::TryStreamExt;
use serde_json::Value;

use crate::client::{ClientInner, Page, PaginatedStream, MAX_PAGE_SIZE};
use crate::models::{AttributeSchema, Decoded, Limit, Method, QueryOptions, Request};
use crate::Result;

/// Static declaration of one remote resource type.
///
/// Providers are nothing more than one of these plus a service method on
/// [`Client`](crate::Client); everything else goes through the shared
/// dispatch pipeline.
///
/// # Example
///
/// ```
/// use ledgerlink::api::ResourceDefinition;
///
/// static UNITS: ResourceDefinition = ResourceDefinition::new("units", "Unit", "Units")
///     .readable(&["@url", "Code", "Description"])
///     .writeable(&["Code", "Description"])
///     .required_on_create(&["Code", "Description"]);
///
/// assert!(UNITS.schema().unwrap().is_writeable("Code"));
/// ```
#[derive(Debug)]
pub struct ResourceDefinition {
    path: &'static str,
    wrapper_key: &'static str,
    list_key: &'static str,
    readable: &'static [&'static str],
    writeable: &'static [&'static str],
    required_create: &'static [&'static str],
    required_update: &'static [&'static str],
    filters: &'static [&'static str],
    schema: OnceLock<Arc<AttributeSchema>>,
}

impl ResourceDefinition {
    /// Declare a resource by its base path, body wrapper key and list key.
    pub const fn new(path: &'static str, wrapper_key: &'static str, list_key: &'static str) -> Self {
        Self {
            path,
            wrapper_key,
            list_key,
            readable: &[],
            writeable: &[],
            required_create: &[],
            required_update: &[],
            filters: &[],
            schema: OnceLock::new(),
        }
    }

    /// Set the readable fields.
    pub const fn readable(mut self, fields: &'static [&'static str]) -> Self {
        self.readable = fields;
        self
    }

    /// Set the writeable fields.
    pub const fn writeable(mut self, fields: &'static [&'static str]) -> Self {
        self.writeable = fields;
        self
    }

    /// Set the fields required on create.
    pub const fn required_on_create(mut self, fields: &'static [&'static str]) -> Self {
        self.required_create = fields;
        self
    }

    /// Set the fields required on update.
    pub const fn required_on_update(mut self, fields: &'static [&'static str]) -> Self {
        self.required_update = fields;
        self
    }

    /// Set the list filters the endpoint accepts.
    pub const fn filters(mut self, filters: &'static [&'static str]) -> Self {
        self.filters = filters;
        self
    }

    /// Base path segment.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Key single-entity bodies are wrapped in.
    pub fn wrapper_key(&self) -> &'static str {
        self.wrapper_key
    }

    /// Key list responses carry their items under.
    pub fn list_key(&self) -> &'static str {
        self.list_key
    }

    /// Fields required on create.
    pub fn required_create(&self) -> &'static [&'static str] {
        self.required_create
    }

    /// Fields required on update.
    pub fn required_update(&self) -> &'static [&'static str] {
        self.required_update
    }

    /// The attribute schema, built on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`](crate::Error::InvalidSchema) if the
    /// declaration has writeable fields that are not readable.
    pub fn schema(&self) -> Result<Arc<AttributeSchema>> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema.clone());
        }
        let schema = AttributeSchema::new(self.readable.iter().copied(), self.writeable.iter().copied())?
            .with_filters(self.filters.iter().copied());
        Ok(self.schema.get_or_init(|| Arc::new(schema)).clone())
    }

    /// Descriptor for one page of the listing.
    pub fn list_request(&self, options: &QueryOptions) -> Request {
        Request::builder(Method::Get)
            .segment(self.path)
            .query(options.to_query_pairs(Utc::now()))
            .build()
    }

    /// Descriptor for fetching one entity.
    pub fn get_request(&self, id: &str) -> Request {
        Request::builder(Method::Get)
            .segments([self.path, id])
            .build()
    }

    /// Descriptor for creating an entity from `data`.
    pub fn create_request(&self, data: Value) -> Request {
        Request::builder(Method::Post)
            .segment(self.path)
            .wrapper_key(self.wrapper_key)
            .required(self.required_create.iter().copied())
            .data(data)
            .build()
    }

    /// Descriptor for updating entity `id` from `data`.
    pub fn update_request(&self, id: &str, data: Value) -> Request {
        Request::builder(Method::Put)
            .segments([self.path, id])
            .wrapper_key(self.wrapper_key)
            .required(self.required_update.iter().copied())
            .data(data)
            .build()
    }

    /// Descriptor for removing entity `id`.
    pub fn delete_request(&self, id: &str) -> Request {
        Request::builder(Method::Delete)
            .segments([self.path, id])
            .build()
    }
}

/// CRUD operations for one declared resource.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
///
/// # async fn example(client: ledgerlink::Client) -> ledgerlink::Result<()> {
/// let accounts = client.accounts();
///
/// let active = accounts
///     .list(&accounts.query()?.filter("active").sort_by("Number").limit(50))
///     .await?;
///
/// accounts
///     .update("1930", json!({"Description": "Business account"}))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResourceService {
    inner: Arc<ClientInner>,
    definition: &'static ResourceDefinition,
}

impl ResourceService {
    pub(crate) fn new(inner: Arc<ClientInner>, definition: &'static ResourceDefinition) -> Self {
        Self { inner, definition }
    }

    /// The resource declaration behind this service.
    pub fn definition(&self) -> &'static ResourceDefinition {
        self.definition
    }

    /// Fresh query options bound to this resource's schema.
    pub fn query(&self) -> Result<QueryOptions> {
        Ok(QueryOptions::new(self.definition.schema()?))
    }

    /// Fetch one page and its metadata.
    pub async fn list_page(&self, options: &QueryOptions) -> Result<Page> {
        let schema = self.definition.schema()?;
        let request = self.definition.list_request(options);
        let decoded = self.inner.send(&schema, &request, None).await?;
        Page::from_decoded(decoded, self.definition.list_key)
    }

    /// List items.
    ///
    /// With a page limit this returns the requested page; with
    /// [`unlimited`](QueryOptions::unlimited) every page is fetched.
    pub async fn list(&self, options: &QueryOptions) -> Result<Vec<Value>> {
        match options.limit_value() {
            Limit::Count(_) => Ok(self.list_page(options).await?.items),
            Limit::Unlimited => self.stream(options.clone()).try_collect().await,
        }
    }

    /// Stream every item from the page in `options` onwards.
    pub fn stream(&self, options: QueryOptions) -> PaginatedStream {
        let options = match options.limit_value() {
            Limit::Unlimited => options.limit(i64::from(MAX_PAGE_SIZE)),
            Limit::Count(_) => options,
        };
        let first_page = options.page_number();
        let service = self.clone();

        PaginatedStream::new(first_page, move |page| {
            let service = service.clone();
            let options = options.clone().page(page);
            Box::pin(async move { service.list_page(&options).await })
        })
    }

    /// Fetch one entity.
    pub async fn get(&self, id: &str) -> Result<Decoded> {
        let schema = self.definition.schema()?;
        self.inner
            .send(&schema, &self.definition.get_request(id), None)
            .await
    }

    /// Create an entity. Fields outside the writeable set are dropped.
    pub async fn create(&self, data: Value) -> Result<Decoded> {
        let schema = self.definition.schema()?;
        self.inner
            .send(&schema, &self.definition.create_request(data), None)
            .await
    }

    /// Update entity `id`. Fields outside the writeable set are dropped.
    pub async fn update(&self, id: &str, data: Value) -> Result<Decoded> {
        let schema = self.definition.schema()?;
        self.inner
            .send(&schema, &self.definition.update_request(id, data), None)
            .await
    }

    /// Remove entity `id`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let schema = self.definition.schema()?;
        self.inner
            .send(&schema, &self.definition.delete_request(id), None)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("path", &self.definition.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    static WIDGETS: ResourceDefinition = ResourceDefinition::new("widgets", "Widget", "Widgets")
        .readable(&["@url", "Code", "Name", "Colour"])
        .writeable(&["Code", "Name", "Colour"])
        .required_on_create(&["Code"])
        .filters(&["red"]);

    static BROKEN: ResourceDefinition = ResourceDefinition::new("broken", "Broken", "Broken")
        .readable(&["Code"])
        .writeable(&["Code", "Hidden"]);

    #[test]
    fn test_schema_is_cached() {
        let first = WIDGETS.schema().unwrap();
        let second = WIDGETS.schema().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.allows_filter("red"));
    }

    #[test]
    fn test_invalid_declaration() {
        assert!(matches!(BROKEN.schema(), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_request_descriptors() {
        let create = WIDGETS.create_request(json!({"Code": "W1"}));
        assert_eq!(create.method(), Method::Post);
        assert_eq!(create.wrapper_key(), "Widget");
        assert_eq!(create.required(), ["Code"]);

        let update = WIDGETS.update_request("W1", json!({"Name": "n"}));
        assert_eq!(update.path(), "widgets/W1");
        assert!(update.required().is_empty());

        assert_eq!(WIDGETS.delete_request("W1").method(), Method::Delete);
        assert_eq!(WIDGETS.get_request("W1").path(), "widgets/W1");
    }

    #[test]
    fn test_list_request_carries_query() {
        let options = QueryOptions::new(WIDGETS.schema().unwrap())
            .filter("red")
            .page(3);
        let request = WIDGETS.list_request(&options);
        assert_eq!(request.path(), "widgets");
        assert!(request.query().contains(&("filter".to_string(), "red".to_string())));
        assert!(request.query().contains(&("page".to_string(), "3".to_string())));
    }
}
