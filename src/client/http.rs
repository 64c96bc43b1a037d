//! HTTP client and dispatch engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{
    ArchiveService, ResourceDefinition, ResourceService, ACCOUNTS, CONTRACT_ACCRUALS, PRICE_LISTS,
};
use crate::models::{AttributeSchema, Decoded, Method, Request};
use crate::{Error, Result};

use super::config::ClientConfig;
use super::decode::decode;
use super::retry::{Sleeper, TokioSleeper};

const ACCESS_TOKEN: HeaderName = HeaderName::from_static("access-token");
const CLIENT_SECRET: HeaderName = HeaderName::from_static("client-secret");

/// The main client for interacting with the accounting API.
///
/// Every provider is reached through a method returning a service
/// struct; all of them funnel into [`send`](Self::send), which filters
/// the body against the provider's schema, dispatches the request,
/// retries throttled calls and decodes the response.
///
/// # Example
///
/// ```no_run
/// use ledgerlink::{Client, ClientConfig};
/// use serde_json::json;
///
/// # async fn example() -> ledgerlink::Result<()> {
/// let config = ClientConfig::new("https://api.example.com/3/")?
///     .with_access_token("token")
///     .with_client_secret("secret");
/// let client = Client::new(config)?;
///
/// let created = client
///     .price_lists()
///     .create(json!({"Code": "B", "Description": "Wholesale"}))
///     .await?;
/// println!("{:?}", created.tree());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

/// Body of one outbound call, prepared once and reused across retries.
enum Payload {
    None,
    Json(Value),
    Multipart { file_name: String, bytes: Bytes },
    Raw(Bytes),
}

impl Client {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client configured from the process environment.
    ///
    /// See [`ClientConfig::from_lookup`] for the keys read.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client that waits between throttled attempts through
    /// `sleeper`.
    pub fn with_sleeper(config: ClientConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                sleeper,
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Get the price lists service.
    pub fn price_lists(&self) -> ResourceService {
        self.resource(&PRICE_LISTS)
    }

    /// Get the contract accruals service.
    pub fn contract_accruals(&self) -> ResourceService {
        self.resource(&CONTRACT_ACCRUALS)
    }

    /// Get the chart of accounts service.
    pub fn accounts(&self) -> ResourceService {
        self.resource(&ACCOUNTS)
    }

    /// Get the file archive service.
    pub fn archive(&self) -> ArchiveService {
        ArchiveService::new(self.inner.clone())
    }

    /// Get a generic service for any declared resource.
    pub fn resource(&self, definition: &'static ResourceDefinition) -> ResourceService {
        ResourceService::new(self.inner.clone(), definition)
    }

    /// Dispatch a request descriptor.
    ///
    /// POST and PUT bodies are filtered through `schema` unless the
    /// request carries a file. Throttled responses are retried according
    /// to [`RetryConfig`](crate::RetryConfig).
    pub async fn send(&self, schema: &AttributeSchema, request: &Request) -> Result<Decoded> {
        self.inner.send(schema, request, None).await
    }

    /// Dispatch a request descriptor, aborting with [`Error::Cancelled`]
    /// as soon as `token` is cancelled.
    pub async fn send_with_cancellation(
        &self,
        schema: &AttributeSchema,
        request: &Request,
        token: &CancellationToken,
    ) -> Result<Decoded> {
        self.inner.send(schema, request, Some(token)).await
    }

    /// Token shared by this client and its clones.
    ///
    /// Cancelling it aborts every in-flight call and fails every later one.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Cancel every in-flight and future call made through this client.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl ClientInner {
    /// Run the dispatch pipeline for one request descriptor.
    pub(crate) async fn send(
        &self,
        schema: &AttributeSchema,
        request: &Request,
        token: Option<&CancellationToken>,
    ) -> Result<Decoded> {
        let url = self.url_for(request)?;
        let payload = self.payload(schema, request).await?;
        let rate_limit = self.config.rate_limit;
        let mut retries = 0u32;

        loop {
            if self.cancel.is_cancelled() || token.is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }

            tracing::debug!(
                method = %request.method(),
                url = %url,
                retries,
                "dispatching request"
            );
            let response = self
                .until_cancelled(token, self.execute(request, &url, &payload))
                .await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return self.handle_response(response).await;
            }

            if !self.config.retry.allows(retries) {
                tracing::error!(url = %url, retries, "rate limit retries exhausted");
                return Err(Error::RateLimited { attempts: retries });
            }

            let wait = self.config.retry.backoff_for_attempt(rate_limit, retries);
            tracing::warn!(
                url = %url,
                wait_us = wait.as_micros() as u64,
                attempt = retries + 1,
                rate_limit = rate_limit.get(),
                "rate limited; retrying"
            );
            self.until_cancelled(token, self.pause(wait)).await?;
            retries += 1;
        }
    }

    async fn pause(&self, wait: Duration) -> Result<()> {
        self.sleeper.sleep(wait).await;
        Ok(())
    }

    /// Race `fut` against the client token and the per-call token.
    async fn until_cancelled<T, F>(&self, token: Option<&CancellationToken>, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let call_cancelled = async move {
            match token {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = call_cancelled => Err(Error::Cancelled),
            result = fut => result,
        }
    }

    /// Resolve the request path against the base URL.
    pub(crate) fn url_for(&self, request: &Request) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid base URL: {}", self.config.base_url)))?
            .pop_if_empty()
            .extend(request.segments());

        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }

        Ok(url)
    }

    /// Build the body once: a file upload, a filtered JSON body, or nothing.
    async fn payload(&self, schema: &AttributeSchema, request: &Request) -> Result<Payload> {
        if !request.method().has_body() {
            return Ok(Payload::None);
        }

        if let Some(path) = request.file_path() {
            let bytes = Bytes::from(tokio::fs::read(path).await?);
            return Ok(match request.method() {
                Method::Post => Payload::Multipart {
                    file_name: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "upload".to_string()),
                    bytes,
                },
                _ => Payload::Raw(bytes),
            });
        }

        let body = schema.filter(request.required(), request.wrapper_key(), request.data())?;
        Ok(Payload::Json(body))
    }

    /// Build request headers with authentication.
    fn build_headers(&self, request: &Request) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let credentials = &self.config.credentials;
        if let Some(ref token) = credentials.access_token {
            headers.insert(ACCESS_TOKEN, secret_header(token, "access token")?);
        }
        if let Some(ref secret) = credentials.client_secret {
            headers.insert(CLIENT_SECRET, secret_header(secret, "client secret")?);
        }

        let accept = request.accept().unwrap_or("application/json");
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(accept)
                .map_err(|_| Error::InvalidInput(format!("Invalid media type: {}", accept)))?,
        );

        Ok(headers)
    }

    /// Perform a single attempt.
    async fn execute(&self, request: &Request, url: &Url, payload: &Payload) -> Result<reqwest::Response> {
        let headers = self.build_headers(request)?;
        let builder = self
            .http
            .request(request.method().into(), url.clone())
            .headers(headers);

        let builder = match payload {
            Payload::None => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Multipart { file_name, bytes } => {
                let part = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                builder.multipart(Form::new().part("file", part))
            }
            Payload::Raw(bytes) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
                .body(bytes.clone()),
        };

        Ok(builder.send().await?)
    }

    /// Decode a success response or translate an error response.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Decoded> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        if status.is_success() {
            return decode(content_type.as_deref(), body);
        }

        let value = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
        tracing::debug!(status = status.as_u16(), "remote error response");
        Err(Error::from_api_response(status.as_u16(), value))
    }
}

fn secret_header(secret: &SecretString, what: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(secret.expose_secret())
        .map_err(|_| Error::InvalidInput(format!("Invalid {} format", what)))?;
    value.set_sensitive(true);
    Ok(value)
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish()
    }
}
