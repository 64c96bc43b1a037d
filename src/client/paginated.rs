//! Paginated stream for lazy iteration over list endpoints.
//!
//! List responses carry their items under the provider's list key and a
//! `MetaInformation` object describing the page. [`PaginatedStream`]
//! yields the items one by one and fetches the next page when the current
//! one is exhausted.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde_json::Value;

use super::retry::BoxFuture;
use crate::models::Decoded;
use crate::{Error, Result};

/// Largest page size the service hands out.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Key of the page metadata object in list responses.
const META_KEY: &str = "MetaInformation";

/// Page metadata from a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Total number of items across all pages.
    pub total_resources: u64,
    /// Total number of pages.
    pub total_pages: u32,
    /// Current page (1-indexed).
    pub current_page: u32,
}

impl PageInfo {
    /// Read the `MetaInformation` object of a list response.
    ///
    /// Numbers may arrive as strings when the body was XML.
    pub fn from_tree(tree: &Value) -> Option<Self> {
        let meta = tree.get(META_KEY)?;
        let number = |key: &str| -> Option<u64> {
            let value = meta.get(key)?;
            value
                .as_u64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        };

        Some(Self {
            total_resources: number("@TotalResources")?,
            total_pages: u32::try_from(number("@TotalPages")?).ok()?,
            current_page: u32::try_from(number("@CurrentPage")?).ok()?,
        })
    }

    /// Check if there are more pages after the current one.
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Get the next page number, if available.
    pub fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            Some(self.current_page + 1)
        } else {
            None
        }
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The items in this page.
    pub items: Vec<Value>,
    /// Pagination metadata, when the service sent it.
    pub info: Option<PageInfo>,
}

impl Page {
    /// Split a decoded list response into items and metadata.
    ///
    /// XML lists nest their items one level deeper
    /// (`<PriceLists><PriceList/>...</PriceLists>`); both shapes are
    /// accepted. A missing or null list is an empty page.
    pub fn from_decoded(decoded: Decoded, list_key: &str) -> Result<Self> {
        let tree = decoded.into_tree().ok_or_else(|| {
            Error::InvalidInput(format!("list response for `{}` has no structured body", list_key))
        })?;
        let info = PageInfo::from_tree(&tree);

        let items = match tree.get(list_key) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(Value::Object(inner)) if inner.len() == 1 => match inner.values().next() {
                Some(Value::Array(items)) => items.clone(),
                Some(item @ Value::Object(_)) => vec![item.clone()],
                _ => vec![Value::Object(inner.clone())],
            },
            Some(other) => vec![other.clone()],
        };

        Ok(Self { items, info })
    }
}

/// A stream that lazily fetches pages from a list endpoint.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
///
/// # async fn example(client: ledgerlink::Client) -> ledgerlink::Result<()> {
/// let accruals = client.contract_accruals();
/// let mut stream = accruals.stream(accruals.query()?);
///
/// while let Some(item) = stream.next().await {
///     println!("{}", item?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaginatedStream {
    /// Function to fetch a page by number.
    fetch_page: Box<dyn Fn(u32) -> BoxFuture<'static, Result<Page>> + Send + Sync>,
    /// Items of the current page not yet yielded.
    current_items: VecDeque<Value>,
    /// Next page to fetch, None if exhausted.
    next_page: Option<u32>,
    /// Page number of the in-flight fetch.
    requested_page: u32,
    /// Current in-flight fetch future.
    pending_fetch: Option<BoxFuture<'static, Result<Page>>>,
}

impl PaginatedStream {
    /// Create a new paginated stream starting at `first_page`.
    pub(crate) fn new<F>(first_page: u32, fetch_page: F) -> Self
    where
        F: Fn(u32) -> BoxFuture<'static, Result<Page>> + Send + Sync + 'static,
    {
        Self {
            fetch_page: Box::new(fetch_page),
            current_items: VecDeque::new(),
            next_page: Some(first_page.max(1)),
            requested_page: 0,
            pending_fetch: None,
        }
    }
}

impl Stream for PaginatedStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(item) = this.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(ref mut fut) = this.pending_fetch {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.pending_fetch = None;
                        let requested = this.requested_page;
                        this.next_page = page
                            .info
                            .filter(|info| requested < info.total_pages)
                            .map(|_| requested + 1);
                        this.current_items = page.items.into();

                        if !this.current_items.is_empty() {
                            continue;
                        }
                        return Poll::Ready(None);
                    }
                    Poll::Ready(Err(e)) => {
                        this.pending_fetch = None;
                        this.next_page = None;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            if let Some(page) = this.next_page.take() {
                this.requested_page = page;
                this.pending_fetch = Some((this.fetch_page)(page));
                continue;
            }

            return Poll::Ready(None);
        }
    }
}

impl Unpin for PaginatedStream {}
