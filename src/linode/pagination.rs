//! Cursor over paged list endpoints.

use std::marker::PhantomData;

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::LinodeApi;
use super::error::LinodeError;
use super::transport::RequestParts;
use super::types::{Page, Paginated};

/// Walks a paged list endpoint one page per call.
///
/// The cursor never caches or retries a page: the first error is returned
/// as-is and the listing should be treated as finished.
#[derive(Debug)]
pub struct PageCursor<'a, T> {
    api: &'a LinodeApi,
    endpoint: String,
    parts: RequestParts,
    page: u32,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T> PageCursor<'a, T>
where
    T: DeserializeOwned,
{
    pub(crate) fn new(
        api: &'a LinodeApi,
        endpoint: impl Into<String>,
        parts: RequestParts,
    ) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
            parts,
            page: 1,
            _item: PhantomData,
        }
    }

    /// Fetches the next page, returning its items and whether another page
    /// remains.
    ///
    /// # Errors
    ///
    /// Returns the [`LinodeError`] raised by the transport executor.
    pub async fn next(&mut self) -> Result<(Vec<T>, bool), LinodeError> {
        if self.page > 1 {
            self.parts.set_query("page", self.page.to_string());
        }

        let envelope: Page<T> = self
            .api
            .execute(Method::GET, &self.endpoint, self.parts.clone())
            .await?;

        self.page = self.page.saturating_add(1);
        let has_more = self.page <= envelope.page_count();
        Ok((envelope.into_items(), has_more))
    }

    /// Appends every remaining page to `out`.
    ///
    /// Items from pages fetched before a failure stay in `out`.
    ///
    /// # Errors
    ///
    /// Returns the first [`LinodeError`] encountered.
    pub async fn drain_into(&mut self, out: &mut Vec<T>) -> Result<(), LinodeError> {
        loop {
            let (items, has_more) = self.next().await?;
            out.extend(items);
            if !has_more {
                return Ok(());
            }
        }
    }

    /// Collects every page into a single vector, in provider order.
    ///
    /// # Errors
    ///
    /// Returns the first [`LinodeError`] encountered.
    pub async fn collect_all(mut self) -> Result<Vec<T>, LinodeError> {
        let mut items = Vec::new();
        self.drain_into(&mut items).await?;
        Ok(items)
    }
}
