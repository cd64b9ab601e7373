//! Remote catalog sources: one trait, the TMDB implementation and a scripted mock.

pub mod mock;
pub mod tmdb;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::{Credentials, MovieRecord};

/// Why a page could not be fetched. Either kind aborts the whole refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, timeout or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),
    /// The response body was not the expected JSON shape.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Future returned by [`CatalogSource::fetch_page`].
pub type PageFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<MovieRecord>, FetchError>> + Send + 'a>>;

/// A remote listing that can be fetched one page at a time.
pub trait CatalogSource: Send + Sync {
    /// Short name used in log lines (e.g., "TMDB").
    fn name(&self) -> &str;

    /// Fetch and parse one page. Records are already language-filtered and
    /// carry field defaults.
    fn fetch_page<'a>(&'a self, page: u32, credentials: &'a Credentials) -> PageFuture<'a>;
}

/// Fetch `pages` sequentially and concatenate them in page order.
///
/// The first failing page aborts the whole batch; records from pages that
/// already succeeded are dropped. Duplicate ids across pages are kept.
pub async fn fetch_pages(
    source: &dyn CatalogSource,
    pages: &[u32],
    credentials: &Credentials,
) -> Result<Vec<MovieRecord>, FetchError> {
    let mut collected = Vec::new();
    for &page in pages {
        match source.fetch_page(page, credentials).await {
            Ok(records) => {
                tracing::debug!(source = source.name(), page, count = records.len(), "fetched page");
                collected.extend(records);
            }
            Err(e) => {
                tracing::warn!(source = source.name(), page, error = %e, "page fetch failed");
                return Err(e);
            }
        }
    }
    Ok(collected)
}
