//! Scripted catalog source for tests and offline embedding.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{CatalogSource, FetchError, PageFuture};
use crate::{Credentials, MovieRecord};

/// One scripted reply for a page.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Page(Vec<MovieRecord>),
    Error(FetchError),
}

#[derive(Clone, Debug)]
struct Scripted {
    response: MockResponse,
    delay: Option<Duration>,
}

/// A hand-rolled [`CatalogSource`] returning scripted pages.
///
/// Each page has a queue of replies; every call pops the next one and the
/// last reply repeats once the queue is down to one entry. Unscripted pages
/// return an empty page.
pub struct MockCatalog {
    pages: Mutex<HashMap<u32, VecDeque<Scripted>>>,
    call_count: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Script `page` to return `records`.
    pub fn with_page(self, page: u32, records: Vec<MovieRecord>) -> Self {
        self.push(page, MockResponse::Page(records), None)
    }

    /// Script `page` to fail.
    pub fn with_error(self, page: u32, error: FetchError) -> Self {
        self.push(page, MockResponse::Error(error), None)
    }

    /// Queue a reply for `page`, optionally delayed.
    pub fn push(self, page: u32, response: MockResponse, delay: Option<Duration>) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages
                .entry(page)
                .or_default()
                .push_back(Scripted { response, delay });
        }
        self
    }

    /// How many times `fetch_page()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_reply(&self, page: u32) -> Option<Scripted> {
        let mut pages = self.pages.lock().ok()?;
        let queue = pages.get_mut(&page)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogSource for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_page<'a>(&'a self, page: u32, _credentials: &'a Credentials) -> PageFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let reply = self.next_reply(page);

        Box::pin(async move {
            let Some(Scripted { response, delay }) = reply else {
                return Ok(Vec::new());
            };
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match response {
                MockResponse::Page(records) => Ok(records),
                MockResponse::Error(e) => Err(e),
            }
        })
    }
}

/// An English record with the given id and title and otherwise default fields.
pub fn record(id: i64, title: &str) -> MovieRecord {
    MovieRecord {
        id,
        title: title.to_string(),
        poster_path: None,
        vote_average: 0.0,
        vote_count: 0,
        release_date: None,
        overview: String::new(),
        original_language: "en".to_string(),
        photo_uri: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fetch_pages;

    fn creds() -> Credentials {
        Credentials::new(Some("k".into()), None)
    }

    #[tokio::test]
    async fn sequence_repeats_last_reply() {
        let mock = MockCatalog::new()
            .with_page(1, vec![record(1, "A")])
            .with_page(1, vec![record(2, "B")]);
        let c = creds();

        let first = mock.fetch_page(1, &c).await.unwrap();
        let second = mock.fetch_page(1, &c).await.unwrap();
        let third = mock.fetch_page(1, &c).await.unwrap();

        assert_eq!(first[0].id, 1);
        assert_eq!(second[0].id, 2);
        assert_eq!(third[0].id, 2);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn fetch_pages_concatenates_in_order_without_dedup() {
        let mock = MockCatalog::new()
            .with_page(1, vec![record(1, "A"), record(2, "B")])
            .with_page(2, vec![record(2, "B again"), record(3, "C")]);

        let records = fetch_pages(&mock, &[1, 2], &creds()).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn fetch_pages_stops_at_first_error() {
        let mock = MockCatalog::new()
            .with_page(1, vec![record(1, "A")])
            .with_error(2, FetchError::Parse("bad".into()))
            .with_page(3, vec![record(3, "C")]);

        let err = fetch_pages(&mock, &[1, 2, 3], &creds()).await.unwrap_err();
        assert_eq!(err, FetchError::Parse("bad".into()));
        assert_eq!(mock.call_count(), 2);
    }
}
