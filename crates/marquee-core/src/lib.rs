use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub mod annotations;
pub mod catalog;
pub mod config_file;
pub mod projector;
pub mod state;
pub mod store;

// Re-export for convenience
pub use annotations::{
    AnnotationError, AnnotationStore, Annotations, JsonAnnotationStore, MemoryAnnotationStore,
};
pub use catalog::tmdb::TmdbCatalog;
pub use catalog::{CatalogSource, FetchError, fetch_pages};
pub use projector::{Projection, project};
pub use state::{AppState, FilterOption, LayoutMode, LoadStatus, Settings, SortOption};
pub use store::{Command, StateStore, StoreEvent};

/// Identifier of a catalog entry, as assigned by the remote service.
pub type MovieId = i64;

/// Base URL prepended to a record's poster path.
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Pages fetched when nothing else is configured.
pub const DEFAULT_PAGES: [u32; 3] = [1, 2, 3];

/// One remote catalog entry after field defaults and language filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub vote_count: i64,
    /// `None` when the remote value was absent or blank.
    pub release_date: Option<String>,
    pub overview: String,
    pub original_language: String,
    /// Locally attached photo reference; never supplied by the remote service.
    pub photo_uri: Option<String>,
}

impl MovieRecord {
    /// Full poster image URL, if the record has a poster.
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_deref()
            .map(|path| format!("{}{}", POSTER_BASE_URL, path))
    }
}

/// A record overlaid with its local annotations, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieView {
    pub record: MovieRecord,
    pub liked: bool,
}

impl MovieView {
    pub fn id(&self) -> MovieId {
        self.record.id
    }
}

/// Credentials for the remote catalog. Blank values count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>, bearer_token: Option<String>) -> Self {
        Self {
            api_key,
            bearer_token,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        non_blank(self.bearer_token.as_deref())
    }

    /// At least one usable credential is present.
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some() || self.bearer_token().is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("auth missing")]
    AuthMissing,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("annotation store error: {0}")]
    Annotations(#[from] AnnotationError),
    #[error("movie {0} not found")]
    NotFound(MovieId),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub base_url: String,
    pub pages: Vec<u32>,
    pub timeout_secs: u64,
    /// Where liked ids and photo references are persisted.
    /// `None` means the platform data directory.
    pub annotations_path: Option<PathBuf>,
    pub settings: Settings,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            base_url: catalog::tmdb::DEFAULT_BASE_URL.to_string(),
            pages: DEFAULT_PAGES.to_vec(),
            timeout_secs: catalog::tmdb::DEFAULT_TIMEOUT.as_secs(),
            annotations_path: None,
            settings: Settings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credentials_are_not_configured() {
        let creds = Credentials::new(Some("  ".into()), Some(String::new()));
        assert!(!creds.is_configured());
        assert!(creds.api_key().is_none());
        assert!(creds.bearer_token().is_none());
    }

    #[test]
    fn either_credential_is_enough() {
        assert!(Credentials::new(Some("k".into()), None).is_configured());
        assert!(Credentials::new(None, Some("t".into())).is_configured());
    }

    #[test]
    fn debug_masks_secrets() {
        let creds = Credentials::new(Some("secret-key".into()), Some("secret-token".into()));
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn poster_url_joins_base() {
        let record = MovieRecord {
            id: 1,
            title: "Heat".into(),
            poster_path: Some("/abc.jpg".into()),
            vote_average: 8.3,
            vote_count: 10,
            release_date: None,
            overview: String::new(),
            original_language: "en".into(),
            photo_uri: None,
        };
        assert_eq!(
            record.poster_url().as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
    }
}
