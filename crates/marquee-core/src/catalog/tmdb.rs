use std::time::Duration;

use serde_json::{Map, Value};

use super::{CatalogSource, FetchError, PageFuture};
use crate::{Config, CoreError, Credentials, MovieRecord};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/movie/now_playing";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Only records in this original language enter the catalog.
const CATALOG_LANGUAGE: &str = "en";

/// The TMDB "now playing" listing.
pub struct TmdbCatalog {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TmdbCatalog {
    /// Build a catalog client. `timeout` bounds both connecting and the whole
    /// request, so a stalled server surfaces as a network error.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// Request for one page: `?page=<n>[&api_key=<key>]` plus an optional
    /// bearer `Authorization` header.
    pub fn build_request(&self, page: u32, credentials: &Credentials) -> reqwest::RequestBuilder {
        let mut url = format!("{}?page={}", self.base_url, page);
        if let Some(key) = credentials.api_key() {
            url.push_str(&format!("&api_key={}", urlencoding::encode(key)));
        }

        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .timeout(self.timeout);

        if let Some(token) = credentials.bearer_token() {
            req = req.bearer_auth(token);
        }
        req
    }
}

impl CatalogSource for TmdbCatalog {
    fn name(&self) -> &str {
        "TMDB"
    }

    fn fetch_page<'a>(&'a self, page: u32, credentials: &'a Credentials) -> PageFuture<'a> {
        Box::pin(async move {
            let resp = self
                .build_request(page, credentials)
                .send()
                .await
                .map_err(network_error)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Network(format!("HTTP {}", status)));
            }

            let body = resp
                .text()
                .await
                .map_err(network_error)?;

            parse_page(&body)
        })
    }
}

/// Transport failure as a [`FetchError`]. The request URL carries the API key,
/// so it is stripped before the error is rendered.
fn network_error(e: reqwest::Error) -> FetchError {
    FetchError::Network(e.without_url().to_string())
}

/// Parse one listing page.
///
/// A missing `results` key is an empty page. Entries whose
/// `original_language` is not English are dropped. Any malformed entry fails
/// the whole page.
pub fn parse_page(body: &str) -> Result<Vec<MovieRecord>, FetchError> {
    let data: Value = serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let root = data
        .as_object()
        .ok_or_else(|| FetchError::Parse("expected a JSON object".into()))?;

    let Some(results) = root.get("results") else {
        return Ok(Vec::new());
    };
    let entries = results
        .as_array()
        .ok_or_else(|| FetchError::Parse("\"results\" is not an array".into()))?;

    let mut records = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let obj = entry
            .as_object()
            .ok_or_else(|| FetchError::Parse(format!("results[{}] is not an object", i)))?;
        if let Some(record) = parse_entry(obj) {
            records.push(record);
        }
    }
    Ok(records)
}

fn parse_entry(obj: &Map<String, Value>) -> Option<MovieRecord> {
    let language = obj
        .get("original_language")
        .and_then(Value::as_str)
        .unwrap_or("");
    if language != CATALOG_LANGUAGE {
        return None;
    }

    // A missing id collapses to 0; such records still enter the catalog.
    let id = match obj.get("id").and_then(as_int) {
        Some(id) => id,
        None => {
            tracing::debug!("catalog entry without id, defaulting to 0");
            0
        }
    };

    let str_field = |key: &str| obj.get(key).and_then(Value::as_str);

    Some(MovieRecord {
        id,
        title: str_field("title").unwrap_or("Untitled").to_string(),
        poster_path: str_field("poster_path").map(String::from),
        vote_average: obj.get("vote_average").and_then(as_number).unwrap_or(0.0),
        vote_count: obj.get("vote_count").and_then(as_int).unwrap_or(0),
        release_date: str_field("release_date")
            .filter(|d| !d.trim().is_empty())
            .map(String::from),
        overview: str_field("overview").unwrap_or("").to_string(),
        original_language: language.to_string(),
        photo_uri: None,
    })
}

/// Numbers, or strings holding a number, as `f64`.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Integers, with whole or fractional numbers and numeric strings truncated.
fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| as_number(value).map(|n| n.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TmdbCatalog {
        TmdbCatalog::new("https://example.test/3/movie/now_playing", DEFAULT_TIMEOUT).unwrap()
    }

    // ── parse_page ─────────────────────────────────────────────────────

    #[test]
    fn missing_results_is_empty_page() {
        let records = parse_page(r#"{"page": 1, "total_pages": 4}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_page(r#"{"results": [ {"id": 1, "#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn non_array_results_is_parse_error() {
        let err = parse_page(r#"{"results": {"id": 1}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn non_object_entry_fails_whole_page() {
        let body = r#"{"results": [
            {"id": 1, "original_language": "en", "title": "A"},
            42
        ]}"#;
        assert!(matches!(parse_page(body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn drops_non_english_entries() {
        let body = r#"{"results": [
            {"id": 1, "original_language": "en", "title": "Heat"},
            {"id": 2, "original_language": "fr", "title": "Amélie"},
            {"id": 3, "title": "No language"},
            {"id": 4, "original_language": "en", "title": "Alien"}
        ]}"#;
        let ids: Vec<_> = parse_page(body).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn applies_field_defaults() {
        let body = r#"{"results": [{"id": 7, "original_language": "en"}]}"#;
        let records = parse_page(body).unwrap();
        let r = &records[0];
        assert_eq!(r.id, 7);
        assert_eq!(r.title, "Untitled");
        assert_eq!(r.overview, "");
        assert_eq!(r.vote_average, 0.0);
        assert_eq!(r.vote_count, 0);
        assert!(r.poster_path.is_none());
        assert!(r.release_date.is_none());
        assert!(r.photo_uri.is_none());
    }

    #[test]
    fn blank_release_date_is_absent() {
        let body = r#"{"results": [
            {"id": 1, "original_language": "en", "release_date": "   "},
            {"id": 2, "original_language": "en", "release_date": "2024-05-01"}
        ]}"#;
        let records = parse_page(body).unwrap();
        assert!(records[0].release_date.is_none());
        assert_eq!(records[1].release_date.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn missing_id_defaults_to_zero() {
        let body = r#"{"results": [{"original_language": "en", "title": "Ghost"}]}"#;
        assert_eq!(parse_page(body).unwrap()[0].id, 0);
    }

    #[test]
    fn numeric_strings_and_floats_are_accepted() {
        let body = r#"{"results": [{
            "id": "550",
            "original_language": "en",
            "vote_count": 12.0,
            "vote_average": "7.5"
        }, {
            "id": 551.9,
            "original_language": "en",
            "vote_count": "abc"
        }]}"#;
        let records = parse_page(body).unwrap();
        assert_eq!(records[0].id, 550);
        assert_eq!(records[0].vote_count, 12);
        assert_eq!(records[0].vote_average, 7.5);
        assert_eq!(records[1].id, 551);
        assert_eq!(records[1].vote_count, 0);
    }

    #[test]
    fn reads_all_fields() {
        let body = r#"{"results": [{
            "id": 550,
            "title": "Fight Club",
            "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
            "vote_average": 8.4,
            "vote_count": 27000,
            "release_date": "1999-10-15",
            "overview": "A ticking-time-bomb insomniac...",
            "original_language": "en"
        }]}"#;
        let r = &parse_page(body).unwrap()[0];
        assert_eq!(r.title, "Fight Club");
        assert_eq!(r.poster_path.as_deref(), Some("/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg"));
        assert_eq!(r.vote_average, 8.4);
        assert_eq!(r.vote_count, 27000);
        assert_eq!(r.release_date.as_deref(), Some("1999-10-15"));
        assert_eq!(r.original_language, "en");
    }

    // ── build_request ──────────────────────────────────────────────────

    #[test]
    fn request_carries_page_and_api_key() {
        let creds = Credentials::new(Some("abc 123".into()), None);
        let req = catalog().build_request(2, &creds).build().unwrap();
        assert_eq!(req.url().query(), Some("page=2&api_key=abc%20123"));
        assert!(req.headers().get("authorization").is_none());
        assert_eq!(req.timeout(), Some(&DEFAULT_TIMEOUT));
    }

    #[test]
    fn request_carries_bearer_token() {
        let creds = Credentials::new(None, Some("tok".into()));
        let req = catalog().build_request(1, &creds).build().unwrap();
        assert_eq!(req.url().query(), Some("page=1"));
        assert_eq!(
            req.headers().get("authorization").unwrap().to_str().unwrap(),
            "Bearer tok"
        );
    }

    #[test]
    fn blank_api_key_is_not_sent() {
        let creds = Credentials::new(Some(" ".into()), Some("tok".into()));
        let req = catalog().build_request(3, &creds).build().unwrap();
        assert_eq!(req.url().query(), Some("page=3"));
    }
}
