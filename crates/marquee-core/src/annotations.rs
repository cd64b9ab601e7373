//! Durable user annotations: liked ids and attached photo references.
//!
//! Stores have replace-all semantics: `save` always receives the complete
//! snapshot, never a diff.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MovieId;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid annotation file {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine data directory")]
    NoDataDir,
}

/// Everything the user owns about catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub liked: BTreeSet<MovieId>,
    /// Photo references keyed by movie id. Opaque to this crate.
    pub photos: BTreeMap<MovieId, String>,
}

/// A durable key-set collaborator. Implementations may block.
pub trait AnnotationStore: Send + Sync {
    fn load(&self) -> Result<Annotations, AnnotationError>;
    fn save(&self, annotations: &Annotations) -> Result<(), AnnotationError>;
}

/// JSON file store: `<data_dir>/marquee/annotations.json` by default.
pub struct JsonAnnotationStore {
    path: PathBuf,
}

impl JsonAnnotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `path`, or at the platform default when `path` is `None`.
    pub fn at_or_default(path: Option<&Path>) -> Result<Self, AnnotationError> {
        match path {
            Some(p) => Ok(Self::new(p)),
            None => default_path()
                .map(Self::new)
                .ok_or(AnnotationError::NoDataDir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> AnnotationError {
        AnnotationError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Platform data path: `<data_dir>/marquee/annotations.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("marquee").join("annotations.json"))
}

impl AnnotationStore for JsonAnnotationStore {
    /// A missing file is an empty annotation set.
    fn load(&self) -> Result<Annotations, AnnotationError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no annotation file yet");
                return Ok(Annotations::default());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let annotations: Annotations =
            serde_json::from_str(&content).map_err(|source| AnnotationError::Json {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!(
            path = %self.path.display(),
            liked = annotations.liked.len(),
            photos = annotations.photos.len(),
            "loaded annotations"
        );
        Ok(annotations)
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, annotations: &Annotations) -> Result<(), AnnotationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let content =
            serde_json::to_string_pretty(annotations).map_err(|source| AnnotationError::Json {
                path: self.path.clone(),
                source,
            })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

/// In-memory store. Counts saves so callers can observe persistence.
#[derive(Default)]
pub struct MemoryAnnotationStore {
    inner: Mutex<Annotations>,
    saves: AtomicUsize,
}

impl MemoryAnnotationStore {
    pub fn new(initial: Annotations) -> Self {
        Self {
            inner: Mutex::new(initial),
            saves: AtomicUsize::new(0),
        }
    }

    /// Current durable contents.
    pub fn snapshot(&self) -> Annotations {
        self.inner.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl AnnotationStore for MemoryAnnotationStore {
    fn load(&self) -> Result<Annotations, AnnotationError> {
        Ok(self.snapshot())
    }

    fn save(&self, annotations: &Annotations) -> Result<(), AnnotationError> {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = annotations.clone();
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
