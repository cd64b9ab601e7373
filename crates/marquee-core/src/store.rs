//! The single owner of [`AppState`].
//!
//! Commands are applied one at a time through `&mut self`. Fetches run on
//! spawned tasks and report back as [`StoreEvent`]s over a channel; only the
//! owner applies them, and only the result of the most recently issued
//! refresh is allowed to commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::annotations::{AnnotationStore, Annotations};
use crate::catalog::{self, CatalogSource, FetchError};
use crate::projector::project;
use crate::state::{AppState, LoadStatus, SortOption};
use crate::{Config, CoreError, Credentials, MovieId, MovieRecord, MovieView};

/// Everything a caller can ask the store to do.
#[derive(Debug, Clone)]
pub enum Command {
    /// Fetch these pages and replace the catalog. Also becomes the page set
    /// used by [`Command::Retry`].
    Refresh(Vec<u32>),
    Retry,
    SetCredentials(Credentials),
    ToggleLayout,
    ChangeSort(SortOption),
    ToggleFilter,
    Select(MovieId),
    ClearSelection,
    ToggleLike(MovieId),
    AttachPhoto { id: MovieId, uri: String },
}

/// Completions delivered back to the owner.
#[derive(Debug)]
pub enum StoreEvent {
    RefreshFinished {
        generation: u64,
        result: Result<Vec<MovieRecord>, FetchError>,
    },
}

pub struct StateStore {
    state: AppState,
    /// Durable photo references, keyed by id. Survives catalog replacement.
    photos: BTreeMap<MovieId, String>,
    credentials: Credentials,
    pages: Vec<u32>,
    source: Arc<dyn CatalogSource>,
    /// Highest refresh generation issued so far.
    generation: u64,
    /// Spawned refreshes that have not reported back yet.
    in_flight: usize,
    events_tx: mpsc::UnboundedSender<StoreEvent>,
    events_rx: mpsc::UnboundedReceiver<StoreEvent>,
    writer: AnnotationWriter,
}

impl StateStore {
    /// Load annotations, then build the store. No command can run before the
    /// load has finished.
    pub async fn open(
        config: &Config,
        source: Arc<dyn CatalogSource>,
        annotations: Arc<dyn AnnotationStore>,
    ) -> Result<Self, CoreError> {
        let loader = Arc::clone(&annotations);
        let loaded = tokio::task::spawn_blocking(move || loader.load()).await??;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut store = Self {
            state: AppState {
                liked_ids: loaded.liked,
                settings: config.settings,
                ..AppState::default()
            },
            photos: loaded.photos,
            credentials: config.credentials.clone(),
            pages: config.pages.clone(),
            source,
            generation: 0,
            in_flight: 0,
            events_tx,
            events_rx,
            writer: AnnotationWriter::spawn(annotations),
        };
        store.recompute();
        Ok(store)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn visible(&self) -> &[MovieView] {
        &self.state.visible
    }

    pub fn selected_movie(&self) -> Option<&MovieView> {
        self.state.selected()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.state.status
    }

    /// Highest refresh generation issued so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The page set `retry` will fetch.
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight > 0
    }

    /// Apply one command.
    pub fn update(&mut self, command: Command) {
        match command {
            Command::Refresh(pages) => {
                self.refresh(pages);
            }
            Command::Retry => {
                self.retry();
            }
            Command::SetCredentials(credentials) => self.set_credentials(credentials),
            Command::ToggleLayout => self.toggle_layout(),
            Command::ChangeSort(option) => self.change_sort(option),
            Command::ToggleFilter => self.toggle_filter(),
            Command::Select(id) => self.select(id),
            Command::ClearSelection => self.clear_selection(),
            Command::ToggleLike(id) => self.toggle_like(id),
            Command::AttachPhoto { id, uri } => self.attach_photo(id, uri),
        }
    }

    /// Start a refresh of `pages` and return its generation token.
    ///
    /// Without credentials the state goes straight to `Error("auth missing")`
    /// and nothing is fetched. Either way any refresh still in flight is
    /// superseded.
    pub fn refresh(&mut self, pages: Vec<u32>) -> u64 {
        self.pages = pages;
        self.generation += 1;
        let generation = self.generation;

        if !self.credentials.is_configured() {
            tracing::warn!(generation, "refresh rejected: no credentials configured");
            self.state.status = LoadStatus::Error(CoreError::AuthMissing.to_string());
            return generation;
        }

        self.state.status = LoadStatus::Loading;
        self.in_flight += 1;

        let source = Arc::clone(&self.source);
        let credentials = self.credentials.clone();
        let pages = self.pages.clone();
        let tx = self.events_tx.clone();
        tracing::info!(generation, ?pages, source = source.name(), "refresh started");

        tokio::spawn(async move {
            let result = catalog::fetch_pages(source.as_ref(), &pages, &credentials).await;
            // The receiver lives as long as the store; a send error only means
            // the store was dropped and nobody cares about this result.
            let _ = tx.send(StoreEvent::RefreshFinished { generation, result });
        });

        generation
    }

    /// Refresh the last configured page set.
    pub fn retry(&mut self) -> u64 {
        let pages = self.pages.clone();
        self.refresh(pages)
    }

    /// Replace the credentials. An empty catalog triggers a refresh of the
    /// configured pages; otherwise the view is only recomputed.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
        if self.state.raw_catalog.is_empty() {
            self.retry();
        } else {
            self.recompute();
        }
    }

    pub fn toggle_layout(&mut self) {
        self.state.settings.layout = self.state.settings.layout.toggled();
    }

    pub fn change_sort(&mut self, option: SortOption) {
        self.state.settings.sort = option;
        self.recompute();
    }

    pub fn toggle_filter(&mut self) {
        self.state.settings.filter = self.state.settings.filter.toggled();
        self.recompute();
    }

    /// Select a visible movie. Ids that are not currently visible are ignored
    /// so the selection never dangles.
    pub fn select(&mut self, id: MovieId) {
        if self.state.visible.iter().any(|v| v.id() == id) {
            self.state.selection = Some(id);
        } else {
            tracing::debug!(id, "ignoring selection of a movie that is not visible");
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selection = None;
    }

    /// Flip the liked flag. The view updates immediately; the durable write
    /// happens in the background.
    pub fn toggle_like(&mut self, id: MovieId) {
        if !self.state.liked_ids.remove(&id) {
            self.state.liked_ids.insert(id);
        }
        self.persist();
        self.recompute();
    }

    /// Attach a photo reference to every catalog entry with `id`.
    /// Unknown ids are ignored.
    pub fn attach_photo(&mut self, id: MovieId, uri: String) {
        let mut found = false;
        for record in self.state.raw_catalog.iter_mut().filter(|r| r.id == id) {
            record.photo_uri = Some(uri.clone());
            found = true;
        }
        if !found {
            tracing::debug!(error = %CoreError::NotFound(id), "attach_photo ignored");
            return;
        }
        self.photos.insert(id, uri);
        self.persist();
        self.recompute();
    }

    /// Wait for the next completion and apply it. Returns `false` when no
    /// further events can arrive.
    pub async fn next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no refresh is in flight.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            if !self.next_event().await {
                break;
            }
        }
    }

    /// Apply a completion delivered from a fetch task.
    pub fn handle_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::RefreshFinished { generation, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "discarding superseded refresh"
                    );
                    return;
                }
                match result {
                    Ok(records) => self.commit_catalog(records),
                    Err(e) => {
                        tracing::warn!(generation, error = %e, "refresh failed");
                        self.state.raw_catalog.clear();
                        self.state.selection = None;
                        self.state.status = LoadStatus::Error(e.to_string());
                        self.recompute();
                    }
                }
            }
        }
    }

    /// Flush pending annotation writes and stop the writer.
    pub async fn shutdown(mut self) {
        self.writer.shutdown().await;
    }

    fn commit_catalog(&mut self, mut records: Vec<MovieRecord>) {
        let previous: HashMap<MovieId, &str> = self
            .state
            .raw_catalog
            .iter()
            .filter_map(|r| r.photo_uri.as_deref().map(|uri| (r.id, uri)))
            .collect();

        for record in &mut records {
            let carried = previous
                .get(&record.id)
                .copied()
                .or_else(|| self.photos.get(&record.id).map(String::as_str));
            if let Some(uri) = carried {
                record.photo_uri = Some(uri.to_string());
            }
        }

        tracing::info!(generation = self.generation, count = records.len(), "catalog replaced");
        self.state.raw_catalog = records;
        self.state.status = LoadStatus::Ready;
        self.recompute();
    }

    fn recompute(&mut self) {
        let projection = project(
            &self.state.raw_catalog,
            &self.state.liked_ids,
            &self.state.settings,
            self.state.selection,
        );
        self.state.visible = projection.visible;
        self.state.selection = projection.selection;
    }

    fn persist(&self) {
        self.writer.submit(Annotations {
            liked: self.state.liked_ids.clone(),
            photos: self.photos.clone(),
        });
    }
}

/// Background task applying annotation snapshots in submission order.
struct AnnotationWriter {
    tx: Option<mpsc::UnboundedSender<Annotations>>,
    handle: Option<JoinHandle<()>>,
}

impl AnnotationWriter {
    fn spawn(store: Arc<dyn AnnotationStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Annotations>();
        let handle = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                let store = Arc::clone(&store);
                match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
                    Ok(Ok(())) => tracing::debug!("annotations saved"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "failed to save annotations"),
                    Err(e) => tracing::warn!(error = %e, "annotation save task failed"),
                }
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    fn submit(&self, snapshot: Annotations) {
        if let Some(tx) = &self.tx
            && tx.send(snapshot).is_err()
        {
            tracing::warn!("annotation writer stopped; change not persisted");
        }
    }

    async fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "annotation writer panicked");
        }
    }
}
