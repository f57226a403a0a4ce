//! Entity orchestrator
//!
//! Composes the list/filter state, the debounced suggestion fetcher and the
//! selection-keyed profile loader for one entity kind, and exposes a single
//! read model plus intent methods. One generic type serves every kind; the
//! differences live in the [`EntityKind`] value it is built with.
//!
//! All fetch failures are absorbed here: a failed list becomes an empty list,
//! a failed profile becomes `None` with an `Error` status.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::context::SharedContext;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::kinds::EntityKind;
use crate::model::{
    EntityProfile, EntitySummary, FilterMap, ListSnapshot, ListStatus, SearchSnapshot,
    SearchStatus, SelectionSnapshot, SelectionStatus,
};
use crate::normalize::normalize_list;
use crate::notify::{lock, ChangeNotifier};
use crate::profile::ProfileLoader;
use crate::suggest::{SuggestionFetcher, SuggestionSettings};

#[derive(Default)]
struct ListState {
    items: Vec<EntitySummary>,
    status: ListStatus,
    filters: FilterMap,
    generation: u64,
}

/// Everything the UI layer reads from one orchestrator
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorView {
    pub kind: String,
    pub list: ListSnapshot,
    pub selection: SelectionSnapshot,
    pub search: SearchSnapshot,
}

impl OrchestratorView {
    pub fn profile(&self) -> Option<&EntityProfile> {
        self.selection.profile.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.selected_id.as_deref()
    }

    pub fn list_loading(&self) -> bool {
        self.list.status == ListStatus::Loading
    }

    pub fn profile_loading(&self) -> bool {
        self.selection.status == SelectionStatus::Loading
    }

    pub fn profile_error(&self) -> Option<&str> {
        self.selection.error.as_deref()
    }

    pub fn search_pending(&self) -> bool {
        matches!(self.search.status, SearchStatus::Pending | SearchStatus::Loading)
    }

    /// True while any fetch is armed or in flight
    pub fn is_busy(&self) -> bool {
        self.list_loading() || self.profile_loading() || self.search_pending()
    }
}

struct Inner {
    kind: Arc<EntityKind>,
    context: Arc<SharedContext>,
    backend: Arc<dyn Backend>,
    list: Mutex<ListState>,
    suggestions: SuggestionFetcher,
    profiles: ProfileLoader,
    notifier: ChangeNotifier,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.abort();
        }
    }
}

/// Cheap-to-clone handle; clones share state
#[derive(Clone)]
pub struct EntityOrchestrator {
    inner: Arc<Inner>,
}

impl EntityOrchestrator {
    /// Build an orchestrator. Timing settings are read from the context now,
    /// falling back to defaults if nothing is installed yet.
    pub fn new(kind: EntityKind, context: Arc<SharedContext>, backend: Arc<dyn Backend>) -> Self {
        let kind = Arc::new(kind);
        let timing = context.timing();
        let notifier = ChangeNotifier::new();

        let suggestions = SuggestionFetcher::new(
            Arc::clone(&kind),
            Arc::clone(&context),
            Arc::clone(&backend),
            SuggestionSettings::from(&timing),
            notifier.clone(),
        );
        let profiles = ProfileLoader::new(
            Arc::clone(&kind),
            Arc::clone(&backend),
            timing.request_timeout(),
            notifier.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                kind,
                context,
                backend,
                list: Mutex::new(ListState::default()),
                suggestions,
                profiles,
                notifier,
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> &EntityKind {
        &self.inner.kind
    }

    /// Load the list as soon as the context is ready (immediately if it
    /// already is). Calling again replaces the previous watcher.
    pub fn start(&self) {
        if self.inner.context.is_ready() {
            if let Some(previous) = lock(&self.inner.watcher).take() {
                previous.abort();
            }
            self.refresh_list();
            return;
        }

        // The watcher must not keep the orchestrator alive
        let inner = Arc::downgrade(&self.inner);
        let context = Arc::clone(&self.inner.context);
        let handle = tokio::spawn(async move {
            context.wait_ready().await;
            if let Some(inner) = inner.upgrade() {
                EntityOrchestrator { inner }.refresh_list();
            }
        });
        if let Some(previous) = lock(&self.inner.watcher).replace(handle) {
            previous.abort();
        }
    }

    /// Stop watching the context and drop any search session
    pub fn shutdown(&self) {
        if let Some(watcher) = lock(&self.inner.watcher).take() {
            watcher.abort();
        }
        self.inner.suggestions.reset();
    }

    /// Re-run the list fetch with the active filters. Returns false when the
    /// context is not ready and nothing was issued.
    pub fn refresh_list(&self) -> bool {
        let inner = &self.inner;
        if !inner.context.is_ready() {
            debug!("Skipping {} list fetch: context not ready", inner.kind.name);
            return false;
        }

        let (generation, filters) = {
            let mut list = lock(&inner.list);
            list.generation += 1;
            list.status = ListStatus::Loading;
            (list.generation, list.filters.clone())
        };
        inner.notifier.notify();

        let this = self.clone();
        tokio::spawn(async move {
            let inner = &this.inner;
            let items = match inner.backend.fetch_list(&inner.kind, &filters).await {
                Ok(raw) => normalize_list(&raw, &inner.kind),
                Err(e) => {
                    warn!("List request for {} failed: {}", inner.kind.name, e);
                    Vec::new()
                }
            };

            {
                let mut list = lock(&inner.list);
                if list.generation != generation {
                    debug!("Discarding stale {} list (generation {})", inner.kind.name, generation);
                    return;
                }
                info!("Loaded {} {} entries", items.len(), inner.kind.name);
                list.items = items.clone();
                list.status = ListStatus::Ready;
            }
            inner.suggestions.set_defaults(items);
            inner.notifier.notify();
        });
        true
    }

    /// Replace one filter's values. Empty values remove the filter. Returns
    /// true if the filters changed (and a list fetch was triggered).
    pub fn set_filter(&self, key: &str, values: Vec<String>) -> OrchestratorResult<bool> {
        let inner = &self.inner;
        if !inner.kind.allows_filter(key) {
            return Err(OrchestratorError::UnknownFilter {
                kind: inner.kind.name.clone(),
                key: key.to_string(),
            });
        }

        let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            let value = value.trim().to_string();
            if !value.is_empty() && !cleaned.contains(&value) {
                cleaned.push(value);
            }
        }

        {
            let mut list = lock(&inner.list);
            let current = list.filters.get(key).map(Vec::as_slice).unwrap_or(&[]);
            if current == cleaned.as_slice() {
                return Ok(false);
            }
            if cleaned.is_empty() {
                list.filters.remove(key);
            } else {
                list.filters.insert(key.to_string(), cleaned);
            }
        }
        inner.notifier.notify();

        self.refresh_list();
        Ok(true)
    }

    /// Remove every filter and reload the list
    pub fn clear_filters(&self) -> bool {
        let changed = {
            let mut list = lock(&self.inner.list);
            let changed = !list.filters.is_empty();
            list.filters.clear();
            changed
        };
        if changed {
            self.inner.notifier.notify();
            self.refresh_list();
        }
        changed
    }

    /// Select an entity by id. Re-selecting the current id is a no-op.
    pub fn select_by_id(&self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            self.inner.profiles.clear();
            return false;
        }
        if !self.inner.context.is_ready() {
            debug!("Skipping {} profile {}: context not ready", self.inner.kind.name, id);
            return false;
        }
        self.inner.profiles.select(Some(id))
    }

    /// Feed search input (one call per keystroke)
    pub fn search(&self, text: &str) {
        self.inner.suggestions.search(text);
    }

    /// Clear the selection and the search session
    pub fn clear(&self) {
        self.inner.profiles.clear();
        self.inner.suggestions.reset();
    }

    pub fn view(&self) -> OrchestratorView {
        let list = {
            let list = lock(&self.inner.list);
            ListSnapshot {
                items: list.items.clone(),
                status: list.status,
                filters: list.filters.clone(),
            }
        };
        OrchestratorView {
            kind: self.inner.kind.name.clone(),
            list,
            selection: self.inner.profiles.snapshot(),
            search: self.inner.suggestions.snapshot(),
        }
    }

    /// Change notifications; the value is a version counter
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.notifier.subscribe()
    }

    /// Wait until nothing is armed or in flight
    pub async fn settled(&self) -> OrchestratorView {
        let mut changes = self.subscribe();
        loop {
            let view = self.view();
            if !view.is_busy() {
                return view;
            }
            if changes.changed().await.is_err() {
                return self.view();
            }
        }
    }
}
