//! Debounced suggestion fetching
//!
//! Keystrokes arrive through [`SuggestionFetcher::search`]. Each call bumps
//! the session generation and re-arms the debounce timer; when the timer
//! fires, one request is issued for that generation's text. A response is
//! applied only if its generation is still current when it resolves, so the
//! last keystroke wins regardless of arrival order.
//!
//! Queries below the minimum length never hit the network: the default list
//! (the entity list loaded by the orchestrator) is shown instead.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::config::TimingConfig;
use crate::context::SharedContext;
use crate::debounce::Debouncer;
use crate::kinds::EntityKind;
use crate::model::{EntitySummary, SearchSnapshot, SearchStatus};
use crate::normalize::{dedupe_by_id, normalize_suggestions};
use crate::notify::{lock, ChangeNotifier};

/// Limits applied by the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub max_suggestions: usize,
    pub default_preview_limit: usize,
}

impl From<&TimingConfig> for SuggestionSettings {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            debounce: timing.debounce(),
            min_query_len: timing.min_query_len,
            max_suggestions: timing.max_suggestions,
            default_preview_limit: timing.default_preview_limit,
        }
    }
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

#[derive(Default)]
struct SearchState {
    query_text: String,
    generation: u64,
    candidates: Vec<EntitySummary>,
    status: SearchStatus,
    defaults: Vec<EntitySummary>,
}

impl SearchState {
    fn show_defaults(&mut self, limit: usize) {
        self.candidates = self.defaults.iter().take(limit).cloned().collect();
        self.status = if self.candidates.is_empty() {
            SearchStatus::Empty
        } else {
            SearchStatus::Ready
        };
    }
}

/// Case-insensitive match on label or id, de-duplicated and capped
pub fn shape_candidates(candidates: Vec<EntitySummary>, query: &str, limit: usize) -> Vec<EntitySummary> {
    let needle = query.trim().to_lowercase();
    let matching = candidates
        .into_iter()
        .filter(|candidate| candidate.matches(&needle))
        .collect();
    let mut shaped = dedupe_by_id(matching);
    shaped.truncate(limit);
    shaped
}

pub struct SuggestionFetcher {
    kind: Arc<EntityKind>,
    context: Arc<SharedContext>,
    backend: Arc<dyn Backend>,
    settings: SuggestionSettings,
    state: Arc<Mutex<SearchState>>,
    debouncer: Mutex<Debouncer>,
    notifier: ChangeNotifier,
}

impl SuggestionFetcher {
    pub fn new(
        kind: Arc<EntityKind>,
        context: Arc<SharedContext>,
        backend: Arc<dyn Backend>,
        settings: SuggestionSettings,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            kind,
            context,
            backend,
            settings,
            state: Arc::new(Mutex::new(SearchState::default())),
            debouncer: Mutex::new(Debouncer::new(settings.debounce)),
            notifier,
        }
    }

    /// Handle one keystroke's worth of input
    pub fn search(&self, text: &str) {
        let query = text.trim().to_string();
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.query_text = text.to_string();
            state.generation
        };
        lock(&self.debouncer).cancel();

        if query.chars().count() < self.settings.min_query_len {
            lock(&self.state).show_defaults(self.settings.default_preview_limit);
            self.notifier.notify();
            return;
        }

        lock(&self.state).status = SearchStatus::Pending;
        self.notifier.notify();

        let state = Arc::clone(&self.state);
        let kind = Arc::clone(&self.kind);
        let context = Arc::clone(&self.context);
        let backend = Arc::clone(&self.backend);
        let notifier = self.notifier.clone();
        let limit = self.settings.max_suggestions;

        lock(&self.debouncer).arm(move || {
            {
                let mut current = lock(&state);
                if current.generation != generation {
                    return;
                }
                if !context.is_ready() {
                    debug!("Skipping {} suggestions: context not ready", kind.name);
                    current.candidates.clear();
                    current.status = SearchStatus::Empty;
                    drop(current);
                    notifier.notify();
                    return;
                }
                current.status = SearchStatus::Loading;
            }
            notifier.notify();

            tokio::spawn(async move {
                let candidates = match backend.fetch_suggestions(&kind, &query).await {
                    Ok(raw) => shape_candidates(normalize_suggestions(&raw, &kind), &query, limit),
                    Err(e) => {
                        warn!("Suggestion request for {} '{}' failed: {}", kind.name, query, e);
                        Vec::new()
                    }
                };

                let mut current = lock(&state);
                if current.generation != generation {
                    debug!(
                        "Discarding stale {} suggestions (generation {}, current {})",
                        kind.name, generation, current.generation
                    );
                    return;
                }
                current.status = if candidates.is_empty() {
                    SearchStatus::Empty
                } else {
                    SearchStatus::Ready
                };
                current.candidates = candidates;
                drop(current);
                notifier.notify();
            });
        });
    }

    /// Replace the default/recent list shown for short queries
    pub fn set_defaults(&self, defaults: Vec<EntitySummary>) {
        let mut state = lock(&self.state);
        state.defaults = defaults;
        let showing_defaults = state.status != SearchStatus::Idle
            && state.query_text.trim().chars().count() < self.settings.min_query_len;
        if showing_defaults {
            state.show_defaults(self.settings.default_preview_limit);
            drop(state);
            self.notifier.notify();
        }
    }

    /// Back to idle: cancel the timer and make in-flight responses stale
    pub fn reset(&self) {
        lock(&self.debouncer).cancel();
        let mut state = lock(&self.state);
        state.generation += 1;
        state.query_text.clear();
        state.candidates.clear();
        state.status = SearchStatus::Idle;
        drop(state);
        self.notifier.notify();
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let state = lock(&self.state);
        SearchSnapshot {
            query_text: state.query_text.clone(),
            generation: state.generation,
            candidates: state.candidates.clone(),
            status: state.status,
        }
    }
}
