//! Selection-keyed profile loading
//!
//! A profile is fetched at most once per distinct selection. The guard is
//! identity, not freshness: `last_fetched_id` is recorded before the request
//! is issued, so repeated selections of the same id (while in flight or after
//! it resolved) are no-ops. Each issued fetch also takes a sequence number,
//! and a response is applied only while both its id and its sequence are
//! still current, so an old request for a re-selected id cannot land on top
//! of the newer one.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::OrchestratorError;
use crate::kinds::EntityKind;
use crate::model::{EntityProfile, SelectionSnapshot, SelectionStatus};
use crate::normalize::normalize_profile;
use crate::notify::{lock, ChangeNotifier};

#[derive(Default)]
struct SelectionState {
    selected_id: Option<String>,
    last_fetched_id: Option<String>,
    fetch_seq: u64,
    profile: Option<EntityProfile>,
    status: SelectionStatus,
    error: Option<String>,
}

impl SelectionState {
    /// Back to empty; `fetch_seq` keeps counting
    fn reset(&mut self) {
        *self = Self {
            fetch_seq: self.fetch_seq,
            ..Self::default()
        };
    }

    fn is_current(&self, id: &str, seq: u64) -> bool {
        self.fetch_seq == seq && self.last_fetched_id.as_deref() == Some(id)
    }
}

pub struct ProfileLoader {
    kind: Arc<EntityKind>,
    backend: Arc<dyn Backend>,
    timeout: Option<Duration>,
    state: Arc<Mutex<SelectionState>>,
    notifier: ChangeNotifier,
}

impl ProfileLoader {
    pub fn new(
        kind: Arc<EntityKind>,
        backend: Arc<dyn Backend>,
        timeout: Option<Duration>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            kind,
            backend,
            timeout,
            state: Arc::new(Mutex::new(SelectionState::default())),
            notifier,
        }
    }

    /// Select an entity, or clear with `None`. Returns true if a fetch was
    /// issued.
    pub fn select(&self, id: Option<&str>) -> bool {
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                self.clear();
                return false;
            }
        };

        let seq = {
            let mut state = lock(&self.state);
            if state.last_fetched_id.as_deref() == Some(id.as_str()) {
                debug!("Profile {} for {} already requested", id, self.kind.name);
                return false;
            }
            state.fetch_seq += 1;
            state.selected_id = Some(id.clone());
            state.last_fetched_id = Some(id.clone());
            state.profile = None;
            state.error = None;
            state.status = SelectionStatus::Loading;
            state.fetch_seq
        };
        self.notifier.notify();

        let kind = Arc::clone(&self.kind);
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let notifier = self.notifier.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let fetch = backend.fetch_profile(&kind, &id);
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, fetch)
                    .await
                    .unwrap_or_else(|_| Err(OrchestratorError::Timeout)),
                None => fetch.await,
            };

            let mut current = lock(&state);
            if !current.is_current(&id, seq) {
                debug!("Dropping {} profile {} (fetch {}): selection moved on", kind.name, id, seq);
                return;
            }
            match result {
                Ok(raw) => {
                    current.profile = Some(normalize_profile(&raw, &kind, &id));
                    current.status = SelectionStatus::Ready;
                }
                Err(e) => {
                    warn!("Profile request for {} {} failed: {}", kind.name, id, e);
                    current.profile = None;
                    current.status = SelectionStatus::Error;
                    current.error = Some(e.to_string());
                }
            }
            drop(current);
            notifier.notify();
        });

        true
    }

    /// Drop the selection and profile immediately
    pub fn clear(&self) {
        lock(&self.state).reset();
        self.notifier.notify();
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let state = lock(&self.state);
        SelectionSnapshot {
            selected_id: state.selected_id.clone(),
            last_fetched_id: state.last_fetched_id.clone(),
            profile: state.profile.clone(),
            status: state.status,
            error: state.error.clone(),
        }
    }
}
