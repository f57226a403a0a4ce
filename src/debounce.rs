//! Cancellable scheduled task handle
//!
//! A `Debouncer` owns at most one armed timer. Arming a new one aborts the
//! previous timer, so only the last call in a burst ever fires.

use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, handle: None }
    }

    /// Run `fire` once the quiet period elapses, replacing any armed timer.
    ///
    /// `fire` runs synchronously on the timer task. Work it spawns is not
    /// affected by later `arm`/`cancel` calls.
    pub fn arm<F>(&mut self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        }));
    }

    /// Abort the armed timer. Returns true if one was still pending.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
