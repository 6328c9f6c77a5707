//! Deferred run reports.
//!
//! A combination run produces progress and error lines as it goes. They are
//! collected per run and posted as one comment at the end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::CombineTrigger;

/// Buffered report lines for every run in flight, keyed by the run's trigger.
///
/// Cheap to clone; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct ReportBuffer {
    inner: Arc<Mutex<HashMap<CombineTrigger, Vec<String>>>>,
}

impl ReportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to `key`'s report and logs it.
    pub fn append(&self, key: CombineTrigger, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(
            project = %key.project,
            request = %key.request,
            "{message}"
        );
        self.lock().entry(key).or_default().push(message);
    }

    /// Removes `key`'s report and joins it with newlines. `None` if nothing
    /// was recorded.
    pub fn drain_and_format(&self, key: CombineTrigger) -> Option<String> {
        let lines = self.lock().remove(&key)?;
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Drops `key`'s report unsent.
    pub fn discard(&self, key: CombineTrigger) {
        self.lock().remove(&key);
    }

    /// Opens the report for one run.
    pub fn open(&self, key: CombineTrigger) -> RunReport {
        RunReport {
            key,
            buffer: self.clone(),
        }
    }

    // Each operation is a single map call, so a poisoned lock still holds a
    // consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<CombineTrigger, Vec<String>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One run's view of the [`ReportBuffer`].
///
/// Drained exactly once with [`finish`](Self::finish). A report dropped
/// without being drained is discarded so a crashed run leaves nothing behind.
#[derive(Debug)]
pub struct RunReport {
    key: CombineTrigger,
    buffer: ReportBuffer,
}

impl RunReport {
    pub fn key(&self) -> CombineTrigger {
        self.key
    }

    pub fn line(&self, message: impl Into<String>) {
        self.buffer.append(self.key, message);
    }

    /// Takes the formatted report, consuming the handle.
    pub fn finish(self) -> Option<String> {
        self.buffer.drain_and_format(self.key)
    }
}

impl Drop for RunReport {
    fn drop(&mut self) {
        self.buffer.discard(self.key);
    }
}
