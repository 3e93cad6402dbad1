use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Table of named mutexes, one per key, created on first use
///
/// Guards only serialize callers that share a key. A poisoned entry is
/// recovered since the guarded data is `()`.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the mutex for `key`
    pub fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `f` while holding the mutex for `key`
pub fn with_lock<T>(locks: &KeyedLocks, key: &str, f: impl FnOnce() -> T) -> T {
    let handle = locks.handle(key);
    let _guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}
