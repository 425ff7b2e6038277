use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Keys with an operation currently running. Used to reject a second
/// settlement for the same user while the first is waiting on the swap API.
#[derive(Debug, Default)]
pub struct InFlightSet {
    keys: Mutex<HashSet<String>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` busy until the returned guard drops; `None` if it already is.
    pub fn acquire(&self, key: &str) -> Option<InFlightGuard<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.insert(key.to_string()).then(|| InFlightGuard {
            set: self,
            key: key.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
