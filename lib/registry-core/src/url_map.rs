//! Concurrent map of endpoint names to transport URLs

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

/// UrlMap maps endpoint names to parsed URLs
///
/// Clones share the same entries, so one handle can be given to the interpose
/// server and another to whatever resolves cross-connect endpoints.
#[derive(Clone, Debug, Default)]
pub struct UrlMap {
    entries: Arc<RwLock<HashMap<String, Url>>>,
}

impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a URL, replacing any previous entry for the name
    pub fn store(&self, name: impl Into<String>, url: Url) {
        self.write().insert(name.into(), url);
    }

    /// Get the URL stored for a name
    pub fn load(&self, name: &str) -> Option<Url> {
        self.read().get(name).cloned()
    }

    /// Get the existing URL for a name, or store `url` if there is none.
    /// The flag is true when the returned URL was already present.
    pub fn load_or_store(&self, name: impl Into<String>, url: Url) -> (Url, bool) {
        let mut entries = self.write();
        match entries.entry(name.into()) {
            Entry::Occupied(e) => (e.get().clone(), true),
            Entry::Vacant(e) => (e.insert(url).clone(), false),
        }
    }

    /// Remove the entry for a name. Missing names are ignored.
    pub fn delete(&self, name: &str) {
        self.write().remove(name);
    }

    /// Remove the entry for a name and return it
    pub fn load_and_delete(&self, name: &str) -> Option<Url> {
        self.write().remove(name)
    }

    /// Visit every entry until `visit` returns false.
    ///
    /// Entries are copied out before visiting, so `visit` may call back into
    /// the map.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &Url) -> bool,
    {
        let snapshot: Vec<(String, Url)> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (name, url) in &snapshot {
            if !visit(name, url) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Lock poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Url>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Url>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
