use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// On-disk snapshot record. `total_count` is redundant with the list and kept
/// for external diagnostics only; load always trusts the list.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    subscribers: Vec<i64>,
    last_updated: String,
    total_count: usize,
}

/// Shared recipient set with a write-through JSON snapshot. The set mutex is
/// held only for membership changes and snapshot copies; file writes happen
/// outside it, serialized by a dedicated persist mutex. A failed write is
/// logged and the in-memory set stays authoritative.
pub struct Registry {
    path: PathBuf,
    set: Mutex<HashSet<i64>>,
    persist_lock: Mutex<()>,
    #[cfg(test)]
    save_count: std::sync::atomic::AtomicUsize,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            set: Mutex::new(HashSet::new()),
            persist_lock: Mutex::new(()),
            #[cfg(test)]
            save_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn save_count(&self) -> usize {
        self.save_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Load the persisted snapshot. A missing file starts an empty registry;
    /// a corrupt file is logged and treated the same rather than aborting.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let registry = Self::new(path);
        if !Path::new(&registry.path).exists() {
            info!("no subscriber snapshot at {}, starting empty", registry.path.display());
            return registry;
        }
        let parsed: Result<SnapshotFile> = std::fs::read_to_string(&registry.path)
            .context("reading snapshot")
            .and_then(|text| serde_json::from_str(&text).context("parsing snapshot"));
        match parsed {
            Ok(snapshot) => {
                let mut set = registry.set.lock().expect("registry lock poisoned");
                set.extend(snapshot.subscribers.iter().copied());
                info!("loaded {} subscribers from {}", set.len(), registry.path.display());
            }
            Err(e) => {
                error!("failed to load subscriber snapshot: {:#}", e);
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.set.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: i64) -> bool {
        self.set.lock().expect("registry lock poisoned").contains(&id)
    }

    /// Point-in-time copy for iteration; the dispatcher never walks the live set.
    pub fn snapshot(&self) -> Vec<i64> {
        self.set.lock().expect("registry lock poisoned").iter().copied().collect()
    }

    /// Insert one id. Returns true (and persists) only when it was new.
    pub fn add(&self, id: i64) -> bool {
        let added = self.set.lock().expect("registry lock poisoned").insert(id);
        if added {
            info!("added subscriber {}", id);
            self.persist();
        }
        added
    }

    /// Merge a batch of ids with a single persistence write. Returns how many
    /// were new.
    pub fn add_many(&self, ids: &[i64]) -> usize {
        let added = {
            let mut set = self.set.lock().expect("registry lock poisoned");
            ids.iter().filter(|id| set.insert(**id)).count()
        };
        if added > 0 {
            self.persist();
        }
        added
    }

    /// Remove one id, idempotently.
    pub fn remove(&self, id: i64) -> bool {
        let removed = self.set.lock().expect("registry lock poisoned").remove(&id);
        if removed {
            self.persist();
        }
        removed
    }

    /// Remove a batch of ids with a single persistence write. Returns how many
    /// were present.
    pub fn remove_many(&self, ids: &[i64]) -> usize {
        let removed = {
            let mut set = self.set.lock().expect("registry lock poisoned");
            ids.iter().filter(|id| set.remove(id)).count()
        };
        if removed > 0 {
            warn!("removed {} unreachable subscribers", removed);
            self.persist();
        }
        removed
    }

    /// Write the snapshot file: temp file in the same directory, then rename.
    pub fn save(&self) -> Result<()> {
        let subscribers = self.snapshot();
        let _guard = self.persist_lock.lock().expect("persist lock poisoned");
        let snapshot = SnapshotFile {
            total_count: subscribers.len(),
            last_updated: chrono::Utc::now().to_rfc3339(),
            subscribers,
        };
        let body = serde_json::to_string_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        #[cfg(test)]
        self.save_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("failed to persist subscribers to {}: {:#}", self.path.display(), e);
        }
    }
}
