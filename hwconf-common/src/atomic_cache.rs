//! Read-through cache of atomic type descriptors
//!
//! Entries are scoped by package set. A miss triggers one bulk load of every
//! atomic in the scope and builds the name and id indexes from that list; an
//! entry is never patched afterwards, only rebuilt after `invalidate`.
//! Concurrent misses on the same scope share a single in-flight load.

use crate::db::models::AtomicType;
use crate::store::AtomicSource;
use crate::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

/// Sorted, de-duplicated set of package ids an entry is built for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheScope(Vec<i64>);

impl CacheScope {
    pub fn new<I: IntoIterator<Item = i64>>(package_ids: I) -> Self {
        let ids: BTreeSet<i64> = package_ids.into_iter().collect();
        Self(ids.into_iter().collect())
    }

    pub fn package_ids(&self) -> &[i64] {
        &self.0
    }
}

impl From<i64> for CacheScope {
    fn from(package_id: i64) -> Self {
        Self(vec![package_id])
    }
}

impl From<&[i64]> for CacheScope {
    fn from(package_ids: &[i64]) -> Self {
        Self::new(package_ids.iter().copied())
    }
}

/// Lifecycle of one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Slot allocated, load not finished (or the last load failed)
    Created,
    Populated,
    /// Invalidated; the next access rebuilds it
    Stale,
}

/// Immutable snapshot for one scope
#[derive(Debug)]
pub struct AtomicCacheEntry {
    raw_data: Arc<[AtomicType]>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
}

impl AtomicCacheEntry {
    /// Build both indexes from the ordered descriptor list
    pub fn build(raw_data: Vec<AtomicType>) -> Self {
        let mut by_name = HashMap::with_capacity(raw_data.len());
        let mut by_id = HashMap::with_capacity(raw_data.len());
        for (position, atomic) in raw_data.iter().enumerate() {
            // First row in query order wins on duplicate names, matching the uncached lookup
            by_name.entry(atomic.name.to_uppercase()).or_insert(position);
            by_id.insert(atomic.id, position);
        }
        Self {
            raw_data: raw_data.into(),
            by_name,
            by_id,
        }
    }

    pub fn raw_data(&self) -> Arc<[AtomicType]> {
        Arc::clone(&self.raw_data)
    }

    pub fn by_name(&self, name: &str) -> Option<&AtomicType> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|&position| &self.raw_data[position])
    }

    pub fn by_id(&self, id: i64) -> Option<&AtomicType> {
        self.by_id.get(&id).map(|&position| &self.raw_data[position])
    }
}

struct ScopeSlot {
    cell: Arc<OnceCell<Arc<AtomicCacheEntry>>>,
    stale: bool,
}

impl ScopeSlot {
    fn fresh() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            stale: false,
        }
    }
}

/// Cache service; hold one per process and share it by reference
pub struct AtomicTypeCache<S> {
    source: Arc<S>,
    enabled: bool,
    scopes: Mutex<HashMap<CacheScope, ScopeSlot>>,
}

impl<S: AtomicSource> AtomicTypeCache<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_enabled(source, true)
    }

    /// A disabled cache forwards every call to the store
    pub fn with_enabled(source: Arc<S>, enabled: bool) -> Self {
        Self {
            source,
            enabled,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// All atomics of the scope, ordered by ascending atomic identifier
    pub async fn get_all(&self, scope: impl Into<CacheScope>) -> Result<Arc<[AtomicType]>> {
        let scope = scope.into();
        if !self.enabled {
            let rows = self.source.select_all_atomics(scope.package_ids()).await?;
            return Ok(rows.into());
        }
        Ok(self.entry(&scope).await?.raw_data())
    }

    /// Case-insensitive name lookup
    pub async fn get_by_name(
        &self,
        scope: impl Into<CacheScope>,
        name: &str,
    ) -> Result<Option<AtomicType>> {
        let scope = scope.into();
        if !self.enabled {
            return self.source.select_atomic_by_name(scope.package_ids(), name).await;
        }
        Ok(self.entry(&scope).await?.by_name(name).cloned())
    }

    /// Direct store lookup; without a scope there is no entry to consult
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AtomicType>> {
        self.source.select_atomic_by_id(id).await
    }

    /// Id lookup answered from the scope's `by_id` index
    pub async fn get_by_id_in_scope(
        &self,
        scope: impl Into<CacheScope>,
        id: i64,
    ) -> Result<Option<AtomicType>> {
        let scope = scope.into();
        if !self.enabled {
            let rows = self.source.select_all_atomics(scope.package_ids()).await?;
            return Ok(rows.into_iter().find(|atomic| atomic.id == id));
        }
        Ok(self.entry(&scope).await?.by_id(id).cloned())
    }

    /// `None` for scopes that were never touched
    pub fn state(&self, scope: impl Into<CacheScope>) -> Option<ScopeState> {
        let scope = scope.into();
        let scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes.get(&scope).map(|slot| {
            if slot.stale {
                ScopeState::Stale
            } else if slot.cell.initialized() {
                ScopeState::Populated
            } else {
                ScopeState::Created
            }
        })
    }

    /// Mark a scope stale so the next access rebuilds it wholesale
    pub fn invalidate(&self, scope: impl Into<CacheScope>) {
        let scope = scope.into();
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = scopes.get_mut(&scope) {
            debug!(package_ids = ?scope.package_ids(), "Atomic cache scope invalidated");
            slot.stale = true;
        }
    }

    pub fn invalidate_all(&self) {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        for slot in scopes.values_mut() {
            slot.stale = true;
        }
    }

    async fn entry(&self, scope: &CacheScope) -> Result<Arc<AtomicCacheEntry>> {
        let cell = {
            let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = scopes.entry(scope.clone()).or_insert_with(ScopeSlot::fresh);
            if slot.stale {
                *slot = ScopeSlot::fresh();
            }
            Arc::clone(&slot.cell)
        };

        let entry = cell
            .get_or_try_init(|| async {
                let rows = self.source.select_all_atomics(scope.package_ids()).await?;
                debug!(
                    package_ids = ?scope.package_ids(),
                    count = rows.len(),
                    "Atomic cache scope populated"
                );
                Ok::<_, crate::Error>(Arc::new(AtomicCacheEntry::build(rows)))
            })
            .await?;

        Ok(Arc::clone(entry))
    }
}
