//! Per-target classpath cache
//!
//! Records live for a fixed timeout after capture. Each target has its own async
//! lock; a resolution pass holds it from lookup to store, so concurrent requests
//! for one target run at most one build-tool query while other targets proceed
//! in parallel.
//!
//! While a bulk import is in progress ([`ImportMode`]) every lookup misses and
//! nothing is stored, since module ownership is still settling.

use crate::model::ResolvedClasspath;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(30);

/// Process-wide "bulk import in progress" flag.
///
/// Nested imports are counted; the flag clears when the last guard drops.
#[derive(Debug, Clone, Default)]
pub struct ImportMode {
    depth: Arc<AtomicUsize>,
}

impl ImportMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> ImportGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        ImportGuard {
            depth: self.depth.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

#[must_use = "import mode ends when the guard is dropped"]
#[derive(Debug)]
pub struct ImportGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct CacheRecord {
    pub classpath: ResolvedClasspath,
    pub captured_at: Instant,
    generation: u64,
}

impl CacheRecord {
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

/// A record whose age equals the timeout is still served
fn is_expired(age: Duration, timeout: Duration) -> bool {
    age > timeout
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Empty,
    Expired,
    Invalidated,
    ImportInProgress,
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(ResolvedClasspath),
    Miss(MissReason),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

type Slot = Arc<AsyncMutex<Option<CacheRecord>>>;

pub struct ResolutionCache {
    timeout: Duration,
    import_mode: ImportMode,
    generation: AtomicU64,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ResolutionCache {
    pub fn new(timeout: Duration, import_mode: ImportMode) -> Self {
        Self {
            timeout,
            import_mode,
            generation: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn import_mode(&self) -> &ImportMode {
        &self.import_mode
    }

    /// Enters the critical section for `target`.
    ///
    /// Waits while another pass for the same target is in flight.
    pub async fn lock(&self, target: &str) -> CacheEntry<'_> {
        let slot = self.slot(target);
        let guard = slot.lock_owned().await;
        CacheEntry {
            cache: self,
            generation: self.current_generation(),
            guard,
        }
    }

    pub async fn get(&self, target: &str) -> Lookup {
        self.lock(target).await.lookup()
    }

    pub async fn put(&self, target: &str, classpath: ResolvedClasspath) -> bool {
        self.lock(target).await.store(classpath)
    }

    /// Forgets every record. Passes already in flight still return their result,
    /// but it is not kept.
    pub fn invalidate_all(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        for slot in slots.values() {
            // busy slots are caught by the generation check on their next lookup
            if let Ok(mut record) = slot.try_lock() {
                *record = None;
            }
        }
        debug!(generation, targets = slots.len(), "Invalidated all cached classpaths");
    }

    pub fn len(&self) -> usize {
        let slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots
            .values()
            .filter(|slot| slot.try_lock().map(|r| r.is_some()).unwrap_or(true))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, target: &str) -> Slot {
        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TIMEOUT, ImportMode::new())
    }
}

/// Exclusive access to one target's record
pub struct CacheEntry<'a> {
    cache: &'a ResolutionCache,
    /// generation seen when the critical section was entered
    generation: u64,
    guard: OwnedMutexGuard<Option<CacheRecord>>,
}

impl CacheEntry<'_> {
    /// Whether a record exists at all, fresh or not
    pub fn has_record(&self) -> bool {
        self.guard.is_some()
    }

    /// Returns the cached classpath if it is still fresh; stale records are dropped
    pub fn lookup(&mut self) -> Lookup {
        let Some(record) = (*self.guard).as_ref() else {
            return Lookup::Miss(MissReason::Empty);
        };

        let reason = if self.cache.import_mode.is_active() {
            MissReason::ImportInProgress
        } else if record.generation != self.cache.current_generation() {
            MissReason::Invalidated
        } else if is_expired(record.age(), self.cache.timeout) {
            MissReason::Expired
        } else {
            return Lookup::Hit(record.classpath.clone());
        };

        *self.guard = None;
        Lookup::Miss(reason)
    }

    /// Stores a freshly computed classpath; skipped while an import is running
    pub fn store(&mut self, classpath: ResolvedClasspath) -> bool {
        if self.cache.import_mode.is_active() {
            debug!("Import in progress, not caching classpath");
            return false;
        }
        if self.generation != self.cache.current_generation() {
            debug!("Cache invalidated during the pass, not caching classpath");
            return false;
        }

        *self.guard = Some(CacheRecord {
            classpath,
            captured_at: Instant::now(),
            generation: self.generation,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classpath() -> ResolvedClasspath {
        let mut cp = ResolvedClasspath::new();
        cp.push_module("/lib-core");
        cp.push_library(PathBuf::from("/base/external/foo/foo.jar"), None);
        cp
    }

    #[tokio::test]
    async fn test_put_then_get_hits() {
        let cache = ResolutionCache::default();
        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::Empty)
        ));

        assert!(cache.put("//app:main", classpath()).await);

        match cache.get("//app:main").await {
            Lookup::Hit(cp) => assert!(cp.same_entries(&classpath())),
            other => panic!("expected hit, got {:?}", other),
        }
        assert!(!cache.get("//other:bin").await.is_hit());
    }

    #[tokio::test]
    async fn test_expired_record_misses() {
        let cache = ResolutionCache::new(Duration::from_millis(20), ImportMode::new());
        cache.put("//app:main", classpath()).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::Expired)
        ));
        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::Empty)
        ));
    }

    #[tokio::test]
    async fn test_import_mode_bypasses_and_does_not_store() {
        let import = ImportMode::new();
        let cache = ResolutionCache::new(DEFAULT_CACHE_TIMEOUT, import.clone());

        {
            let _guard = import.begin();
            assert!(!cache.put("//app:main", classpath()).await);
            assert!(!cache.get("//app:main").await.is_hit());
        }

        assert!(!import.is_active());
        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::Empty)
        ));
    }

    #[tokio::test]
    async fn test_import_mode_drops_existing_record() {
        let import = ImportMode::new();
        let cache = ResolutionCache::new(DEFAULT_CACHE_TIMEOUT, import.clone());
        cache.put("//app:main", classpath()).await;

        let guard = import.begin();
        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::ImportInProgress)
        ));
        drop(guard);

        assert!(!cache.get("//app:main").await.is_hit());
    }

    #[test]
    fn test_nested_import_guards() {
        let import = ImportMode::new();
        let outer = import.begin();
        let inner = import.begin();
        drop(outer);
        assert!(import.is_active());
        drop(inner);
        assert!(!import.is_active());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = ResolutionCache::default();
        cache.put("//app:main", classpath()).await;
        cache.put("//lib:core", classpath()).await;
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert!(!cache.get("//app:main").await.is_hit());
        assert!(!cache.get("//lib:core").await.is_hit());
    }

    #[tokio::test]
    async fn test_invalidate_all_catches_busy_slot() {
        let cache = ResolutionCache::default();
        cache.put("//app:main", classpath()).await;

        let mut entry = cache.lock("//app:main").await;
        cache.invalidate_all();
        assert!(matches!(entry.lookup(), Lookup::Miss(MissReason::Invalidated)));
        assert!(!entry.has_record());
    }

    #[tokio::test]
    async fn test_invalidate_all_during_pass_discards_result() {
        let cache = ResolutionCache::default();

        let mut entry = cache.lock("//app:main").await;
        cache.invalidate_all();
        assert!(!entry.store(classpath()));
        drop(entry);

        assert!(matches!(
            cache.get("//app:main").await,
            Lookup::Miss(MissReason::Empty)
        ));
    }

    #[tokio::test]
    async fn test_zero_timeout_expires_after_any_delay() {
        let cache = ResolutionCache::new(Duration::ZERO, ImportMode::new());
        cache.put("//app:main", classpath()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!cache.get("//app:main").await.is_hit());
    }

    #[test]
    fn test_expiry_boundary() {
        let timeout = Duration::from_secs(30);
        assert!(!is_expired(Duration::from_secs(29), timeout));
        assert!(!is_expired(timeout, timeout));
        assert!(is_expired(timeout + Duration::from_millis(1), timeout));
    }

    #[tokio::test]
    async fn test_same_target_is_serialized() {
        let cache = Arc::new(ResolutionCache::default());
        let entry = cache.lock("//app:main").await;

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("//app:main").await.is_hit() })
        };
        // a different target is not blocked
        assert!(!cache.get("//lib:core").await.is_hit());

        let mut entry = entry;
        entry.store(classpath());
        drop(entry);

        assert!(waiter.await.unwrap());
    }
}
