use std::{sync::{Arc, Mutex, MutexGuard, TryLockError}, time::{Duration, Instant}};

use ahash::AHashMap;
use anyhow::anyhow;
use chrono::NaiveDate;

use crate::{
    dataset::HeatRiskLayer,
    day::{normalize_day_label, resource_key},
    error::DashboardError,
    source::DatasetSource,
};

#[derive(Debug)]
struct Entry {
    key: String,
    layer: Arc<HeatRiskLayer>,
    loaded_at: Instant,
}

/// One day label's entry. Its lock is held while the entry is populated.
type Slot = Arc<Mutex<Option<Entry>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Time-bounded memo of parsed daily datasets, keyed by day label.
///
/// Each label has its own slot, so concurrent requests for a missing day fetch
/// once while other days stay available. Failed fetches are never stored.
pub struct DatasetCache<S> {
    source: S,
    ttl: Duration,
    slots: Mutex<AHashMap<String, Slot>>,
}

impl<S: DatasetSource> DatasetCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self { source, ttl, slots: Mutex::new(AHashMap::new()) }
    }

    #[inline] pub fn source(&self) -> &S { &self.source }

    #[inline] pub fn ttl(&self) -> Duration { self.ttl }

    fn slot(&self, label: &str) -> Slot {
        lock(&self.slots).entry(label.to_string()).or_default().clone()
    }

    /// Dataset for `day_label`, fetching it if the cached entry is missing or
    /// older than the TTL at `now`. A refetch uses the resource published on `today`.
    pub fn get(&self, day_label: &str, today: NaiveDate, now: Instant) -> Result<Arc<HeatRiskLayer>, DashboardError> {
        let label = normalize_day_label(day_label)?;
        let key = resource_key(&label, today)?;

        let slot = self.slot(&label);
        let mut entry = lock(&*slot);

        if let Some(cached) = entry.as_ref() {
            let age = now.saturating_duration_since(cached.loaded_at);
            if age < self.ttl {
                tracing::debug!("[cache] Hit for {label} ({}), age {}s", cached.key, age.as_secs());
                return Ok(cached.layer.clone());
            }
            tracing::debug!("[cache] Entry for {label} ({}) expired, refetching", cached.key);
        }

        let layer = Arc::new(self.load(&label, &key)?);
        *entry = Some(Entry { key, layer: layer.clone(), loaded_at: now });
        Ok(layer)
    }

    fn load(&self, label: &str, key: &str) -> Result<HeatRiskLayer, DashboardError> {
        let unavailable = |source: anyhow::Error| DashboardError::DataUnavailable { day: label.to_string(), source };

        let location = self.source.locate(key);
        tracing::info!("[cache] Fetching {label} from {location}");

        let bytes = self.source.fetch(key).map_err(unavailable)?;
        let layer = HeatRiskLayer::from_geoparquet_bytes(bytes).map_err(unavailable)?;
        if layer.is_empty() {
            return Err(unavailable(anyhow!("{location} contains no records")));
        }

        tracing::info!("[cache] Loaded {} records for {label}", layer.len());
        Ok(layer)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Number of populated entries. Slots busy loading are not counted.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter()
            .filter(|slot| match slot.try_lock() {
                Ok(entry) => entry.is_some(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
                Err(TryLockError::WouldBlock) => false,
            })
            .count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
