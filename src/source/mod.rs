//! Data access for the aggregation engine.
//!
//! The engine reads raw rows through the [`DataSource`] trait. Concrete
//! sources live in submodules; [`CachedSource`] wraps any of them with a
//! read-through cache.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySource;
pub use sqlite::SqliteSource;

use crate::models::{Dataset, Filters, RawRow};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// A read-only provider of typed raw rows.
pub trait DataSource {
    /// Fetch the rows of `dataset` matching every filter.
    ///
    /// Implementations should push the filters down, but the engine does not
    /// rely on it.
    fn fetch_raw(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>>;

    /// Short description for logs and report metadata.
    fn describe(&self) -> String;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn fetch_raw(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>> {
        (**self).fetch_raw(dataset, filters)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Hit and miss counters of a [`CachedSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<(Dataset, Filters), Vec<RawRow>>,
    stats: CacheStats,
}

/// Memoizes `fetch_raw` per dataset and filter set.
///
/// Entries live as long as the wrapper; the underlying data is treated as
/// static. Failed fetches are not cached.
pub struct CachedSource<S> {
    inner: S,
    state: Mutex<CacheState>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    #[cfg(test)]
    fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn fetch_raw(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>> {
        let key = (dataset, filters.clone());

        {
            let mut state = self.state.lock();
            if let Some(rows) = state.entries.get(&key).cloned() {
                state.stats.hits += 1;
                debug!("Cache hit: {} [{}]", dataset, filters);
                return Ok(rows);
            }
            state.stats.misses += 1;
        }

        // Lock released before fetching.
        let rows = self.inner.fetch_raw(dataset, filters)?;
        debug!("Cache fill: {} [{}] ({} rows)", dataset, filters, rows.len());
        self.state.lock().entries.insert(key, rows.clone());

        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} (cached)", self.inner.describe())
    }
}
