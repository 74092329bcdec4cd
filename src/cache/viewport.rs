use crate::core::property::{PropertyRecord, PropertyTypeFilter};
use crate::prelude::{Arc, HashMap, Mutex};
use std::sync::{MutexGuard, PoisonError};

/// Immutable view of the cache at one version. The list and the markers
/// render from the same snapshot.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub version: u64,
    pub records: Arc<[PropertyRecord]>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }
}

#[derive(Debug)]
struct FilteredView {
    version: u64,
    filter: PropertyTypeFilter,
    records: Arc<[PropertyRecord]>,
}

#[derive(Debug)]
struct CacheInner {
    records: Arc<[PropertyRecord]>,
    index: HashMap<String, usize>,
    version: u64,
    filtered: Option<FilteredView>,
}

/// Properties of the most recently accepted fetch, keyed by id.
///
/// Contents are swapped wholesale by [`replace`](Self::replace); nothing is
/// ever merged, so pins from a previous viewport cannot linger. Cloning
/// yields another handle to the same store.
#[derive(Debug, Clone)]
pub struct PropertyViewportCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl PropertyViewportCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                records: Arc::from(Vec::new()),
                index: HashMap::default(),
                version: 0,
                filtered: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discard the current set and store `properties` in its place.
    ///
    /// A repeated id keeps its first position and takes the later value.
    /// Returns the new version.
    pub fn replace(&self, properties: Vec<PropertyRecord>) -> u64 {
        let mut records: Vec<PropertyRecord> = Vec::with_capacity(properties.len());
        let mut index = HashMap::default();
        index.reserve(properties.len());

        for record in properties {
            match index.get(&record.id) {
                Some(&pos) => records[pos] = record,
                None => {
                    index.insert(record.id.clone(), records.len());
                    records.push(record);
                }
            }
        }

        let mut inner = self.lock();
        inner.records = Arc::from(records);
        inner.index = index;
        inner.version += 1;
        inner.filtered = None;
        inner.version
    }

    /// All records, in the order of the last `replace`
    pub fn get_all(&self) -> Arc<[PropertyRecord]> {
        self.lock().records.clone()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.lock();
        CacheSnapshot {
            version: inner.version,
            records: inner.records.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Option<PropertyRecord> {
        let inner = self.lock();
        inner.index.get(id).map(|&pos| inner.records[pos].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incremented by every `replace`
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Records matching `filter`.
    ///
    /// Memoised on (version, filter): repeated calls return the same shared
    /// slice until the set is replaced or a different filter is asked for.
    pub fn filter_by_type(&self, filter: PropertyTypeFilter) -> Arc<[PropertyRecord]> {
        let mut inner = self.lock();
        if filter == PropertyTypeFilter::All {
            return inner.records.clone();
        }

        if let Some(view) = &inner.filtered {
            if view.version == inner.version && view.filter == filter {
                return view.records.clone();
            }
        }

        let records: Arc<[PropertyRecord]> = inner
            .records
            .iter()
            .filter(|r| filter.matches(&r.property_type))
            .cloned()
            .collect();
        inner.filtered = Some(FilteredView {
            version: inner.version,
            filter,
            records: records.clone(),
        });
        records
    }
}

impl Default for PropertyViewportCache {
    fn default() -> Self {
        Self::new()
    }
}
