//! The cache: 256 independently locked segments behind one byte-oriented API.
//!
//! Every operation hashes the key once, picks a segment from the low 8 hash
//! bits and runs entirely under that segment's mutex. There is no
//! cross-segment coordination: `clear` and the statistics getters visit
//! segments one at a time, so concurrent observers may see a mix of before
//! and after states. That is the intended trade for an uncontended hot path.

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::error::CacheError;
use crate::iter::Iter;
use crate::metrics::CacheStats;
use crate::segment::{Segment, MIN_SEG_SIZE};
use crate::timer::{SystemTimer, Timer};

/// Shards per cache; selected by the low 8 bits of the key hash.
pub(crate) const SEGMENT_COUNT: usize = 256;

/// Fixed-capacity, thread-safe key/value cache for opaque byte sequences.
///
/// Total memory is committed at construction and never grows: each of the
/// 256 segments owns a pre-allocated ring of `size / 256` bytes (512
/// minimum) and evicts from its tail under pressure, preferring to keep
/// recently accessed entries.
///
/// # Example
///
/// ```
/// use ringcache::Cache;
///
/// let cache = Cache::new(512 * 1024);
/// cache.set(b"user:42", b"payload", 0).unwrap();
/// assert_eq!(cache.get(b"user:42").unwrap(), b"payload");
/// assert!(cache.del(b"user:42"));
/// assert!(cache.get(b"user:42").is_err());
/// ```
pub struct Cache {
    pub(crate) segments: Box<[Mutex<Segment>]>,
    hasher: RandomState,
}

impl Cache {
    /// Creates a cache with `size` total bytes of entry storage, split
    /// evenly across 256 segments (at least 512 bytes each).
    pub fn new(size: usize) -> Self {
        Self::with_timer(size, Arc::new(SystemTimer))
    }

    /// Same as [`Cache::new`] with an injected time source. Useful for
    /// tests that steer expiration without sleeping.
    pub fn with_timer(size: usize, timer: Arc<dyn Timer>) -> Self {
        let seg_size = size.div_ceil(SEGMENT_COUNT).max(MIN_SEG_SIZE);
        let segments = (0..SEGMENT_COUNT)
            .map(|_| Mutex::new(Segment::new(seg_size, timer.clone())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            segments,
            hasher: RandomState::new(),
        }
    }

    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        let mut hasher = self.hasher.build_hasher();
        hasher.write(key);
        hasher.finish()
    }

    #[inline]
    fn segment_for(&self, hash: u64) -> &Mutex<Segment> {
        &self.segments[(hash & 0xFF) as usize]
    }

    /// Inserts or replaces `key`. `expire_seconds == 0` means the entry
    /// never expires.
    ///
    /// Fails with [`CacheError::LargeKey`] for keys outside `1..=65535`
    /// bytes and [`CacheError::LargeEntry`] when the record would exceed a
    /// quarter of its segment's capacity. Under pressure the insert evicts
    /// from the segment tail until the record fits.
    pub fn set(&self, key: &[u8], value: &[u8], expire_seconds: u32) -> Result<(), CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().set(key, value, hash, expire_seconds)
    }

    /// Returns a copy of the value. Refreshes the entry's access time and
    /// lazily reclaims it if expired.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().get(key, hash).map(|(value, _)| value)
    }

    /// Like [`Cache::get`], also reporting the entry's absolute expiration
    /// second (0 for never).
    pub fn get_with_expiration(&self, key: &[u8]) -> Result<(Vec<u8>, u32), CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().get(key, hash)
    }

    /// Copies the value into `buf` without allocating, truncating silently
    /// when `buf` is too small. Returns the value's true length.
    pub fn get_into(&self, key: &[u8], buf: &mut [u8]) -> Result<usize, CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().get_into(key, hash, buf)
    }

    /// Calls `f` with a read-only view of the value while the segment lock
    /// is held, propagating its result. The view is valid only for the
    /// duration of the call.
    ///
    /// `f` must not call back into this cache: re-entering the same segment
    /// deadlocks.
    pub fn get_fn<R>(&self, key: &[u8], f: impl FnOnce(&[u8]) -> R) -> Result<R, CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().with_value(key, hash, f)
    }

    /// Atomically returns the existing value untouched, or inserts `value`
    /// and returns `None`.
    ///
    /// ```
    /// use ringcache::Cache;
    ///
    /// let cache = Cache::new(512 * 1024);
    /// assert_eq!(cache.get_or_set(b"k", b"v1", 10).unwrap(), None);
    /// assert_eq!(cache.get_or_set(b"k", b"v2", 10).unwrap().as_deref(), Some(&b"v1"[..]));
    /// assert_eq!(cache.get(b"k").unwrap(), b"v1");
    /// ```
    pub fn get_or_set(
        &self,
        key: &[u8],
        value: &[u8],
        expire_seconds: u32,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let hash = self.hash(key);
        let mut seg = self.segment_for(hash).lock();
        match seg.get(key, hash) {
            Ok((existing, _)) => Ok(Some(existing)),
            Err(CacheError::NotFound) => {
                seg.set(key, value, hash, expire_seconds)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Atomically replaces `key` with `value`, returning the prior value
    /// (`None` when the key was absent or expired).
    pub fn set_and_get(
        &self,
        key: &[u8],
        value: &[u8],
        expire_seconds: u32,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let hash = self.hash(key);
        let mut seg = self.segment_for(hash).lock();
        let prior = seg.get(key, hash).ok().map(|(value, _)| value);
        seg.set(key, value, hash, expire_seconds)?;
        Ok(prior)
    }

    /// Read-modify-write under the segment lock. `f` receives the current
    /// value (`None` when absent) and returns `Some((new_value,
    /// expire_seconds))` to commit or `None` to leave the entry untouched.
    /// Returns `(found, replaced)`.
    ///
    /// `f` must not call back into this cache.
    ///
    /// ```
    /// use ringcache::Cache;
    ///
    /// let cache = Cache::new(512 * 1024);
    /// let (found, replaced) = cache
    ///     .update(b"counter", |current| {
    ///         assert!(current.is_none());
    ///         Some((b"1".to_vec(), 60))
    ///     })
    ///     .unwrap();
    /// assert!(!found);
    /// assert!(replaced);
    /// assert_eq!(cache.get(b"counter").unwrap(), b"1");
    /// ```
    pub fn update<F>(&self, key: &[u8], f: F) -> Result<(bool, bool), CacheError>
    where
        F: FnOnce(Option<&[u8]>) -> Option<(Vec<u8>, u32)>,
    {
        let hash = self.hash(key);
        let mut seg = self.segment_for(hash).lock();
        let current = seg.get(key, hash).ok().map(|(value, _)| value);
        let found = current.is_some();
        match f(current.as_deref()) {
            Some((new_value, expire_seconds)) => {
                seg.set(key, &new_value, hash, expire_seconds)?;
                Ok((found, true))
            }
            None => Ok((found, false)),
        }
    }

    /// Unindexes `key`, reporting whether an entry was affected. The bytes
    /// are reclaimed lazily by eviction.
    pub fn del(&self, key: &[u8]) -> bool {
        let hash = self.hash(key);
        self.segment_for(hash).lock().del(key, hash)
    }

    /// Rewrites the entry's deadline to `now + expire_seconds` in place
    /// (`0` clears it). Fails with `NotFound` for absent or expired keys.
    pub fn touch(&self, key: &[u8], expire_seconds: u32) -> Result<(), CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().touch(key, hash, expire_seconds)
    }

    /// Remaining seconds to live, `0` for a never-expiring key.
    pub fn ttl(&self, key: &[u8]) -> Result<u32, CacheError> {
        let hash = self.hash(key);
        self.segment_for(hash).lock().ttl(key, hash)
    }

    /// Drops every entry. Runs segment by segment, so it is not atomic with
    /// respect to concurrent operations on other segments. Statistics
    /// counters are preserved.
    pub fn clear(&self) {
        for segment in self.segments.iter() {
            segment.lock().clear();
        }
    }

    /// Zeroes the statistics counters. `entry_count` is a live gauge, not a
    /// counter, and is unaffected.
    pub fn reset_statistics(&self) {
        for segment in self.segments.iter() {
            segment.lock().reset_statistics();
        }
    }

    /// Walks all live entries. Each step briefly locks one segment; entries
    /// present for the whole iteration are yielded exactly once, entries
    /// mutated concurrently may be missed or repeated.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    // -- statistics ------------------------------------------------------

    /// Live entries (tombstoned and expired-but-unreaped excluded).
    pub fn entry_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().entry_count).sum()
    }

    pub fn hit_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.hits).sum()
    }

    pub fn miss_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.misses).sum()
    }

    pub fn lookup_count(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| {
                let seg = s.lock();
                seg.counters.hits + seg.counters.misses
            })
            .sum()
    }

    /// `hit_count / lookup_count`, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let (mut hits, mut lookups) = (0u64, 0u64);
        for segment in self.segments.iter() {
            let seg = segment.lock();
            hits += seg.counters.hits;
            lookups += seg.counters.hits + seg.counters.misses;
        }
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }

    /// Entries dropped by eviction since the last statistics reset.
    pub fn evacuate_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.evacuated).sum()
    }

    /// Entries found expired on access since the last statistics reset.
    pub fn expired_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.expired).sum()
    }

    /// In-place overwrites since the last statistics reset.
    pub fn overwrite_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.overwrites).sum()
    }

    /// Successful [`Cache::touch`] calls since the last statistics reset.
    pub fn touched_count(&self) -> u64 {
        self.segments.iter().map(|s| s.lock().counters.touches).sum()
    }

    /// Mean access-time second over the records currently occupying ring
    /// bytes; `0` when empty. Eventually consistent under concurrency.
    pub fn average_access_time(&self) -> i64 {
        let (mut total_time, mut total_count) = (0i64, 0i64);
        for segment in self.segments.iter() {
            let seg = segment.lock();
            total_time += seg.total_time;
            total_count += seg.total_count;
        }
        if total_count == 0 {
            0
        } else {
            total_time / total_count
        }
    }

    /// One-shot aggregate of every counter and gauge. Segments are visited
    /// one at a time, so the snapshot is only as atomic as each segment.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let (mut total_time, mut total_count) = (0i64, 0i64);
        for segment in self.segments.iter() {
            let seg = segment.lock();
            stats.entry_count += seg.entry_count;
            stats.hit_count += seg.counters.hits;
            stats.miss_count += seg.counters.misses;
            stats.evacuate_count += seg.counters.evacuated;
            stats.expired_count += seg.counters.expired;
            stats.overwrite_count += seg.counters.overwrites;
            stats.touched_count += seg.counters.touches;
            total_time += seg.total_time;
            total_count += seg.total_count;
        }
        stats.lookup_count = stats.hit_count + stats.miss_count;
        if stats.lookup_count > 0 {
            stats.hit_rate = stats.hit_count as f64 / stats.lookup_count as f64;
        }
        if total_count > 0 {
            stats.average_access_time = total_time / total_count;
        }
        stats
    }

    // -- integer-key convenience -----------------------------------------

    /// [`Cache::set`] for an `i64` key (its 8 little-endian bytes).
    pub fn set_int(&self, key: i64, value: &[u8], expire_seconds: u32) -> Result<(), CacheError> {
        self.set(&key.to_le_bytes(), value, expire_seconds)
    }

    /// [`Cache::get`] for an `i64` key.
    pub fn get_int(&self, key: i64) -> Result<Vec<u8>, CacheError> {
        self.get(&key.to_le_bytes())
    }

    /// [`Cache::get_with_expiration`] for an `i64` key.
    pub fn get_int_with_expiration(&self, key: i64) -> Result<(Vec<u8>, u32), CacheError> {
        self.get_with_expiration(&key.to_le_bytes())
    }

    /// [`Cache::del`] for an `i64` key.
    pub fn del_int(&self, key: i64) -> bool {
        self.del(&key.to_le_bytes())
    }
}
