//! One cache shard: a ring-buffered slab plus a sorted slot index.
//!
//! The segment owns every data-plane decision. Records are packed
//! back-to-back into the ring; a 256-bucket index of [`Slot`]s (sorted by
//! `hash16`, binary-searched) locates them. Making room walks records off
//! the tail: stale records are dropped, records accessed more recently than
//! the segment's mean access time are rewritten to the head instead, which
//! approximates LRU on top of FIFO reclamation.
//!
//! All methods assume the caller holds the segment's lock; the `Cache`
//! wrapper provides it. Nothing here allocates on the hot read paths
//! (`get_into`, `with_value`).

use std::sync::Arc;

use crate::ds::RingBuf;
use crate::entry::{is_expired, EntryHdr, Slot, ENTRY_HDR_SIZE, MAX_KEY_LEN};
use crate::error::CacheError;
use crate::timer::Timer;

/// Buckets per segment; selected by hash bits 8..16.
pub(crate) const BUCKET_COUNT: usize = 256;

/// Smallest ring a segment will operate on.
pub(crate) const MIN_SEG_SIZE: usize = 512;

/// Re-admissions tolerated in a row before eviction force-drops a record,
/// so a fully hot tail cannot stall an insert.
const MAX_CONSECUTIVE_READMITS: u32 = 5;

/// Monotonic per-segment counters, mutated under the segment lock and
/// summed on demand by the aggregate getters.
#[derive(Debug, Default)]
pub(crate) struct SegmentCounters {
    pub(crate) hits: u64,
    pub(crate) misses: u64,
    pub(crate) evacuated: u64,
    pub(crate) expired: u64,
    pub(crate) overwrites: u64,
    pub(crate) touches: u64,
}

impl SegmentCounters {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub(crate) struct Segment {
    rb: RingBuf,
    timer: Arc<dyn Timer>,
    buckets: Vec<Vec<Slot>>,
    /// Free ring bytes; the record tail sits at `rb.end() + vacuum_len - cap`.
    vacuum_len: u64,
    /// Live (indexed) entries.
    pub(crate) entry_count: u64,
    /// Records still occupying ring bytes, tombstones included.
    pub(crate) total_count: i64,
    /// Sum of `access_time` over those records.
    pub(crate) total_time: i64,
    pub(crate) counters: SegmentCounters,
}

impl Segment {
    pub(crate) fn new(capacity: usize, timer: Arc<dyn Timer>) -> Self {
        assert!(capacity >= MIN_SEG_SIZE, "segment smaller than {MIN_SEG_SIZE} bytes");
        let rb = RingBuf::new(capacity);
        let vacuum_len = rb.capacity();
        Self {
            rb,
            timer,
            buckets: vec![Vec::new(); BUCKET_COUNT],
            vacuum_len,
            entry_count: 0,
            total_count: 0,
            total_time: 0,
            counters: SegmentCounters::default(),
        }
    }

    #[inline]
    fn slot_id(hash: u64) -> u8 {
        (hash >> 8) as u8
    }

    #[inline]
    fn hash16(hash: u64) -> u16 {
        (hash >> 16) as u16
    }

    /// Largest admissible record: a quarter of the ring, so eviction always
    /// frees enough contiguous head room.
    #[inline]
    fn max_entry_len(&self) -> usize {
        self.rb.capacity() as usize / 4
    }

    fn read_hdr(&self, offset: u64) -> EntryHdr {
        let mut buf = [0u8; ENTRY_HDR_SIZE];
        self.rb.read_at(&mut buf, offset);
        EntryHdr::from_bytes(&buf)
    }

    fn write_hdr(&mut self, hdr: &EntryHdr, offset: u64) {
        self.rb.write_at(&hdr.to_bytes(), offset);
    }

    /// Binary-search the bucket for `hash16`, then scan the equal run
    /// comparing key bytes against the ring. Returns the match index, or the
    /// sorted insertion point when absent.
    fn lookup(&self, slot_id: u8, hash16: u16, key: &[u8]) -> (usize, bool) {
        let bucket = &self.buckets[slot_id as usize];
        let mut idx = bucket.partition_point(|s| s.hash16 < hash16);
        while idx < bucket.len() && bucket[idx].hash16 == hash16 {
            let slot = bucket[idx];
            if slot.key_len as usize == key.len()
                && self.rb.equal_at(key, slot.offset + ENTRY_HDR_SIZE as u64)
            {
                return (idx, true);
            }
            idx += 1;
        }
        (idx, false)
    }

    /// Locates a live entry. With `peek` the lookup is free of side effects
    /// and never consults the timer; otherwise it lazily expires, refreshes
    /// `access_time` and records a miss on failure.
    fn locate(&mut self, key: &[u8], hash: u64, peek: bool) -> Result<(EntryHdr, u64), CacheError> {
        let slot_id = Self::slot_id(hash);
        let (idx, found) = self.lookup(slot_id, Self::hash16(hash), key);
        if !found {
            if !peek {
                self.counters.misses += 1;
            }
            return Err(CacheError::NotFound);
        }
        let offset = self.buckets[slot_id as usize][idx].offset;
        let mut hdr = self.read_hdr(offset);
        if !peek {
            let now = self.timer.now();
            if is_expired(hdr.expire_at, now) {
                self.del_slot(slot_id, idx);
                self.counters.expired += 1;
                self.counters.misses += 1;
                return Err(CacheError::NotFound);
            }
            self.total_time += now as i64 - hdr.access_time as i64;
            hdr.access_time = now;
            self.write_hdr(&hdr, offset);
        }
        Ok((hdr, offset))
    }

    /// Tombstones the record and unindexes its slot.
    fn del_slot(&mut self, slot_id: u8, idx: usize) {
        let slot = self.buckets[slot_id as usize].remove(idx);
        let mut hdr = self.read_hdr(slot.offset);
        hdr.deleted = true;
        self.write_hdr(&hdr, slot.offset);
        self.entry_count -= 1;
    }

    /// Unindexes the slot addressing `offset` during eviction. The bytes are
    /// reclaimed immediately, so no tombstone write is needed.
    fn del_slot_by_offset(&mut self, slot_id: u8, hash16: u16, offset: u64) {
        let bucket = &mut self.buckets[slot_id as usize];
        let mut idx = bucket.partition_point(|s| s.hash16 < hash16);
        while idx < bucket.len() && bucket[idx].hash16 == hash16 {
            if bucket[idx].offset == offset {
                bucket.remove(idx);
                self.entry_count -= 1;
                return;
            }
            idx += 1;
        }
    }

    /// Repoints the slot addressing `old` at a re-admitted record's new home.
    fn update_slot_offset(&mut self, slot_id: u8, hash16: u16, old: u64, new: u64) {
        let bucket = &mut self.buckets[slot_id as usize];
        let mut idx = bucket.partition_point(|s| s.hash16 < hash16);
        while idx < bucket.len() && bucket[idx].hash16 == hash16 {
            if bucket[idx].offset == old {
                bucket[idx].offset = new;
                return;
            }
            idx += 1;
        }
    }

    /// Walks the tail until `entry_len` bytes are free. Tombstoned and
    /// expired records are reclaimed outright; a record strictly newer than
    /// the segment's mean access time is rewritten to the head instead,
    /// bounded by [`MAX_CONSECUTIVE_READMITS`]. Returns whether `slot_id`'s
    /// bucket was touched (the caller's insertion point is then stale).
    fn evacuate_for(&mut self, entry_len: u64, slot_id: u8, now: u32) -> bool {
        let mut slot_modified = false;
        let mut consecutive_readmits = 0u32;
        while self.vacuum_len < entry_len {
            let tail_off = self.rb.end() + self.vacuum_len - self.rb.capacity();
            let old_hdr = self.read_hdr(tail_off);
            let old_len = old_hdr.entry_len();
            if old_hdr.deleted {
                consecutive_readmits = 0;
                self.total_time -= old_hdr.access_time as i64;
                self.total_count -= 1;
                self.vacuum_len += old_len;
                continue;
            }
            let expired = is_expired(old_hdr.expire_at, now);
            let least_recent =
                old_hdr.access_time as i64 * self.total_count <= self.total_time;
            if expired || least_recent || consecutive_readmits > MAX_CONSECUTIVE_READMITS {
                self.del_slot_by_offset(old_hdr.slot_id, old_hdr.hash16, tail_off);
                if old_hdr.slot_id == slot_id {
                    slot_modified = true;
                }
                consecutive_readmits = 0;
                self.total_time -= old_hdr.access_time as i64;
                self.total_count -= 1;
                self.vacuum_len += old_len;
                if expired {
                    self.counters.expired += 1;
                } else {
                    self.counters.evacuated += 1;
                }
            } else {
                let new_off = self.rb.evacuate(tail_off, old_len as usize);
                self.update_slot_offset(old_hdr.slot_id, old_hdr.hash16, tail_off, new_off);
                consecutive_readmits += 1;
            }
        }
        slot_modified
    }

    pub(crate) fn set(
        &mut self,
        key: &[u8],
        value: &[u8],
        hash: u64,
        expire_seconds: u32,
    ) -> Result<(), CacheError> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(CacheError::LargeKey);
        }
        let max_kv_len = self.max_entry_len() - ENTRY_HDR_SIZE;
        if key.len() + value.len() > max_kv_len {
            return Err(CacheError::LargeEntry);
        }
        let now = self.timer.now();
        let expire_at = if expire_seconds == 0 {
            0
        } else {
            now.saturating_add(expire_seconds)
        };
        let slot_id = Self::slot_id(hash);
        let hash16 = Self::hash16(hash);

        let mut val_cap = (value.len() as u32).max(1);
        let (idx, found) = self.lookup(slot_id, hash16, key);
        if found {
            let offset = self.buckets[slot_id as usize][idx].offset;
            let mut hdr = self.read_hdr(offset);
            let origin_access_time = hdr.access_time;
            hdr.access_time = now;
            hdr.expire_at = expire_at;
            hdr.val_len = value.len() as u32;
            if hdr.val_cap >= hdr.val_len {
                // Fits the reserved capacity: overwrite in place.
                self.total_time += now as i64 - origin_access_time as i64;
                self.write_hdr(&hdr, offset);
                self.rb
                    .write_at(value, offset + ENTRY_HDR_SIZE as u64 + key.len() as u64);
                self.counters.overwrites += 1;
                return Ok(());
            }
            // Outgrown: retire the old record and repack with doubled
            // capacity so a steadily growing value settles quickly.
            self.del_slot(slot_id, idx);
            val_cap = hdr.val_cap.max(1);
            while val_cap < hdr.val_len {
                val_cap *= 2;
            }
            let cap_limit = (max_kv_len - key.len()) as u32;
            if val_cap > cap_limit {
                val_cap = cap_limit;
            }
        }

        let hdr = EntryHdr {
            access_time: now,
            expire_at,
            key_len: key.len() as u16,
            hash16,
            val_len: value.len() as u32,
            val_cap,
            deleted: false,
            slot_id,
        };

        let entry_len = hdr.entry_len();
        self.evacuate_for(entry_len, slot_id, now);
        // Both the retirement above and eviction can shuffle the bucket;
        // recompute the insertion point unconditionally.
        let (idx, _) = self.lookup(slot_id, hash16, key);

        let new_off = self.rb.end();
        self.buckets[slot_id as usize].insert(
            idx,
            Slot {
                offset: new_off,
                hash16,
                key_len: key.len() as u16,
            },
        );
        self.rb.append(&hdr.to_bytes());
        self.rb.append(key);
        self.rb.append(value);
        self.rb.skip(u64::from(hdr.val_cap - hdr.val_len));
        self.vacuum_len -= entry_len;
        self.entry_count += 1;
        self.total_count += 1;
        self.total_time += now as i64;
        Ok(())
    }

    pub(crate) fn get(&mut self, key: &[u8], hash: u64) -> Result<(Vec<u8>, u32), CacheError> {
        let (hdr, offset) = self.locate(key, hash, false)?;
        let mut value = vec![0u8; hdr.val_len as usize];
        self.rb
            .read_at(&mut value, offset + ENTRY_HDR_SIZE as u64 + hdr.key_len as u64);
        self.counters.hits += 1;
        Ok((value, hdr.expire_at))
    }

    /// Copies the value into `buf` (truncating silently) and reports the
    /// value's true length. Allocation-free.
    pub(crate) fn get_into(
        &mut self,
        key: &[u8],
        hash: u64,
        buf: &mut [u8],
    ) -> Result<usize, CacheError> {
        let (hdr, offset) = self.locate(key, hash, false)?;
        let n = (hdr.val_len as usize).min(buf.len());
        self.rb
            .read_at(&mut buf[..n], offset + ENTRY_HDR_SIZE as u64 + hdr.key_len as u64);
        self.counters.hits += 1;
        Ok(hdr.val_len as usize)
    }

    /// Runs `f` over a read-only view of the value. The view borrows the
    /// ring directly unless the record wraps.
    pub(crate) fn with_value<R>(
        &mut self,
        key: &[u8],
        hash: u64,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, CacheError> {
        let (hdr, offset) = self.locate(key, hash, false)?;
        self.counters.hits += 1;
        let value = self.rb.slice(
            offset + ENTRY_HDR_SIZE as u64 + hdr.key_len as u64,
            hdr.val_len as usize,
        );
        Ok(f(&value))
    }

    pub(crate) fn del(&mut self, key: &[u8], hash: u64) -> bool {
        let slot_id = Self::slot_id(hash);
        let (idx, found) = self.lookup(slot_id, Self::hash16(hash), key);
        if found {
            self.del_slot(slot_id, idx);
        }
        found
    }

    /// Remaining seconds to live; 0 for a never-expiring key. The timer is
    /// consulted only when the entry carries a deadline.
    pub(crate) fn ttl(&mut self, key: &[u8], hash: u64) -> Result<u32, CacheError> {
        let (hdr, _) = self.locate(key, hash, true)?;
        if hdr.expire_at == 0 {
            return Ok(0);
        }
        let now = self.timer.now();
        if hdr.expire_at > now {
            Ok(hdr.expire_at - now)
        } else {
            Err(CacheError::NotFound)
        }
    }

    /// Rewrites the entry's deadline in place. Fails on absent or already
    /// expired entries; the latter are lazily reclaimed here.
    pub(crate) fn touch(
        &mut self,
        key: &[u8],
        hash: u64,
        expire_seconds: u32,
    ) -> Result<(), CacheError> {
        let slot_id = Self::slot_id(hash);
        let (idx, found) = self.lookup(slot_id, Self::hash16(hash), key);
        if !found {
            return Err(CacheError::NotFound);
        }
        let offset = self.buckets[slot_id as usize][idx].offset;
        let mut hdr = self.read_hdr(offset);
        let now = self.timer.now();
        if is_expired(hdr.expire_at, now) {
            self.del_slot(slot_id, idx);
            self.counters.expired += 1;
            self.counters.misses += 1;
            return Err(CacheError::NotFound);
        }
        hdr.expire_at = if expire_seconds == 0 {
            0
        } else {
            now.saturating_add(expire_seconds)
        };
        self.write_hdr(&hdr, offset);
        self.counters.touches += 1;
        Ok(())
    }

    /// Drops every entry and rewinds the ring. Statistics counters survive;
    /// the live gauges do not.
    pub(crate) fn clear(&mut self) {
        self.rb.reset();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.vacuum_len = self.rb.capacity();
        self.entry_count = 0;
        self.total_count = 0;
        self.total_time = 0;
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.counters.reset();
    }

    /// Iterator support: scans forward from the cursor, skipping expired
    /// records, and returns the next live (key, value) pair.
    pub(crate) fn next_entry(
        &self,
        bucket_idx: &mut usize,
        slot_idx: &mut usize,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        let now = self.timer.now();
        while *bucket_idx < BUCKET_COUNT {
            let bucket = &self.buckets[*bucket_idx];
            while *slot_idx < bucket.len() {
                let slot = bucket[*slot_idx];
                *slot_idx += 1;
                let hdr = self.read_hdr(slot.offset);
                if is_expired(hdr.expire_at, now) {
                    continue;
                }
                let mut key = vec![0u8; hdr.key_len as usize];
                self.rb.read_at(&mut key, slot.offset + ENTRY_HDR_SIZE as u64);
                let mut value = vec![0u8; hdr.val_len as usize];
                self.rb.read_at(
                    &mut value,
                    slot.offset + ENTRY_HDR_SIZE as u64 + hdr.key_len as u64,
                );
                return Some((key, value));
            }
            *bucket_idx += 1;
            *slot_idx = 0;
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        let mut live = 0u64;
        for (slot_id, bucket) in self.buckets.iter().enumerate() {
            for pair in bucket.windows(2) {
                assert!(pair[0].hash16 <= pair[1].hash16, "bucket not sorted by hash16");
            }
            for slot in bucket {
                let hdr = self.read_hdr(slot.offset);
                assert!(!hdr.deleted, "live slot points at tombstone");
                assert_eq!(hdr.hash16, slot.hash16, "slot/header hash16 mismatch");
                assert_eq!(hdr.slot_id as usize, slot_id, "header owned by wrong bucket");
                assert_eq!(hdr.key_len, slot.key_len, "slot/header key_len mismatch");
                live += 1;
            }
        }
        assert_eq!(live, self.entry_count, "entry_count drifted from index");
        assert!(self.vacuum_len <= self.rb.capacity(), "vacuum exceeds capacity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedTimer(AtomicU32);

    impl FixedTimer {
        fn at(secs: u32) -> Arc<Self> {
            Arc::new(Self(AtomicU32::new(secs)))
        }

        fn advance(&self, secs: u32) {
            self.0.fetch_add(secs, Ordering::Relaxed);
        }
    }

    impl Timer for FixedTimer {
        fn now(&self) -> u32 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn seg_with_timer(cap: usize) -> (Segment, Arc<FixedTimer>) {
        let timer = FixedTimer::at(1_000_000);
        (Segment::new(cap, timer.clone()), timer)
    }

    fn hash_of(key: &[u8]) -> u64 {
        // DefaultHasher::new() is fixed-seeded, so hashes are stable per key
        use std::hash::Hasher;
        let mut h = std::collections::hash_map::DefaultHasher::new();
        h.write(key);
        h.finish()
    }

    #[test]
    fn set_get_del_round_trip() {
        let (mut seg, _) = seg_with_timer(1024);
        let h = hash_of(b"abcd");
        seg.set(b"abcd", b"efghijkl", h, 0).unwrap();
        let (val, expire) = seg.get(b"abcd", h).unwrap();
        assert_eq!(val, b"efghijkl");
        assert_eq!(expire, 0);
        assert!(seg.del(b"abcd", h));
        assert_eq!(seg.get(b"abcd", h), Err(CacheError::NotFound));
        assert!(!seg.del(b"abcd", h));
        seg.debug_validate_invariants();
    }

    #[test]
    fn empty_and_oversized_keys_are_rejected() {
        let (mut seg, _) = seg_with_timer(1024);
        assert_eq!(seg.set(b"", b"v", 0, 0), Err(CacheError::LargeKey));
        let big = vec![b'k'; MAX_KEY_LEN + 1];
        assert_eq!(seg.set(&big, b"v", 0, 0), Err(CacheError::LargeKey));
    }

    #[test]
    fn entry_larger_than_quarter_ring_is_rejected() {
        let (mut seg, _) = seg_with_timer(2048);
        let max_kv = 2048 / 4 - ENTRY_HDR_SIZE;
        let h = hash_of(b"abcd");
        let too_big = vec![0u8; max_kv - 4 + 1];
        assert_eq!(seg.set(b"abcd", &too_big, h, 0), Err(CacheError::LargeEntry));
        let fits = vec![0u8; max_kv - 4];
        seg.set(b"abcd", &fits, h, 0).unwrap();
    }

    #[test]
    fn overwrite_counter_tracks_in_place_updates_only() {
        let (mut seg, _) = seg_with_timer(1024);
        let h = hash_of(b"k");
        seg.set(b"k", b"", h, 0).unwrap(); // val_cap 1
        seg.set(b"k", b"efgh", h, 0).unwrap(); // repack, cap 4
        seg.set(b"k", b"efghi", h, 0).unwrap(); // repack, cap 8
        assert_eq!(seg.counters.overwrites, 0);
        seg.set(b"k", b"efghij", h, 0).unwrap(); // in place
        seg.set(b"k", b"efghijk", h, 0).unwrap(); // in place
        seg.set(b"k", b"efghijkl", h, 0).unwrap(); // in place, cap full
        assert_eq!(seg.counters.overwrites, 3);
        seg.set(b"k", b"efghijklm", h, 0).unwrap(); // repack, cap 16
        assert_eq!(seg.counters.overwrites, 3);
        let (val, _) = seg.get(b"k", h).unwrap();
        assert_eq!(val, b"efghijklm");
        seg.debug_validate_invariants();
    }

    #[test]
    fn shrinking_value_reuses_capacity_in_place() {
        let (mut seg, _) = seg_with_timer(1024);
        let h = hash_of(b"k");
        seg.set(b"k", b"longer-value", h, 0).unwrap();
        seg.set(b"k", b"s", h, 0).unwrap();
        assert_eq!(seg.counters.overwrites, 1);
        let (val, _) = seg.get(b"k", h).unwrap();
        assert_eq!(val, b"s");
    }

    #[test]
    fn expired_entry_is_lazily_reclaimed_on_get() {
        let (mut seg, timer) = seg_with_timer(1024);
        let h = hash_of(b"k");
        seg.set(b"k", b"v", h, 1).unwrap();
        assert_eq!(seg.get(b"k", h).unwrap().0, b"v");
        timer.advance(2);
        assert_eq!(seg.get(b"k", h), Err(CacheError::NotFound));
        assert_eq!(seg.counters.expired, 1);
        assert_eq!(seg.entry_count, 0);
        seg.debug_validate_invariants();
    }

    #[test]
    fn ttl_discipline_matches_contract() {
        let (mut seg, timer) = seg_with_timer(1024);
        let h = hash_of(b"k");
        assert_eq!(seg.ttl(b"k", h), Err(CacheError::NotFound));
        seg.set(b"k", b"v", h, 0).unwrap();
        assert_eq!(seg.ttl(b"k", h), Ok(0));
        seg.set(b"k", b"v", h, 300).unwrap();
        assert_eq!(seg.ttl(b"k", h), Ok(300));
        timer.advance(300);
        assert_eq!(seg.ttl(b"k", h), Err(CacheError::NotFound));
    }

    #[test]
    fn touch_extends_deadline_and_counts() {
        let (mut seg, timer) = seg_with_timer(1024);
        let h1 = hash_of(b"abcd");
        let h2 = hash_of(b"ijkl");
        seg.set(b"abcd", b"efgh", h1, 1).unwrap();
        seg.set(b"ijkl", b"mnop", h2, 1).unwrap();
        assert_eq!(seg.counters.touches, 0);
        seg.touch(b"abcd", h1, 2).unwrap();
        timer.advance(1);
        assert_eq!(seg.ttl(b"abcd", h1), Ok(1));
        assert_eq!(seg.counters.touches, 1);
        assert_eq!(seg.touch(b"ijkl", h2, 2), Err(CacheError::NotFound));
        assert_eq!(seg.counters.touches, 1);
    }

    #[test]
    fn eviction_conserves_entries_plus_evacuations() {
        let (mut seg, _) = seg_with_timer(MIN_SEG_SIZE);
        let n = 500u32;
        for i in 0..n {
            let key = format!("key-{i}");
            let h = hash_of(key.as_bytes());
            seg.set(key.as_bytes(), b"A", h, 0).unwrap();
        }
        assert_eq!(seg.entry_count + seg.counters.evacuated, n as u64);
        assert!(seg.counters.evacuated > 0);
        seg.debug_validate_invariants();
    }

    #[test]
    fn eviction_readmits_recently_read_tail_record() {
        let (mut seg, timer) = seg_with_timer(MIN_SEG_SIZE);
        let hot = b"hot-key";
        let hot_hash = hash_of(hot);
        // hot sits at the ring tail, followed by cold records until the
        // ring is nearly full (each record is 24 + 6 + 10 = 40 bytes)
        seg.set(hot, b"hot-value", hot_hash, 0).unwrap();
        for i in 0..11 {
            let key = format!("cold-{i}");
            let h = hash_of(key.as_bytes());
            seg.set(key.as_bytes(), b"0123456789", h, 0).unwrap();
        }
        assert_eq!(seg.counters.evacuated, 0);

        // a later read makes hot strictly newer than the segment mean, so
        // the overflow inserts must reclaim cold records instead
        timer.advance(10);
        seg.get(hot, hot_hash).unwrap();
        for i in 0..4 {
            let key = format!("fill-{i}");
            let h = hash_of(key.as_bytes());
            seg.set(key.as_bytes(), b"0123456789", h, 0).unwrap();
        }
        assert!(seg.counters.evacuated > 0);
        assert_eq!(seg.get(hot, hot_hash).unwrap().0, b"hot-value");
        seg.debug_validate_invariants();
    }

    #[test]
    fn clear_keeps_statistics_but_drops_entries() {
        let (mut seg, _) = seg_with_timer(1024);
        let h = hash_of(b"k");
        seg.set(b"k", b"v", h, 0).unwrap();
        seg.get(b"k", h).unwrap();
        seg.clear();
        assert_eq!(seg.entry_count, 0);
        assert_eq!(seg.total_count, 0);
        assert_eq!(seg.counters.hits, 1);
        assert_eq!(seg.get(b"k", h), Err(CacheError::NotFound));
        seg.set(b"k", b"v2", h, 0).unwrap();
        assert_eq!(seg.get(b"k", h).unwrap().0, b"v2");
        seg.debug_validate_invariants();
    }

    #[test]
    fn deleted_entries_are_skipped_by_iteration_and_reclaimed_by_eviction() {
        let (mut seg, _) = seg_with_timer(MIN_SEG_SIZE);
        let h1 = hash_of(b"first");
        seg.set(b"first", b"v1", h1, 0).unwrap();
        assert!(seg.del(b"first", h1));
        let (mut b, mut s) = (0, 0);
        assert_eq!(seg.next_entry(&mut b, &mut s), None);
        // fill until the tombstone's bytes are reclaimed
        for i in 0..100 {
            let key = format!("k{i}");
            let h = hash_of(key.as_bytes());
            seg.set(key.as_bytes(), b"0123456789", h, 0).unwrap();
        }
        assert_eq!(seg.total_count, seg.entry_count as i64);
        seg.debug_validate_invariants();
    }
}
