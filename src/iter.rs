//! Forward iteration over live entries.
//!
//! The iterator keeps a `(segment, bucket, slot)` cursor and takes one
//! segment lock per step, never across steps. Entries that live through the
//! whole walk are yielded exactly once; entries inserted, deleted or
//! repacked mid-walk may be missed or yielded twice. Expired and tombstoned
//! records are skipped.

use crate::cache::{Cache, SEGMENT_COUNT};

/// An owned copy of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

pub struct Iter<'a> {
    cache: &'a Cache,
    segment_idx: usize,
    bucket_idx: usize,
    slot_idx: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(cache: &'a Cache) -> Self {
        Self {
            cache,
            segment_idx: 0,
            bucket_idx: 0,
            slot_idx: 0,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        while self.segment_idx < SEGMENT_COUNT {
            let segment = self.cache.segments[self.segment_idx].lock();
            if let Some((key, value)) = segment.next_entry(&mut self.bucket_idx, &mut self.slot_idx)
            {
                return Some(Entry { key, value });
            }
            drop(segment);
            self.segment_idx += 1;
            self.bucket_idx = 0;
            self.slot_idx = 0;
        }
        None
    }
}
