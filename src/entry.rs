//! On-ring entry layout and slot index records.
//!
//! Every record in a segment's ring is a fixed 24-byte header followed by the
//! key bytes and `val_cap` bytes of value storage (`val_len` of which are
//! live). Headers are serialized little-endian so a dump of the ring is
//! stable across platforms.
//!
//! ```text
//!   byte  0        4          8         10        12        16        20  21  22
//!   ┌──────────┬──────────┬─────────┬─────────┬─────────┬─────────┬───┬───┬────┐
//!   │access_   │expire_at │ key_len │ hash16  │ val_len │ val_cap │del│slt│rsvd│
//!   │time  u32 │  u32     │  u16    │  u16    │  u32    │  u32    │u8 │u8 │ 2B │
//!   └──────────┴──────────┴─────────┴─────────┴─────────┴─────────┴───┴───┴────┘
//!   │◄────────────────────────── ENTRY_HDR_SIZE = 24 ──────────────────────────►│
//!   followed by: key bytes (key_len) · value bytes (val_len) · pad (val_cap - val_len)
//! ```
//!
//! `hash16` carries bits 16..31 of the key hash (bits 0..7 select the
//! segment, bits 8..15 the bucket, so these are the lowest bits that vary
//! within a bucket). `slot_id` is the owning bucket index; both fields let
//! the eviction walk find a record's slot without rehashing the key.

/// Serialized header size in bytes.
pub const ENTRY_HDR_SIZE: usize = 24;

/// Hard limit on key length; `key_len` is a u16.
pub const MAX_KEY_LEN: usize = 65535;

/// Fixed per-record header, decoded from / encoded to the ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryHdr {
    pub access_time: u32,
    pub expire_at: u32,
    pub key_len: u16,
    pub hash16: u16,
    pub val_len: u32,
    pub val_cap: u32,
    pub deleted: bool,
    pub slot_id: u8,
}

impl EntryHdr {
    pub fn from_bytes(buf: &[u8; ENTRY_HDR_SIZE]) -> Self {
        Self {
            access_time: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            expire_at: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            key_len: u16::from_le_bytes([buf[8], buf[9]]),
            hash16: u16::from_le_bytes([buf[10], buf[11]]),
            val_len: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            val_cap: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            deleted: buf[20] != 0,
            slot_id: buf[21],
        }
    }

    pub fn to_bytes(self) -> [u8; ENTRY_HDR_SIZE] {
        let mut buf = [0u8; ENTRY_HDR_SIZE];
        buf[0..4].copy_from_slice(&self.access_time.to_le_bytes());
        buf[4..8].copy_from_slice(&self.expire_at.to_le_bytes());
        buf[8..10].copy_from_slice(&self.key_len.to_le_bytes());
        buf[10..12].copy_from_slice(&self.hash16.to_le_bytes());
        buf[12..16].copy_from_slice(&self.val_len.to_le_bytes());
        buf[16..20].copy_from_slice(&self.val_cap.to_le_bytes());
        buf[20] = self.deleted as u8;
        buf[21] = self.slot_id;
        buf
    }

    /// Total ring bytes occupied by the record this header describes.
    #[inline]
    pub fn entry_len(&self) -> u64 {
        ENTRY_HDR_SIZE as u64 + self.key_len as u64 + self.val_cap as u64
    }
}

/// Index record: locates one entry's header inside the ring.
///
/// Buckets keep their slots sorted by `hash16`; `key_len` is duplicated here
/// so a lookup can reject most colliding slots without touching the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: u64,
    pub hash16: u16,
    pub key_len: u16,
}

#[inline]
pub fn is_expired(expire_at: u32, now: u32) -> bool {
    expire_at != 0 && expire_at <= now
}
