//! Error type for cache operations.
//!
//! The error surface is deliberately small: every fallible operation either
//! succeeds with its declared result or returns one of these three kinds.
//! Corrupted internal state (an index pointing outside the ring's live
//! window) is a bug, not an error, and aborts with a diagnostic instead.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent, expired, or deleted.
    NotFound,
    /// Key length outside `1..=65535`.
    LargeKey,
    /// `header + key + value` exceeds a quarter of the segment's ring
    /// capacity; admitting it would stall eviction.
    LargeEntry,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound => f.write_str("entry not found"),
            CacheError::LargeKey => f.write_str("key length outside 1..=65535"),
            CacheError::LargeEntry => f.write_str("entry larger than 1/4 of segment capacity"),
        }
    }
}

impl std::error::Error for CacheError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_condition() {
        assert_eq!(CacheError::NotFound.to_string(), "entry not found");
        assert!(CacheError::LargeKey.to_string().contains("65535"));
        assert!(CacheError::LargeEntry.to_string().contains("1/4"));
    }

    #[test]
    fn implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CacheError>();
    }
}
