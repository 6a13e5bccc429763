//! Cache construction.
//!
//! [`Cache::new`](crate::Cache::new) covers the common case; the builder
//! exists for injecting a custom time source.
//!
//! ## Example
//!
//! ```
//! use ringcache::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new(16 * 1024 * 1024).build();
//! cache.set(b"k", b"v", 0).unwrap();
//! assert_eq!(cache.get(b"k").unwrap(), b"v");
//! ```

use std::sync::Arc;

use crate::cache::Cache;
use crate::timer::{SystemTimer, Timer};

/// Builder for a [`Cache`].
pub struct CacheBuilder {
    size: usize,
    timer: Option<Arc<dyn Timer>>,
}

impl CacheBuilder {
    /// Starts a builder for a cache of `size` total bytes. The size is
    /// divided across 256 segments with a 512-byte floor per segment, so
    /// tiny sizes are rounded up rather than rejected.
    pub fn new(size: usize) -> Self {
        Self { size, timer: None }
    }

    /// Injects a time source. Defaults to the Unix wall clock.
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn build(self) -> Cache {
        match self.timer {
            Some(timer) => Cache::with_timer(self.size, timer),
            None => Cache::with_timer(self.size, Arc::new(SystemTimer)),
        }
    }
}
