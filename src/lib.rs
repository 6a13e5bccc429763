//! ringcache: a sharded, fixed-capacity cache for opaque byte sequences.
//!
//! 256 mutex-guarded segments, each a pre-allocated ring buffer with a
//! sorted slot index and FIFO eviction that re-admits recently accessed
//! entries. Memory use is bounded at construction; the hot read paths
//! (`get_into`, `get_fn`) do not allocate.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod entry;
pub mod error;
pub mod iter;
pub mod metrics;
pub mod prelude;
pub mod timer;

mod segment;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::CacheError;
pub use iter::{Entry, Iter};
pub use metrics::CacheStats;
pub use timer::{SystemTimer, Timer};
