pub use crate::builder::CacheBuilder;
pub use crate::cache::Cache;
pub use crate::error::CacheError;
pub use crate::iter::{Entry, Iter};
pub use crate::metrics::CacheStats;
pub use crate::timer::{SystemTimer, Timer};
