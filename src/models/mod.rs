pub mod cache;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod size;

pub use cache::{CacheEntry, RecordCache, Reservation, Slot};
pub use fetch::{GitFetcher, RepoFetcher, WorkingRepo};
pub use pipeline::{Outcome, Pipeline};
pub use record::{cache_key, format_bytes, CacheRecord};
pub use size::{select_source, LegacyPointerScan, ShardIndex, SizeSource};
