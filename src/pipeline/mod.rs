//! Pipeline entry points for crawler operations.
//!
//! - `build_channel_snapshot` / `build_snapshots`: crawl channels into snapshots
//! - `EnrichmentManager`: backfill item detail for a stored collection

pub mod circuit_breaker;
pub mod enrich;
pub mod paginate;
pub mod snapshot;

pub use circuit_breaker::RateLimitBreaker;
pub use enrich::{EnrichmentManager, StartOutcome};
pub use paginate::{Pager, PagerState, SourceLimits, SourceRun};
pub use snapshot::{build_channel_snapshot, build_snapshots};
