//! Storage abstractions for the snapshot library.
//!
//! The whole library is one JSON document. Enrichment jobs persist progress
//! by reloading it and replacing their own collection.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml    # Crawler configuration
//! └── library.json   # Collections of channel snapshots
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Library;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for snapshot library backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the library. A store that was never written loads as empty.
    async fn load(&self) -> Result<Library>;

    /// Replace the stored library.
    async fn save(&self, library: &Library) -> Result<()>;
}
