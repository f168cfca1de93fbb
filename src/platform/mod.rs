//! Network primitives the crawler consumes.
//!
//! Pagination and enrichment only see the [`Platform`] trait, so tests can
//! substitute a scripted implementation for the HTTP one.

mod youtube;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::Cursor;
use crate::services::ItemDetail;

pub use youtube::YoutubePlatform;

/// Fetch operations against the video platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Raw markup of a page.
    ///
    /// Fails with [`AppError::Fetch`](crate::error::AppError::Fetch) on a
    /// non-success status and
    /// [`AppError::RateLimited`](crate::error::AppError::RateLimited) on 429.
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// The next page of a paginated list, as the raw response document.
    async fn fetch_continuation(&self, cursor: &Cursor) -> Result<Value>;

    /// Publish date and description of one item.
    async fn fetch_item_detail(&self, item_id: &str) -> Result<ItemDetail>;
}
