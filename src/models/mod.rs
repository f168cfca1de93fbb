// src/models/mod.rs

//! Domain models for the crawler.
//!
//! This module contains all data structures used throughout the crate,
//! organized by their primary purpose.

mod channel;
mod config;
mod cursor;
mod item;
mod job;
mod library;

// Re-export all public types
pub use channel::{
    ChannelLink, ChannelMeta, ChannelRef, ChannelSnapshot, SourceKind, SourceSummary, StopReason,
    Tab,
};
pub use config::{Config, CrawlerConfig, EnrichmentConfig, Limits};
pub use cursor::Cursor;
pub use item::{ContentItem, ContentKind, Enrichment};
pub use job::{EnrichmentJob, JobStatus};
pub use library::{Collection, Library};
