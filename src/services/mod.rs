//! Parsing layer for the crawler.
//!
//! This module turns raw platform pages into domain values:
//! - Embedded payload extraction (`extractor`)
//! - Content list normalization (`renderers`)
//! - Channel metadata (`channel`)
//! - Watch-page detail (`detail`)

pub mod channel;
pub mod detail;
pub mod extractor;
pub mod renderers;

pub use detail::{ItemDetail, parse_item_detail};
pub use extractor::{INITIAL_DATA, PLAYER_RESPONSE, extract_embedded_json};
pub use renderers::{NormalizedPage, normalize_continuation, normalize_tab, selected_tab};
