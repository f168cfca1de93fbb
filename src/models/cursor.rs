//! Continuation cursor.

use serde::{Deserialize, Serialize};

/// Opaque, source-scoped continuation token plus the URL of the content it
/// continues. The URL is restated on the continuation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cursor {
    pub token: String,
    pub context_url: String,
}

impl Cursor {
    pub fn new(token: impl Into<String>, context_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            context_url: context_url.into(),
        }
    }
}
