//! Storage abstractions for cached readings.
//!
//! The store is a single JSON document addressed by `/`-separated paths:
//!
//! ```text
//! storage/
//! └── dailyReadingsDatabase.json
//!     {
//!       "dailyReadings": "[[{\"massId\": ...}, ...]]"
//!     }
//! ```

pub mod local;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::JsonStore;

/// Path-addressed JSON document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Merge `value` into `path`.
    ///
    /// Objects merge key by key, arrays append, anything else replaces.
    async fn push(&self, path: &str, value: Value) -> Result<()>;

    /// Replace the value at `path`.
    async fn update(&self, path: &str, value: Value) -> Result<()>;

    /// Remove `path`. Missing paths are ignored.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Split a store path into its non-empty segments.
///
/// `""` and `"/"` address the document root.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
