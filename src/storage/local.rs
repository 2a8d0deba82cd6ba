//! Local filesystem storage implementation.
//!
//! Keeps the whole document in memory and rewrites the backing file after
//! every mutation. Writes go to a temp file first and are renamed into place,
//! so a crash mid-write never leaves a truncated document behind.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::map::Entry;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{DocumentStore, segments};

/// JSON document store backed by a single file.
pub struct JsonStore {
    path: PathBuf,
    document: Mutex<Value>,
}

impl JsonStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => empty_document(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::store(format!("{} is not valid JSON: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store at {}, starting empty", path.display());
                empty_document()
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn save(&self, document: &Value) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        self.write_bytes(&bytes).await.map_err(|e| {
            AppError::store(format!("failed to persist {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl DocumentStore for JsonStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let document = self.document.lock().await;
        let found = segments(path)
            .iter()
            .try_fold(&*document, |node, segment| node.get(*segment));
        Ok(found.cloned())
    }

    async fn push(&self, path: &str, value: Value) -> Result<()> {
        let mut document = self.document.lock().await;
        merge(slot_mut(&mut document, &segments(path)), value);
        self.save(&document).await
    }

    async fn update(&self, path: &str, value: Value) -> Result<()> {
        let mut document = self.document.lock().await;
        *slot_mut(&mut document, &segments(path)) = value;
        self.save(&document).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut document = self.document.lock().await;
        let segments = segments(path);
        match segments.split_last() {
            None => *document = empty_document(),
            Some((last, parents)) => {
                let parent = parents
                    .iter()
                    .try_fold(&mut *document, |node, segment| node.get_mut(*segment));
                if let Some(Value::Object(map)) = parent {
                    map.remove(*last);
                }
            }
        }
        self.save(&document).await
    }
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}

/// Walk to `segments`, creating objects along the way.
///
/// Intermediate non-object values are replaced by empty objects.
fn slot_mut<'a>(root: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    let mut current = root;
    for segment in segments {
        if !current.is_object() {
            *current = empty_document();
        }
        let Value::Object(map) = current else {
            unreachable!("slot was just replaced by an object")
        };
        current = map.entry(segment.to_string()).or_insert(Value::Null);
    }
    current
}

fn merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.entry(key) {
                    Entry::Occupied(mut slot) => merge(slot.get_mut(), value),
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) => existing.extend(incoming),
        (target, incoming) => *target = incoming,
    }
}
