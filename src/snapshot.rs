//! Snapshot codec: the whole store as a single JSON document.
//!
//! The on-disk layout is a map from library id to the full library object,
//! nested documents and chunks included. Timestamps are RFC 3339 strings and
//! embeddings plain JSON numbers. Indexes are never persisted; they are
//! rebuilt from the chunk data on load.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::models::Library;

/// Serialize all libraries into the on-disk JSON layout.
pub fn encode(libraries: &HashMap<String, Library>) -> Result<String> {
    serde_json::to_string_pretty(libraries)
        .map_err(|e| Error::Internal(format!("Failed to encode snapshot: {}", e)))
}

/// Decode a snapshot document.
///
/// A library entry that fails to decode is logged and skipped so one corrupt
/// record cannot prevent the rest of the store from loading. Unknown fields
/// are ignored.
pub fn decode(content: &str) -> Result<HashMap<String, Library>> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| Error::Internal(format!("Failed to parse snapshot: {}", e)))?;

    let mut libraries = HashMap::with_capacity(raw.len());
    for (library_id, value) in raw {
        match serde_json::from_value::<Library>(value) {
            Ok(library) => {
                libraries.insert(library_id, library);
            }
            Err(e) => {
                error!("Failed to load library {}: {}", library_id, e);
            }
        }
    }
    Ok(libraries)
}

/// Write a complete snapshot to `path`.
///
/// Goes through a temp file and an atomic rename so a crash mid-write never
/// truncates the previous snapshot.
pub fn write(path: &Path, libraries: &HashMap<String, Library>) -> Result<()> {
    let json = encode(libraries)?;
    let tmp = path.with_extension("tmp");

    fs::write(&tmp, json)
        .map_err(|e| Error::Internal(format!("Failed to write snapshot {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        Error::Internal(format!("Failed to replace snapshot {}: {}", path.display(), e))
    })?;

    debug!("💾 Snapshot written to {}", path.display());
    Ok(())
}

/// Read a snapshot from `path`. Returns an empty map when the file does not
/// exist.
pub fn read(path: &Path) -> Result<HashMap<String, Library>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Internal(format!("Failed to read snapshot {}: {}", path.display(), e)))?;
    decode(&content)
}
