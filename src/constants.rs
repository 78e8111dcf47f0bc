//! Central constants for vecbase configuration
//!
//! All defaults for paths, index tuning, and validation limits are defined
//! here to avoid duplication and ensure consistency across the codebase.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag, set by the CTRL-C handler.
///
/// This uses a raw `AtomicBool` alongside the `CancellationToken` because the
/// handler registered with `ctrlc` runs on its own thread and the flag must
/// be visible from any thread without async polling.
pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check whether a graceful shutdown has been requested (CTRL-C).
#[inline]
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Default bind address for the HTTP server
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port for the HTTP server
pub const DEFAULT_PORT: u16 = 8000;

/// Default snapshot file path. The parent directory is created at startup.
pub const DEFAULT_PERSISTENCE_PATH: &str = "data/vector_db.json";

/// Default number of random hyperplanes for LSH indexes
pub const DEFAULT_LSH_NUM_HASHES: usize = 10;

/// Default number of hash buckets for LSH indexes
pub const DEFAULT_LSH_NUM_BUCKETS: usize = 100;

/// Exploration threshold for KD-tree search.
///
/// During descent the off-side subtree is only visited when the absolute
/// perpendicular distance from the query to the split plane is below this
/// value. Search is approximate: shrinking the threshold trades accuracy
/// for fewer visited nodes.
pub const KDTREE_EXPLORATION_THRESHOLD: f32 = 0.1;

/// Maximum number of neighbours a single search may request
pub const MAX_SEARCH_K: usize = 100;

/// Maximum number of search suggestions a single request may ask for
pub const MAX_SUGGESTION_LIMIT: usize = 20;

/// Maximum length of library and document names
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a library description
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Default log file name when file logging is enabled without an explicit path
pub const DEFAULT_LOG_FILE: &str = "vecbase.log";
