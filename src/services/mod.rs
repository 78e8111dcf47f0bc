//! Service layer: validation, duplicate detection, and cross-library
//! orchestration on top of the store.
//!
//! Services own no state beyond a shared store handle; the HTTP adapter is
//! the only caller and converts the error kinds they return into status
//! codes.

mod document;
mod library;
mod search;

pub use document::DocumentService;
pub use library::LibraryService;
pub use search::SearchService;

use std::sync::Arc;

use crate::store::Store;

/// All services over one store handle, shared with the HTTP adapter.
#[derive(Clone)]
pub struct Services {
    pub libraries: LibraryService,
    pub documents: DocumentService,
    pub search: SearchService,
}

impl Services {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            libraries: LibraryService::new(store.clone()),
            documents: DocumentService::new(store.clone()),
            search: SearchService::new(store),
        }
    }
}
