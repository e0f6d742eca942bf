//! # Document Repository
//!
//! Persistence seam for document trees.
//!
//! ## Update Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update(id, f)                                                          │
//! │                                                                         │
//! │   lock ──► clone stored doc ──► f(&mut clone) ──┬── Ok  ──► commit      │
//! │                                                 └── Err ──► discard     │
//! │   unlock                                                                │
//! │                                                                         │
//! │  The lock is held for the whole closure, so two releases on the same    │
//! │  guarantee can never interleave their check and their append.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use batidoc_core::Document;

use crate::error::{ServiceError, ServiceResult};

/// Storage for documents, keyed by document id.
pub trait DocumentRepository: Send + Sync {
    /// Stores a new document. Fails if the id is taken.
    fn insert(&self, document: Document) -> ServiceResult<()>;

    /// Returns a snapshot of a document.
    fn get(&self, id: &str) -> ServiceResult<Document>;

    fn contains(&self, id: &str) -> ServiceResult<bool>;

    /// Runs `f` on a copy of the document and stores the copy only if `f`
    /// succeeds.
    fn update<F, R>(&self, id: &str, f: F) -> ServiceResult<R>
    where
        F: FnOnce(&mut Document) -> ServiceResult<R>;

    /// Snapshots of every stored document.
    fn list(&self) -> ServiceResult<Vec<Document>>;
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    documents: Mutex<HashMap<String, Document>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ServiceResult<MutexGuard<'_, HashMap<String, Document>>> {
        self.documents
            .lock()
            .map_err(|_| ServiceError::Internal("document store mutex poisoned".into()))
    }

    /// Executes a function with read access to the store.
    fn with_documents<F, R>(&self, f: F) -> ServiceResult<R>
    where
        F: FnOnce(&HashMap<String, Document>) -> ServiceResult<R>,
    {
        let documents = self.lock()?;
        f(&documents)
    }

    /// Executes a function with write access to the store.
    fn with_documents_mut<F, R>(&self, f: F) -> ServiceResult<R>
    where
        F: FnOnce(&mut HashMap<String, Document>) -> ServiceResult<R>,
    {
        let mut documents = self.lock()?;
        f(&mut documents)
    }
}

impl DocumentRepository for InMemoryRepository {
    fn insert(&self, document: Document) -> ServiceResult<()> {
        self.with_documents_mut(|documents| {
            if documents.contains_key(&document.id) {
                return Err(ServiceError::Duplicate {
                    entity: "Document".into(),
                    id: document.id.clone(),
                });
            }
            documents.insert(document.id.clone(), document);
            Ok(())
        })
    }

    fn get(&self, id: &str) -> ServiceResult<Document> {
        self.with_documents(|documents| {
            documents
                .get(id)
                .cloned()
                .ok_or_else(|| ServiceError::not_found("Document", id))
        })
    }

    fn contains(&self, id: &str) -> ServiceResult<bool> {
        self.with_documents(|documents| Ok(documents.contains_key(id)))
    }

    fn update<F, R>(&self, id: &str, f: F) -> ServiceResult<R>
    where
        F: FnOnce(&mut Document) -> ServiceResult<R>,
    {
        self.with_documents_mut(|documents| {
            let stored = documents
                .get_mut(id)
                .ok_or_else(|| ServiceError::not_found("Document", id))?;
            let mut draft = stored.clone();
            let result = f(&mut draft)?;
            *stored = draft;
            Ok(result)
        })
    }

    fn list(&self) -> ServiceResult<Vec<Document>> {
        self.with_documents(|documents| Ok(documents.values().cloned().collect()))
    }
}
