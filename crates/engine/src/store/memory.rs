use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DocumentStore, Revision, Snapshot};
use crate::{Document, EngineError, ResultEngine};

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<Document, (u64, String)>,
    writes: usize,
}

/// Process-local store, used for development and tests.
///
/// Every document has its own counter revision; a missing document is at
/// revision `0`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Store pre-filled with raw JSON documents.
    pub fn with_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (Document, S)>,
        S: Into<String>,
    {
        let documents = documents
            .into_iter()
            .map(|(doc, content)| (doc, (1, content.into())))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                documents,
                writes: 0,
            }),
        }
    }

    /// Raw content of a document, if present.
    pub async fn raw(&self, doc: Document) -> Option<String> {
        let guard = self.inner.lock().await;
        guard.documents.get(&doc).map(|(_, content)| content.clone())
    }

    /// Number of successful writes since creation.
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, doc: Document) -> ResultEngine<Snapshot> {
        let guard = self.inner.lock().await;
        let snapshot = match guard.documents.get(&doc) {
            Some((version, content)) => Snapshot {
                revision: Revision::new(version.to_string()),
                content: Some(content.clone()),
            },
            None => Snapshot {
                revision: Revision::new("0"),
                content: None,
            },
        };
        Ok(snapshot)
    }

    async fn write(
        &self,
        doc: Document,
        expected: &Revision,
        content: String,
    ) -> ResultEngine<Revision> {
        let mut guard = self.inner.lock().await;
        let current = guard.documents.get(&doc).map_or(0, |(version, _)| *version);
        if expected.as_str() != current.to_string() {
            return Err(EngineError::Conflict(doc.to_string()));
        }

        let next = current + 1;
        guard.documents.insert(doc, (next, content));
        guard.writes += 1;
        Ok(Revision::new(next.to_string()))
    }
}
