//! Remote key-value document store.
//!
//! A store holds a handful of named JSON documents (see [`Document`]). It
//! only knows whole documents: every change is a full read, a local
//! mutation and a full write. Writes are conditional on the [`Revision`]
//! observed by the read, so a concurrent writer turns into
//! [`EngineError::Conflict`] instead of a lost update.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Document, EngineError, ResultEngine};

mod gist;
mod memory;

pub use gist::GistStore;
pub use memory::MemoryStore;

/// How many times a conflicting read-modify-write is replayed.
const MAX_ATTEMPTS: usize = 3;

/// Opaque version token of a document (or of the whole container).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw content of a document at a given revision. `content` is `None` when
/// the document does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub revision: Revision,
    pub content: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, doc: Document) -> ResultEngine<Snapshot>;

    /// Replaces the document if it is still at `expected`, returning the new
    /// revision, or fails with [`EngineError::Conflict`].
    async fn write(
        &self,
        doc: Document,
        expected: &Revision,
        content: String,
    ) -> ResultEngine<Revision>;
}

/// Outcome of a mutation closure passed to [`Documents::update`].
pub(crate) enum Mutation<R> {
    /// The document changed and must be written back.
    Write(R),
    /// Nothing changed; skip the write.
    Keep(R),
}

/// Typed access on top of a [`DocumentStore`].
#[derive(Clone)]
pub(crate) struct Documents {
    store: Arc<dyn DocumentStore>,
}

impl Documents {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub(crate) async fn load<T>(&self, doc: Document) -> ResultEngine<T>
    where
        T: DeserializeOwned + Default,
    {
        let snapshot = self.store.read(doc).await?;
        decode(doc, snapshot.content.as_deref())
    }

    /// Read-modify-write of one document, replayed on conflicts.
    pub(crate) async fn update<T, R, F>(&self, doc: Document, mut f: F) -> ResultEngine<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnMut(&mut T) -> ResultEngine<Mutation<R>>,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let snapshot = self.store.read(doc).await?;
            let mut value: T = decode(doc, snapshot.content.as_deref())?;

            let result = match f(&mut value)? {
                Mutation::Keep(result) => return Ok(result),
                Mutation::Write(result) => result,
            };

            match self
                .store
                .write(doc, &snapshot.revision, encode(&value)?)
                .await
            {
                Ok(_) => return Ok(result),
                Err(EngineError::Conflict(_)) => {
                    tracing::warn!("{doc} changed while writing (attempt {attempt}/{MAX_ATTEMPTS})");
                }
                Err(err) => return Err(err),
            }
        }

        Err(EngineError::Conflict(doc.to_string()))
    }
}

fn decode<T>(doc: Document, content: Option<&str>) -> ResultEngine<T>
where
    T: DeserializeOwned + Default,
{
    match content.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|err| {
            tracing::error!("{doc} holds malformed JSON: {err}");
            EngineError::Serialization(err)
        }),
    }
}

/// Pretty JSON indented with four spaces.
fn encode<T: Serialize>(value: &T) -> ResultEngine<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|err| EngineError::Store(err.to_string()))
}
