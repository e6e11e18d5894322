pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::dao::storage::StorageResult;
use crate::state::session::{DocumentPatch, SessionDocument};

/// Outcome of a `create` call against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document was stored under its code.
    Created,
    /// Another session already owns the code; nothing was written.
    CodeTaken,
}

/// Abstraction over the shared, replicated session-document store.
///
/// The contract mirrors what the environment is assumed to provide: reads
/// return whole documents, every update is an atomic multi-field patch, and
/// subscriptions deliver the full document on each change. Snapshots observed
/// through a subscription advance monotonically; intermediate snapshots may
/// be conflated but a half-applied patch is never visible.
pub trait SessionStore: Send + Sync {
    /// Store a brand-new session document, refusing duplicate codes.
    fn create(&self, document: SessionDocument) -> BoxFuture<'static, StorageResult<CreateOutcome>>;
    /// Fetch the current document for a code.
    fn read(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionDocument>>>;
    /// Apply a patch indivisibly, returning the updated document.
    fn update(
        &self,
        code: &str,
        patch: DocumentPatch,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDocument>>>;
    /// Subscribe to whole-document snapshots for a code.
    fn subscribe(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<watch::Receiver<SessionDocument>>>>;
    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
