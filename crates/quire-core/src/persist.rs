use crate::blocks::Block;
use crate::document::DocumentId;
use crate::session::SharedSession;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Host-side storage hook, called once per quiet period.
pub trait DocumentSink: Send + Sync {
    fn on_document_changed(&self, document_id: &DocumentId, blocks: &[Block], title: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub struct SavedDocument {
    pub document_id: DocumentId,
    pub blocks: Vec<Block>,
    pub title: String,
}

/// Sink that keeps every commit in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saves: Mutex<Vec<SavedDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> Vec<SavedDocument> {
        self.saves.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saves.lock().is_empty()
    }

    pub fn last(&self) -> Option<SavedDocument> {
        self.saves.lock().last().cloned()
    }
}

impl DocumentSink for MemorySink {
    fn on_document_changed(&self, document_id: &DocumentId, blocks: &[Block], title: &str) {
        self.saves.lock().push(SavedDocument {
            document_id: document_id.clone(),
            blocks: blocks.to_vec(),
            title: title.to_string(),
        });
    }
}

struct SchedulerInner {
    sink: Arc<dyn DocumentSink>,
    delay: Duration,
    epoch: AtomicU64,
    committed_revision: Mutex<Option<u64>>,
}

/// Debounces document changes: each `schedule` restarts the quiet period and
/// only the timer armed last commits.
#[derive(Clone)]
pub struct PersistScheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for PersistScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistScheduler")
            .field("delay", &self.inner.delay)
            .field("epoch", &self.inner.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

impl PersistScheduler {
    pub fn new(sink: Arc<dyn DocumentSink>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                sink,
                delay,
                epoch: AtomicU64::new(0),
                committed_revision: Mutex::new(None),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Restarts the quiet period. Debouncing needs a tokio runtime: called
    /// outside one, every call commits immediately, so N changes give N saves.
    pub fn schedule(&self, session: &SharedSession) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime for debounced save, committing immediately");
            self.inner.commit(session);
            return;
        };
        let inner = Arc::clone(&self.inner);
        let session = Arc::clone(session);
        runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            inner.commit(&session);
        });
    }

    /// Commits right away and cancels any pending timer.
    pub fn flush(&self, session: &SharedSession) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(session);
    }
}

impl SchedulerInner {
    fn commit(&self, session: &SharedSession) {
        let (document_id, blocks, title, revision) = {
            let session = session.lock();
            let document = &session.document;
            (
                document.id.clone(),
                document.blocks().to_vec(),
                document.title().to_string(),
                document.revision(),
            )
        };

        {
            let mut committed = self.committed_revision.lock();
            if *committed == Some(revision) {
                return;
            }
            *committed = Some(revision);
        }

        tracing::debug!(document = %document_id, revision, blocks = blocks.len(), "saving document");
        self.sink.on_document_changed(&document_id, &blocks, &title);
    }
}
