use super::{GenerationAction, GenerationClient, GenerationError, GenerationRequest, GenerationResult};
use crate::blocks::{Block, BlockId};
use crate::config::DEFAULT_ERROR_MESSAGE;
use crate::ids::IdAllocator;
use crate::session::{EditorSession, SharedSession};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// One in-flight request. `placeholder` is the only block it ever writes.
#[derive(Clone, Debug)]
pub struct PendingGeneration {
    pub epoch: u64,
    pub placeholder: BlockId,
    pub request: GenerationRequest,
    cancel: CancellationToken,
}

impl PendingGeneration {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Drives generation requests against one session: placeholder insertion,
/// snapshot application, and the single finalization step.
#[derive(Debug)]
pub struct GenerationController {
    error_message: String,
    active: Mutex<Option<(u64, CancellationToken)>>,
}

impl Default for GenerationController {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_MESSAGE)
    }
}

impl GenerationController {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            active: Mutex::new(None),
        }
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Closes the menu, marks the session busy and inserts an empty
    /// placeholder after the focused block (or the last block), then drops
    /// focus. `selection`, when non-empty, replaces the whole document text
    /// as the source context.
    pub fn begin(
        &self,
        session: &mut EditorSession,
        ids: &dyn IdAllocator,
        action: GenerationAction,
        selection: &str,
        instruction: Option<String>,
    ) -> GenerationResult<PendingGeneration> {
        if session.busy {
            return Err(GenerationError::Busy);
        }

        session.menu = None;
        session.busy = true;
        session.generation_epoch += 1;
        let epoch = session.generation_epoch;

        let context = if selection.is_empty() {
            session.document.plain_text()
        } else {
            selection.to_string()
        };

        let anchor = session
            .focused
            .clone()
            .or_else(|| session.document.last_id().cloned());
        let placeholder = Block::paragraph(ids.next_id());
        let placeholder_id = placeholder.id().clone();
        session.document.insert_after(anchor.as_ref(), placeholder);
        session.focused = None;

        let cancel = CancellationToken::new();
        if let Some((_, previous)) = self.active.lock().replace((epoch, cancel.clone())) {
            previous.cancel();
        }

        tracing::info!(
            epoch,
            action = ?action,
            placeholder = %placeholder_id,
            anchor = ?anchor.as_ref().map(BlockId::as_str),
            "generation started"
        );

        let request = GenerationRequest {
            action,
            context,
            instruction,
        };
        Ok(PendingGeneration {
            epoch,
            placeholder: placeholder_id,
            request,
            cancel,
        })
    }

    /// Overwrites the placeholder with the latest cumulative snapshot.
    pub fn apply_snapshot(
        &self,
        session: &mut EditorSession,
        pending: &PendingGeneration,
        text: &str,
    ) -> bool {
        if pending.is_cancelled() || session.generation_epoch != pending.epoch {
            tracing::debug!(epoch = pending.epoch, "dropping snapshot from inactive request");
            return false;
        }
        session.document.update_content(&pending.placeholder, text)
    }

    /// Runs once per request. A failure overwrites the placeholder with the
    /// error message; busy and focus are only restored when no newer request
    /// has started since.
    pub fn finish(
        &self,
        session: &mut EditorSession,
        pending: &PendingGeneration,
        outcome: &GenerationOutcome,
    ) {
        if let GenerationOutcome::Failed(reason) = outcome {
            tracing::warn!(
                epoch = pending.epoch,
                placeholder = %pending.placeholder,
                error = %reason,
                "generation failed"
            );
            session
                .document
                .update_content(&pending.placeholder, self.error_message.as_str());
        }

        {
            let mut active = self.active.lock();
            if active.as_ref().is_some_and(|(epoch, _)| *epoch == pending.epoch) {
                *active = None;
            }
        }

        if session.generation_epoch != pending.epoch {
            tracing::debug!(epoch = pending.epoch, "newer request active, skipping focus handoff");
            return;
        }
        session.busy = false;
        if session.document.find_index(&pending.placeholder).is_some() {
            session.focused = Some(pending.placeholder.clone());
        }
        tracing::info!(epoch = pending.epoch, outcome = ?outcome, "generation finished");
    }

    /// Clears busy immediately and aborts the active request; snapshots that
    /// arrive afterwards are discarded.
    pub fn stop(&self, session: &mut EditorSession) {
        session.busy = false;
        if let Some((epoch, cancel)) = self.active.lock().take() {
            tracing::info!(epoch, "generation stopped");
            cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Streams `pending` to completion against `session`, calling
    /// `on_change` after each applied snapshot and after finalization.
    ///
    /// Finalization also runs if this future is dropped before it resolves;
    /// the request is then cancelled and finishes as `Cancelled`.
    pub async fn run(
        &self,
        session: &SharedSession,
        client: &dyn GenerationClient,
        pending: PendingGeneration,
        on_change: &(dyn Fn() + Send + Sync),
    ) -> GenerationOutcome {
        let guard = FinishGuard {
            controller: self,
            session,
            pending: &pending,
            on_change,
            armed: true,
        };
        let outcome = match self.drive(session, client, &pending, on_change).await {
            Ok(outcome) => outcome,
            Err(err) => GenerationOutcome::Failed(err.to_string()),
        };
        guard.complete(&outcome);
        outcome
    }

    async fn drive(
        &self,
        session: &SharedSession,
        client: &dyn GenerationClient,
        pending: &PendingGeneration,
        on_change: &(dyn Fn() + Send + Sync),
    ) -> GenerationResult<GenerationOutcome> {
        let mut stream = tokio::select! {
            biased;
            _ = pending.cancel.cancelled() => return Ok(GenerationOutcome::Cancelled),
            stream = client.stream_generate(pending.request.clone()) => stream?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = pending.cancel.cancelled() => return Ok(GenerationOutcome::Cancelled),
                next = stream.next() => next,
            };
            match next {
                None => return Ok(GenerationOutcome::Completed),
                Some(Ok(text)) => {
                    let applied = {
                        let mut guard = session.lock();
                        self.apply_snapshot(&mut guard, pending, &text)
                    };
                    if applied {
                        on_change();
                    }
                }
                Some(Err(err)) => return Err(err),
            }
        }
    }
}

/// Runs `finish` exactly once for a driven request, either explicitly via
/// `complete` or when the driving future is dropped mid-flight.
struct FinishGuard<'a> {
    controller: &'a GenerationController,
    session: &'a SharedSession,
    pending: &'a PendingGeneration,
    on_change: &'a (dyn Fn() + Send + Sync),
    armed: bool,
}

impl FinishGuard<'_> {
    fn complete(mut self, outcome: &GenerationOutcome) {
        self.armed = false;
        self.finalize(outcome);
    }

    fn finalize(&self, outcome: &GenerationOutcome) {
        {
            let mut session = self.session.lock();
            self.controller.finish(&mut session, self.pending, outcome);
        }
        (self.on_change)();
    }
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(epoch = self.pending.epoch, "generation dropped before completion");
        self.pending.cancel.cancel();
        self.finalize(&GenerationOutcome::Cancelled);
    }
}
