use crate::blocks::{BlockId, BlockType};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::generation::{
    GenerationAction, GenerationClient, GenerationController, GenerationOutcome, GenerationResult,
    Insights,
};
use crate::ids::{IdAllocator, UuidIds};
use crate::interaction::{self, KeyInput, KeyOutcome};
use crate::persist::{DocumentSink, PersistScheduler};
use crate::session::{EditorSession, SharedSession};
use std::sync::Arc;

/// One open page: its session state plus the collaborators that mutate it.
///
/// Every operation that changes the document restarts the debounced save.
pub struct Editor {
    session: SharedSession,
    ids: Arc<dyn IdAllocator>,
    client: Arc<dyn GenerationClient>,
    persist: PersistScheduler,
    generation: GenerationController,
}

impl Editor {
    pub fn new(
        document: Document,
        client: Arc<dyn GenerationClient>,
        sink: Arc<dyn DocumentSink>,
        config: &EditorConfig,
    ) -> Self {
        Self {
            session: EditorSession::new(document).into_shared(),
            ids: Arc::new(UuidIds),
            client,
            persist: PersistScheduler::new(sink, config.debounce()),
            generation: GenerationController::new(config.error_message.clone()),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn snapshot(&self) -> EditorSession {
        self.session.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.session.lock().busy
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> R {
        let (result, changed) = {
            let mut session = self.session.lock();
            let before = session.document.revision();
            let result = f(&mut *session);
            (result, session.document.revision() != before)
        };
        if changed {
            self.persist.schedule(&self.session);
        }
        result
    }

    pub fn key_down(&self, block_id: &BlockId, input: &KeyInput) -> KeyOutcome {
        let ids = Arc::clone(&self.ids);
        self.mutate(|session| interaction::handle_key(session, ids.as_ref(), block_id, input))
    }

    pub fn input(&self, block_id: &BlockId, text: impl Into<String>) -> bool {
        self.mutate(|session| interaction::input_text(session, block_id, text))
    }

    pub fn focus(&self, block_id: &BlockId) {
        interaction::focus(&mut self.session.lock(), block_id);
    }

    pub fn blur(&self) {
        interaction::blur(&mut self.session.lock());
    }

    pub fn hover(&self, block_id: &BlockId) {
        interaction::hover(&mut self.session.lock(), block_id);
    }

    pub fn unhover(&self) {
        interaction::unhover(&mut self.session.lock());
    }

    pub fn click_below_blocks(&self) -> BlockId {
        let ids = Arc::clone(&self.ids);
        self.mutate(|session| interaction::click_below_blocks(session, ids.as_ref()))
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.mutate(|session| session.document.set_title(title));
    }

    pub fn set_block_type(&self, block_id: &BlockId, block_type: BlockType) -> bool {
        self.mutate(|session| session.document.set_block_type(block_id, block_type))
    }

    pub fn toggle_checked(&self, block_id: &BlockId) -> bool {
        self.mutate(|session| session.document.toggle_checked(block_id))
    }

    /// Opens the generation menu from the floating button (no anchor) or a
    /// block. Ignored while a request is streaming.
    pub fn open_menu(&self, anchor: Option<BlockId>, selection: impl Into<String>) -> bool {
        let mut session = self.session.lock();
        if session.busy {
            return false;
        }
        interaction::open_menu(&mut session, anchor, selection);
        true
    }

    pub fn close_menu(&self) {
        interaction::close_menu(&mut self.session.lock());
    }

    /// Runs one generation request to completion. The selection captured by
    /// the open menu, if any, is the source context.
    pub async fn ask(
        &self,
        action: GenerationAction,
        instruction: Option<String>,
    ) -> GenerationResult<GenerationOutcome> {
        let pending = self.mutate(|session| {
            let selection = session
                .menu
                .as_ref()
                .map(|menu| menu.selection.clone())
                .unwrap_or_default();
            self.generation
                .begin(session, self.ids.as_ref(), action, &selection, instruction)
        })?;

        let persist = self.persist.clone();
        let session = Arc::clone(&self.session);
        let on_change = move || persist.schedule(&session);
        Ok(self
            .generation
            .run(&self.session, self.client.as_ref(), pending, &on_change)
            .await)
    }

    pub fn stop_generation(&self) {
        self.generation.stop(&mut self.session.lock());
    }

    /// Structured read of the finished document, for the insights view.
    pub async fn insights(&self) -> GenerationResult<Insights> {
        let text = self.session.lock().document.plain_text();
        let value = self.client.generate_structured(&text).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Commits the current state immediately, e.g. before navigating away.
    pub fn flush(&self) {
        self.persist.flush(&self.session);
    }
}
