//! Keyboard and pointer handling over an [`EditorSession`].
//!
//! Every transition here is infallible: ids that are no longer in the
//! document resolve to [`KeyOutcome::PassThrough`] or a silent no-op.

use crate::blocks::{Block, BlockId};
use crate::ids::IdAllocator;
use crate::session::{EditorSession, GenerationMenu};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Space,
    Escape,
    Char(char),
    Other(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::default()
        }
    }

    /// Platform command key: ctrl on most systems, meta on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Text currently selected in the host surface, if any.
    pub selection: String,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            selection: String::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = selection.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed; the host must suppress its default behavior.
    Handled,
    /// Ordinary text editing; the host applies it and reports via [`input_text`].
    PassThrough,
    /// Open the generation menu anchored at the given block.
    OpenMenu(GenerationMenu),
}

pub fn handle_key(
    session: &mut EditorSession,
    ids: &dyn IdAllocator,
    block_id: &BlockId,
    input: &KeyInput,
) -> KeyOutcome {
    if session.document.find_index(block_id).is_none() {
        tracing::debug!(block_id = %block_id, "key event for stale block");
        return KeyOutcome::PassThrough;
    }

    match input.key {
        Key::Enter if !input.modifiers.shift => {
            split_after(session, ids, block_id);
            KeyOutcome::Handled
        }
        Key::Backspace => {
            if delete_if_empty(session, block_id) {
                KeyOutcome::Handled
            } else {
                KeyOutcome::PassThrough
            }
        }
        Key::Space if input.modifiers.command() => {
            let menu = GenerationMenu::new(Some(block_id.clone()), input.selection.clone());
            session.menu = Some(menu.clone());
            KeyOutcome::OpenMenu(menu)
        }
        Key::Escape if session.menu_open() => {
            close_menu(session);
            KeyOutcome::Handled
        }
        _ => KeyOutcome::PassThrough,
    }
}

/// Enter: a fresh empty paragraph right after `block_id`, which takes focus.
fn split_after(session: &mut EditorSession, ids: &dyn IdAllocator, block_id: &BlockId) {
    let block = Block::paragraph(ids.next_id());
    let new_id = block.id().clone();
    session.document.insert_after(Some(block_id), block);
    session.focused = Some(new_id);
}

/// Backspace on an empty block: remove it and focus whatever preceded it.
fn delete_if_empty(session: &mut EditorSession, block_id: &BlockId) -> bool {
    let is_empty = session
        .document
        .get(block_id)
        .is_some_and(|block| block.is_empty());
    if !is_empty || session.document.len() <= 1 {
        return false;
    }
    let prev = session.document.find_prev(block_id).map(|b| b.id().clone());
    if !session.document.delete_block(block_id) {
        return false;
    }
    if session.hovered.as_ref() == Some(block_id) {
        session.hovered = None;
    }
    session.focused = prev;
    true
}

pub fn input_text(session: &mut EditorSession, block_id: &BlockId, text: impl Into<String>) -> bool {
    session.document.update_content(block_id, text)
}

pub fn focus(session: &mut EditorSession, block_id: &BlockId) {
    if session.document.find_index(block_id).is_some() {
        session.focused = Some(block_id.clone());
    }
}

pub fn blur(session: &mut EditorSession) {
    session.focused = None;
}

pub fn hover(session: &mut EditorSession, block_id: &BlockId) {
    if session.document.find_index(block_id).is_some() {
        session.hovered = Some(block_id.clone());
    }
}

pub fn unhover(session: &mut EditorSession) {
    session.hovered = None;
}

/// Click in the empty area below the last block.
pub fn click_below_blocks(session: &mut EditorSession, ids: &dyn IdAllocator) -> BlockId {
    let block = Block::paragraph(ids.next_id());
    let id = block.id().clone();
    session.document.append_block(block);
    session.focused = Some(id.clone());
    id
}

pub fn open_menu(session: &mut EditorSession, anchor: Option<BlockId>, selection: impl Into<String>) {
    session.menu = Some(GenerationMenu::new(anchor, selection));
}

pub fn close_menu(session: &mut EditorSession) {
    session.menu = None;
}

#[cfg(test)]
mod tests {
    use super::{handle_key, hover, input_text, Key, KeyInput, KeyOutcome, Modifiers};
    use crate::blocks::{Block, BlockId, BlockType};
    use crate::document::{Document, DocumentId};
    use crate::ids::SequentialIds;
    use crate::session::EditorSession;

    fn session(blocks: Vec<(&str, &str)>) -> EditorSession {
        let blocks = blocks
            .into_iter()
            .map(|(id, text)| Block::new(BlockId::new(id), BlockType::Paragraph, text))
            .collect();
        let document = Document::new(DocumentId::new("d"), "", blocks, &SequentialIds::default());
        EditorSession::new(document)
    }

    fn order(session: &EditorSession) -> Vec<String> {
        session
            .document
            .blocks()
            .iter()
            .map(|b| b.id().to_string())
            .collect()
    }

    #[test]
    fn enter_inserts_empty_paragraph_and_moves_focus() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "X"), ("b", "tail")]);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("a"), &KeyInput::new(Key::Enter));
        assert_eq!(outcome, KeyOutcome::Handled);
        assert_eq!(order(&session), vec!["a", "n1", "b"]);
        assert_eq!(session.document.blocks()[0].content, "X");
        let inserted = &session.document.blocks()[1];
        assert!(inserted.is_empty());
        assert_eq!(inserted.block_type, BlockType::Paragraph);
        assert_eq!(session.focused, Some(BlockId::new("n1")));
    }

    #[test]
    fn enter_on_empty_block_still_inserts() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "")]);
        handle_key(&mut session, &ids, &BlockId::new("a"), &KeyInput::new(Key::Enter));
        assert_eq!(session.document.len(), 2);
    }

    #[test]
    fn shift_enter_passes_through() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "line")]);
        let input = KeyInput::new(Key::Enter).with_modifiers(Modifiers::shift());
        let outcome = handle_key(&mut session, &ids, &BlockId::new("a"), &input);
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(session.document.len(), 1);
    }

    #[test]
    fn backspace_on_empty_block_deletes_and_focuses_previous() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "1"), ("b", ""), ("c", "3")]);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("b"), &KeyInput::new(Key::Backspace));
        assert_eq!(outcome, KeyOutcome::Handled);
        assert_eq!(order(&session), vec!["a", "c"]);
        assert_eq!(session.focused, Some(BlockId::new("a")));
    }

    #[test]
    fn backspace_on_first_empty_block_leaves_no_focus() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", ""), ("b", "2")]);
        session.focused = Some(BlockId::new("a"));
        handle_key(&mut session, &ids, &BlockId::new("a"), &KeyInput::new(Key::Backspace));
        assert_eq!(order(&session), vec!["b"]);
        assert_eq!(session.focused, None);
    }

    #[test]
    fn backspace_on_only_block_is_noop() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "")]);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("a"), &KeyInput::new(Key::Backspace));
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(session.document.len(), 1);
        assert_eq!(session.document.blocks()[0].content, "");
        assert_eq!(session.document.revision(), 0);
    }

    #[test]
    fn backspace_with_content_is_plain_editing() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "1"), ("b", "x")]);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("b"), &KeyInput::new(Key::Backspace));
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(session.document.len(), 2);
    }

    #[test]
    fn command_space_opens_menu_without_touching_document() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "hello world")]);
        let input = KeyInput::new(Key::Space)
            .with_modifiers(Modifiers::meta())
            .with_selection("world");
        let outcome = handle_key(&mut session, &ids, &BlockId::new("a"), &input);
        let KeyOutcome::OpenMenu(menu) = outcome else {
            panic!("expected menu, got {outcome:?}");
        };
        assert_eq!(menu.anchor, Some(BlockId::new("a")));
        assert_eq!(menu.selection, "world");
        assert!(session.menu_open());
        assert_eq!(session.document.revision(), 0);
    }

    #[test]
    fn escape_closes_open_menu() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "")]);
        let open = KeyInput::new(Key::Space).with_modifiers(Modifiers::ctrl());
        handle_key(&mut session, &ids, &BlockId::new("a"), &open);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("a"), &KeyInput::new(Key::Escape));
        assert_eq!(outcome, KeyOutcome::Handled);
        assert!(!session.menu_open());
    }

    #[test]
    fn stale_block_keys_are_noops() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "")]);
        let outcome = handle_key(&mut session, &ids, &BlockId::new("ghost"), &KeyInput::new(Key::Enter));
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(session.document.len(), 1);
        assert!(!input_text(&mut session, &BlockId::new("ghost"), "x"));
    }

    #[test]
    fn deleting_hovered_block_clears_hover() {
        let ids = SequentialIds::new("n");
        let mut session = session(vec![("a", "1"), ("b", "")]);
        hover(&mut session, &BlockId::new("b"));
        handle_key(&mut session, &ids, &BlockId::new("b"), &KeyInput::new(Key::Backspace));
        assert_eq!(session.hovered, None);
    }
}
