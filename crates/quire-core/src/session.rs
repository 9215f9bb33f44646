use crate::blocks::BlockId;
use crate::document::Document;
use crate::generation::GenerationAction;
use parking_lot::Mutex;
use std::sync::Arc;

pub type SharedSession = Arc<Mutex<EditorSession>>;

/// Per-document UI state that the controllers read and write.
#[derive(Clone, Debug)]
pub struct EditorSession {
    pub document: Document,
    pub focused: Option<BlockId>,
    pub hovered: Option<BlockId>,
    pub busy: bool,
    pub menu: Option<GenerationMenu>,
    pub generation_epoch: u64,
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            focused: None,
            hovered: None,
            busy: false,
            menu: None,
            generation_epoch: 0,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn is_focused(&self, id: &BlockId) -> bool {
        self.focused.as_ref() == Some(id)
    }

    pub fn menu_open(&self) -> bool {
        self.menu.is_some()
    }
}

/// The "ask AI" menu. `anchor` is the block the menu was opened from, or
/// `None` when opened from the floating button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationMenu {
    pub anchor: Option<BlockId>,
    pub selection: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuSuggestion {
    pub label: &'static str,
    pub action: GenerationAction,
    pub instruction: Option<&'static str>,
}

const SELECTION_SUGGESTIONS: &[MenuSuggestion] = &[
    MenuSuggestion {
        label: "Improve writing",
        action: GenerationAction::ImproveWriting,
        instruction: None,
    },
    MenuSuggestion {
        label: "Fix spelling & grammar",
        action: GenerationAction::FixSpelling,
        instruction: None,
    },
    MenuSuggestion {
        label: "Summarize",
        action: GenerationAction::Summarize,
        instruction: None,
    },
];

const DRAFT_SUGGESTIONS: &[MenuSuggestion] = &[
    MenuSuggestion {
        label: "Draft a blog post...",
        action: GenerationAction::GenerateFromPrompt,
        instruction: Some("Write a blog post outline about..."),
    },
    MenuSuggestion {
        label: "To-do list...",
        action: GenerationAction::GenerateFromPrompt,
        instruction: Some("Create a to-do list for..."),
    },
    MenuSuggestion {
        label: "Continue writing",
        action: GenerationAction::ContinueWriting,
        instruction: None,
    },
];

impl GenerationMenu {
    pub fn new(anchor: Option<BlockId>, selection: impl Into<String>) -> Self {
        Self {
            anchor,
            selection: selection.into(),
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn suggestions(&self) -> &'static [MenuSuggestion] {
        if self.has_selection() {
            SELECTION_SUGGESTIONS
        } else {
            DRAFT_SUGGESTIONS
        }
    }

    /// Free-form prompt submission. Blank prompts do nothing.
    pub fn submit_prompt(&self, prompt: &str) -> Option<(GenerationAction, String)> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some((GenerationAction::GenerateFromPrompt, prompt.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationMenu;
    use crate::generation::GenerationAction;

    #[test]
    fn suggestions_depend_on_selection() {
        let with_selection = GenerationMenu::new(None, "some words");
        let labels: Vec<_> = with_selection
            .suggestions()
            .iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(
            labels,
            vec!["Improve writing", "Fix spelling & grammar", "Summarize"]
        );

        let drafting = GenerationMenu::new(None, "");
        let actions: Vec<_> = drafting.suggestions().iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![
                GenerationAction::GenerateFromPrompt,
                GenerationAction::GenerateFromPrompt,
                GenerationAction::ContinueWriting,
            ]
        );
    }

    #[test]
    fn blank_prompt_is_not_submitted() {
        let menu = GenerationMenu::new(None, "");
        assert_eq!(menu.submit_prompt("   "), None);
        assert_eq!(
            menu.submit_prompt("write a haiku"),
            Some((GenerationAction::GenerateFromPrompt, "write a haiku".into()))
        );
    }
}
