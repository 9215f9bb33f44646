use crate::blocks::{Block, BlockId, BlockType};
use crate::ids::IdAllocator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered sequence of blocks for one page.
///
/// Vector order is the reading order. Every successful mutation bumps
/// `revision`; the persistence layer watches it. Misses on stale ids leave
/// the document (and its revision) untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    title: String,
    blocks: Vec<Block>,
    revision: u64,
    updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        id: DocumentId,
        title: impl Into<String>,
        blocks: Vec<Block>,
        ids: &dyn IdAllocator,
    ) -> Self {
        let mut seen = HashSet::new();
        let blocks = blocks
            .into_iter()
            .filter(|block| {
                let fresh = seen.insert(block.id().clone());
                if !fresh {
                    tracing::warn!(block_id = %block.id(), "dropping seed block with duplicate id");
                }
                fresh
            })
            .collect();
        let mut document = Self {
            id,
            title: title.into(),
            blocks,
            revision: 0,
            updated_at: Utc::now(),
        };
        document.ensure_non_empty(ids);
        document
    }

    pub fn with_defaults(id: DocumentId, ids: &dyn IdAllocator) -> Self {
        let blocks = vec![
            Block::new(ids.next_id(), BlockType::Heading1, "Meeting Notes"),
            Block::new(
                ids.next_id(),
                BlockType::Paragraph,
                "Use \"Ask AI\" to generate content or select text to summarize.",
            ),
            Block::paragraph(ids.next_id()),
        ];
        Self::new(id, "Untitled", blocks, ids)
    }

    fn ensure_non_empty(&mut self, ids: &dyn IdAllocator) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::paragraph(ids.next_id()));
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|block| block.id().clone()).collect()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id() == id)
    }

    pub fn find_index(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id() == id)
    }

    pub fn find_prev(&self, id: &BlockId) -> Option<&Block> {
        let ix = self.find_index(id)?;
        ix.checked_sub(1).map(|prev| &self.blocks[prev])
    }

    pub fn last_id(&self) -> Option<&BlockId> {
        self.blocks.last().map(Block::id)
    }

    /// Newline-joined block contents in reading order.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if self.title == title {
            return;
        }
        self.title = title;
        self.touch();
    }

    /// Inserts `block` right after `after`. A missing anchor, whether `None`
    /// or an id no longer in the document, puts the block at the front.
    pub fn insert_after(&mut self, after: Option<&BlockId>, block: Block) {
        if self.find_index(block.id()).is_some() {
            tracing::warn!(block_id = %block.id(), "refusing to insert duplicate block id");
            return;
        }
        let insert_ix = match after.and_then(|anchor| self.find_index(anchor)) {
            Some(ix) => ix + 1,
            None => {
                if let Some(anchor) = after {
                    tracing::debug!(anchor = %anchor, "stale anchor, inserting at front");
                }
                0
            }
        };
        self.blocks.insert(insert_ix, block);
        self.touch();
    }

    pub fn append_block(&mut self, block: Block) {
        let last = self.last_id().cloned();
        self.insert_after(last.as_ref(), block);
    }

    /// Removes the block unless it is the last one left.
    pub fn delete_block(&mut self, id: &BlockId) -> bool {
        if self.blocks.len() <= 1 {
            return false;
        }
        let Some(ix) = self.find_index(id) else {
            return false;
        };
        self.blocks.remove(ix);
        self.touch();
        true
    }

    pub fn update_content(&mut self, id: &BlockId, text: impl Into<String>) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|block| block.id() == id) else {
            return false;
        };
        let text = text.into();
        if block.content == text {
            return false;
        }
        block.content = text;
        self.touch();
        true
    }

    pub fn set_block_type(&mut self, id: &BlockId, block_type: BlockType) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|block| block.id() == id) else {
            return false;
        };
        if block.block_type == block_type {
            return false;
        }
        block.block_type = block_type;
        if block_type != BlockType::Todo {
            block.checked = false;
        }
        self.touch();
        true
    }

    pub fn toggle_checked(&mut self, id: &BlockId) -> bool {
        let Some(block) = self
            .blocks
            .iter_mut()
            .find(|block| block.id() == id && block.block_type == BlockType::Todo)
        else {
            return false;
        };
        block.checked = !block.checked;
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentId};
    use crate::blocks::{Block, BlockId, BlockType};
    use crate::ids::{IdAllocator, SequentialIds};

    fn block(id: &str, text: &str) -> Block {
        Block::new(BlockId::new(id), BlockType::Paragraph, text)
    }

    fn doc(blocks: Vec<Block>) -> Document {
        Document::new(DocumentId::new("doc"), "Doc", blocks, &SequentialIds::default())
    }

    fn ids(document: &Document) -> Vec<String> {
        document
            .blocks()
            .iter()
            .map(|block| block.id().to_string())
            .collect()
    }

    #[test]
    fn empty_seed_gets_one_paragraph() {
        let document = doc(Vec::new());
        assert_eq!(document.len(), 1);
        assert_eq!(document.blocks()[0].block_type, BlockType::Paragraph);
        assert!(document.blocks()[0].is_empty());
    }

    #[test]
    fn duplicate_seed_ids_keep_first_occurrence() {
        let document = doc(vec![block("a", "one"), block("b", "two"), block("a", "again")]);
        assert_eq!(ids(&document), vec!["a", "b"]);
        assert_eq!(document.blocks()[0].content, "one");
        assert_eq!(document.revision(), 0);
    }

    #[test]
    fn defaults_seed_heading_and_paragraphs() {
        let document =
            Document::with_defaults(DocumentId::new("d"), &SequentialIds::default());
        assert_eq!(document.len(), 3);
        assert_eq!(document.blocks()[0].block_type, BlockType::Heading1);
        assert_eq!(document.blocks()[0].content, "Meeting Notes");
        assert!(document.blocks()[2].is_empty());
    }

    #[test]
    fn insert_after_places_block_behind_anchor() {
        let mut document = doc(vec![block("a", "one"), block("b", "two")]);
        document.insert_after(Some(&BlockId::new("a")), block("c", ""));
        assert_eq!(ids(&document), vec!["a", "c", "b"]);
        assert_eq!(document.revision(), 1);
    }

    #[test]
    fn insert_without_anchor_goes_first() {
        let mut document = doc(vec![block("a", "one")]);
        document.insert_after(None, block("z", ""));
        assert_eq!(ids(&document), vec!["z", "a"]);
    }

    #[test]
    fn insert_after_stale_anchor_goes_first() {
        let mut document = doc(vec![block("a", "one"), block("b", "two")]);
        document.insert_after(Some(&BlockId::new("gone")), block("c", ""));
        assert_eq!(ids(&document), vec!["c", "a", "b"]);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut document = doc(vec![block("a", "one")]);
        document.insert_after(Some(&BlockId::new("a")), block("a", "dup"));
        assert_eq!(document.len(), 1);
        assert_eq!(document.revision(), 0);
    }

    #[test]
    fn delete_refuses_last_block() {
        let mut document = doc(vec![block("a", "")]);
        assert!(!document.delete_block(&BlockId::new("a")));
        assert_eq!(document.len(), 1);
        assert_eq!(document.revision(), 0);
    }

    #[test]
    fn delete_removes_only_target() {
        let mut document = doc(vec![block("a", "1"), block("b", ""), block("c", "3")]);
        assert!(document.delete_block(&BlockId::new("b")));
        assert_eq!(ids(&document), vec!["a", "c"]);
    }

    #[test]
    fn delete_missing_id_is_noop() {
        let mut document = doc(vec![block("a", "1"), block("b", "2")]);
        assert!(!document.delete_block(&BlockId::new("x")));
        assert_eq!(document.len(), 2);
    }

    #[test]
    fn never_empties_under_mixed_operations() {
        let allocator = SequentialIds::new("n");
        let mut document = doc(vec![block("a", "")]);
        for round in 0..20 {
            let current = document.block_ids();
            if round % 3 == 0 {
                let anchor = current.last().cloned();
                document.insert_after(anchor.as_ref(), Block::paragraph(allocator.next_id()));
            }
            for id in current {
                document.delete_block(&id);
            }
            assert!(!document.is_empty());
        }
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn update_content_keeps_id_and_skips_missing() {
        let mut document = doc(vec![block("a", "one")]);
        assert!(document.update_content(&BlockId::new("a"), "uno"));
        assert_eq!(document.blocks()[0].id().as_str(), "a");
        assert_eq!(document.blocks()[0].content, "uno");
        assert!(!document.update_content(&BlockId::new("zz"), "nope"));
        assert_eq!(document.revision(), 1);
    }

    #[test]
    fn find_prev_returns_preceding_block() {
        let document = doc(vec![block("a", "1"), block("b", "2")]);
        assert_eq!(
            document.find_prev(&BlockId::new("b")).map(|b| b.id().as_str()),
            Some("a")
        );
        assert!(document.find_prev(&BlockId::new("a")).is_none());
        assert!(document.find_prev(&BlockId::new("q")).is_none());
    }

    #[test]
    fn plain_text_joins_with_newlines() {
        let document = doc(vec![block("a", "Title"), block("b", ""), block("c", "end")]);
        assert_eq!(document.plain_text(), "Title\n\nend");
    }

    #[test]
    fn todo_checked_only_toggles_todo_blocks() {
        let mut document = doc(vec![block("a", "task")]);
        let id = BlockId::new("a");
        assert!(!document.toggle_checked(&id));
        assert!(document.set_block_type(&id, BlockType::Todo));
        assert!(document.toggle_checked(&id));
        assert!(document.blocks()[0].checked);
        assert!(document.set_block_type(&id, BlockType::Bullet));
        assert!(!document.blocks()[0].checked);
    }

    #[test]
    fn set_title_bumps_revision_once() {
        let mut document = doc(vec![block("a", "")]);
        document.set_title("Plans");
        document.set_title("Plans");
        assert_eq!(document.title(), "Plans");
        assert_eq!(document.revision(), 1);
    }
}
