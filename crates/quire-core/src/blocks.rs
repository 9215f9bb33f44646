use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Bullet,
    Quote,
    Todo,
}

impl BlockType {
    pub fn is_paragraph(&self) -> bool {
        matches!(self, BlockType::Paragraph)
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            BlockType::Heading1 | BlockType::Heading2 | BlockType::Heading3
        )
    }
}

/// A single addressable unit of document content.
///
/// The id is fixed at construction; only the type, content and checked flag
/// can change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub checked: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Block {
    pub fn new(id: BlockId, block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            id,
            block_type,
            content: content.into(),
            checked: false,
        }
    }

    pub fn paragraph(id: BlockId) -> Self {
        Self::new(id, BlockType::Paragraph, String::new())
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
