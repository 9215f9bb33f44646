//! Block-based document editing core: an ordered block model, keyboard
//! driven structural edits, and streaming content generation into
//! placeholder blocks.

pub mod blocks;
pub mod config;
pub mod document;
pub mod editor;
pub mod generation;
pub mod ids;
pub mod interaction;
pub mod persist;
pub mod session;

pub use blocks::{Block, BlockId, BlockType};
pub use config::{ConfigError, ConfigStore, EditorConfig};
pub use document::{Document, DocumentId};
pub use editor::Editor;
pub use generation::{
    GenerationAction, GenerationClient, GenerationError, GenerationOutcome, GenerationRequest,
    Insights,
};
pub use ids::{IdAllocator, SequentialIds, UuidIds};
pub use interaction::{Key, KeyInput, KeyOutcome, Modifiers};
pub use persist::{DocumentSink, MemorySink, PersistScheduler};
pub use session::{EditorSession, GenerationMenu, SharedSession};
