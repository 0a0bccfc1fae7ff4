//! # Stencil Editor
//!
//! Template store and mutation engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: add / move / delete / update / undo   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ TemplateStore                               │
//! │  - Validate (capability sets, cycles, ids)  │
//! │  - Apply to a draft, swap Arc snapshot      │
//! │  - Record (mutation, inverse) in UndoStack  │
//! │  - Notify subscribers                       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ subscribers: preview renderer, host UI      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use stencil_editor::TemplateStore;
//! use stencil_model::{BlockKind, Template};
//!
//! let mut store = TemplateStore::new(Template::new("invoice", "Invoice"));
//!
//! let section = store.add_block(BlockKind::Container, None, None).unwrap();
//! let section_id = section.id().unwrap().to_string();
//! let text = store.add_block(BlockKind::Text, None, None).unwrap();
//!
//! assert!(store.move_block(text.id().unwrap(), Some(&section_id), 0));
//! assert!(store.undo());
//! assert_eq!(store.template().blocks.len(), 2);
//! ```

mod capability;
mod errors;
mod mutations;
mod store;
mod undo_stack;

pub use capability::{accepts, rejected_children};
pub use errors::{EditorError, EditorResult};
pub use mutations::{Mutation, MutationError};
pub use store::{ChangeCause, Listener, StoreEvent, SubscriptionId, TemplateStore};
pub use undo_stack::{MutationBatch, UndoStack, DEFAULT_HISTORY_LIMIT};
