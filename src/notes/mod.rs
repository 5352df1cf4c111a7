//! Notes module
//!
//! The note resource behind `/api/notes`: data model, validation and storage
//! (memory or a flat JSON file).

mod model;
mod store;

pub use model::{Note, NoteInput};
pub use store::{NoteStore, StoreError};
