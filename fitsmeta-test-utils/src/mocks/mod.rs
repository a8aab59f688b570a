//! Mock implementations for testing

mod cursor;
mod store;

pub use cursor::{Journal, RecordingCursor, RecordingFactory};
pub use store::FailingObjectStore;
