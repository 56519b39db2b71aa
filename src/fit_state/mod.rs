//! The shared record of clinical inputs and outputs, its schema and its
//! on-disk document.

pub mod compact;
pub mod reader;
pub mod schema;
pub mod store;
pub mod types;
pub mod writer;

pub use reader::{load_or_default, read_state};
pub use store::FitStore;
pub use types::FitState;
pub use writer::write_state_atomic;
