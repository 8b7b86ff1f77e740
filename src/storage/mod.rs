//! Record storage: reading input record sets and writing joined outputs.

pub mod backends;
pub mod traits;

pub use backends::{JsonlStore, MemoryStore};
pub use traits::RecordStore;
