/*!
 * Core Module
 * Fundamental types, limits, data structures and error handling
 */

pub mod data_structures;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use data_structures::{InsertError, OrderedMap};
pub use errors::MapError;
pub use types::*;
