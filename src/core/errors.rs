/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export layer errors so callers can match on them from one place
pub use crate::core::data_structures::InsertError;
pub use crate::memory::{RegionError, SourceError};
pub use crate::monitoring::MonitorError;

/// Ordered map failure kinds, independent of the payload type
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum MapError {
    #[error("An entry comparing equal is already stored")]
    #[diagnostic(
        code(map::duplicate_key),
        help("The existing payload was kept. Look it up instead of inserting again.")
    )]
    DuplicateKey,

    #[error("Node storage could not be grown")]
    #[diagnostic(
        code(map::allocation_failure),
        help("System may be low on memory. Abort the current snapshot and retry later.")
    )]
    AllocationFailure,
}
