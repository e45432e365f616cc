/*!
 * Core Types
 * Common types used across the monitor
 */

/// Process ID type
pub type Pid = u32;

/// Virtual address inside the monitored process
pub type Address = u64;

/// Size type for address-space extents
pub type Size = u64;

/// Raw attribute word reported by a region source (state, protect or type)
pub type Attribute = u32;
