/*!
 * Memory Types
 * Page records, attribute vocabulary and errors for address-space snapshots
 */

use crate::core::limits::{PAGE_OFFSET_MASK, PAGE_SIZE};
use crate::core::types::{Address, Attribute, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Region tracking result
pub type RegionResult<T> = Result<T, RegionError>;

/// Region source result
pub type SourceResult<T> = Result<T, SourceError>;

/// Region tracking errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RegionError {
    #[error("Allocation failure tracking page 0x{page:x}")]
    #[diagnostic(
        code(region::allocation_failure),
        help("The snapshot is incomplete. Discard it and retry on the next cycle.")
    )]
    AllocationFailure { page: Address },
}

/// Errors raised while enumerating a process address space
#[derive(Error, Debug, Diagnostic)]
pub enum SourceError {
    #[error("Failed to read memory map {path}: {source}")]
    #[diagnostic(
        code(source::io),
        help("Check that the process exists and that the monitor may read its memory map.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed memory map line {line}: {reason}")]
    #[diagnostic(code(source::parse))]
    Parse { line: usize, reason: String },

    #[error("Process {0} is not running")]
    #[diagnostic(
        code(source::process_gone),
        help("The monitored process exited or the pid was never valid.")
    )]
    ProcessGone(Pid),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Region(#[from] RegionError),
}

/// Region state values
pub mod state {
    use crate::core::types::Attribute;

    pub const COMMIT: Attribute = 0x1000;
    pub const RESERVE: Attribute = 0x2000;
    pub const FREE: Attribute = 0x10000;

    pub fn name(value: Attribute) -> Option<&'static str> {
        match value {
            COMMIT => Some("COMMIT"),
            RESERVE => Some("RESERVE"),
            FREE => Some("FREE"),
            _ => None,
        }
    }
}

/// Page protection values
pub mod protect {
    use crate::core::types::Attribute;

    pub const NOACCESS: Attribute = 0x01;
    pub const READONLY: Attribute = 0x02;
    pub const READWRITE: Attribute = 0x04;
    pub const WRITECOPY: Attribute = 0x08;
    pub const EXECUTE: Attribute = 0x10;
    pub const EXECUTE_READ: Attribute = 0x20;
    pub const EXECUTE_READWRITE: Attribute = 0x40;
    pub const EXECUTE_WRITECOPY: Attribute = 0x80;

    pub fn name(value: Attribute) -> Option<&'static str> {
        match value {
            NOACCESS => Some("NOACCESS"),
            READONLY => Some("READONLY"),
            READWRITE => Some("READWRITE"),
            WRITECOPY => Some("WRITECOPY"),
            EXECUTE => Some("EXECUTE"),
            EXECUTE_READ => Some("EXECUTE_READ"),
            EXECUTE_READWRITE => Some("EXECUTE_READWRITE"),
            EXECUTE_WRITECOPY => Some("EXECUTE_WRITECOPY"),
            _ => None,
        }
    }

    pub fn is_executable(value: Attribute) -> bool {
        value & (EXECUTE | EXECUTE_READ | EXECUTE_READWRITE | EXECUTE_WRITECOPY) != 0
    }

    pub fn is_writable(value: Attribute) -> bool {
        value & (READWRITE | WRITECOPY | EXECUTE_READWRITE | EXECUTE_WRITECOPY) != 0
    }
}

/// Region backing type values
pub mod kind {
    use crate::core::types::Attribute;

    pub const PRIVATE: Attribute = 0x20000;
    pub const MAPPED: Attribute = 0x40000;
    pub const IMAGE: Attribute = 0x100_0000;

    pub fn name(value: Attribute) -> Option<&'static str> {
        match value {
            PRIVATE => Some("PRIVATE"),
            MAPPED => Some("MAPPED"),
            IMAGE => Some("IMAGE"),
            _ => None,
        }
    }
}

/// Round `addr` down to the start of its page
#[inline]
pub const fn page_align_down(addr: Address) -> Address {
    addr & !PAGE_OFFSET_MASK
}

/// One tracked page of a process address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub page_start: Address,
    pub page_end: Address,
    pub state: Attribute,
    pub protect: Attribute,
    pub kind: Attribute,
}

impl MemoryRegion {
    /// Record for the page containing `addr`
    pub fn containing(addr: Address, state: Attribute, protect: Attribute, kind: Attribute) -> Self {
        let page_start = page_align_down(addr);
        Self {
            page_start,
            page_end: page_start + (PAGE_SIZE - 1),
            state,
            protect,
            kind,
        }
    }

    /// Key-only probe for lookups; attributes are ignored by the ordering
    pub fn probe(addr: Address) -> Self {
        Self::containing(addr, 0, 0, 0)
    }

    /// Ordering used by trackers: page start address only
    pub fn cmp_start(a: &Self, b: &Self) -> Ordering {
        a.page_start.cmp(&b.page_start)
    }

    pub fn contains(&self, addr: Address) -> bool {
        (self.page_start..=self.page_end).contains(&addr)
    }

    pub fn is_executable(&self) -> bool {
        protect::is_executable(self.protect)
    }

    pub fn is_writable(&self) -> bool {
        protect::is_writable(self.protect)
    }
}

fn write_attr(
    f: &mut fmt::Formatter<'_>,
    value: Attribute,
    name: fn(Attribute) -> Option<&'static str>,
) -> fmt::Result {
    match name(value) {
        Some(name) => f.write_str(name),
        None => write!(f, "0x{:x}", value),
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}-0x{:x} ", self.page_start, self.page_end)?;
        write_attr(f, self.state, state::name)?;
        f.write_str(",")?;
        write_attr(f, self.kind, kind::name)?;
        f.write_str(",")?;
        write_attr(f, self.protect, protect::name)
    }
}
