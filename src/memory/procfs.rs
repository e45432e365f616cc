/*!
 * Procfs Region Source
 * Enumerate a Linux process address space from /proc/<pid>/maps
 *
 * Line format:
 * address           perms offset  dev   inode   pathname
 * 00400000-00452000 r-xp 00000000 08:02 173521  /usr/bin/ls
 *
 * Attribute mapping:
 * - `---` mappings are reserved but inaccessible, everything else committed
 * - writable private file mappings are copy-on-write
 * - shared mappings are MAPPED, private file mappings IMAGE, the rest PRIVATE
 */

use super::source::{RawRegion, RegionSource};
use super::types::{kind, protect, state, SourceError, SourceResult};
use crate::core::types::{Address, Attribute, Pid};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;
use std::fs;
use std::path::{Path, PathBuf};

/// Region source backed by a maps file
#[derive(Debug, Clone)]
pub struct ProcMapsSource {
    path: PathBuf,
    pid: Option<Pid>,
}

impl ProcMapsSource {
    /// Source for a live process
    pub fn for_pid(pid: Pid) -> Self {
        Self {
            path: PathBuf::from(format!("/proc/{}/maps", pid)),
            pid: Some(pid),
        }
    }

    /// Source reading any file in maps format (captured dumps, fixtures)
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pid: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }
}

impl RegionSource for ProcMapsSource {
    fn regions(&mut self) -> SourceResult<Vec<RawRegion>> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            match self.pid {
                Some(pid) if source.kind() == std::io::ErrorKind::NotFound => {
                    SourceError::ProcessGone(pid)
                }
                _ => SourceError::Io {
                    path: self.path.clone(),
                    source,
                },
            }
        })?;

        // A zombie keeps its /proc entry but has no address space left
        if let Some(pid) = self.pid {
            if content.trim().is_empty() {
                return Err(SourceError::ProcessGone(pid));
            }
        }
        parse_maps_content(&content)
    }

    fn is_alive(&self) -> bool {
        self.pid.map_or(true, process_alive)
    }
}

/// Check whether `pid` exists and is still running, without signalling it.
/// Exited processes that have not been reaped yet count as dead.
pub fn process_alive(pid: Pid) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    let exists = match kill(NixPid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists, but belongs to someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    };
    if !exists {
        return false;
    }

    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !matches!(stat_state(&stat), Some('Z') | Some('X')),
        Err(_) => true,
    }
}

/// Scheduler state from a `/proc/<pid>/stat` line.
/// The command name may itself contain `)`, so split at the last one.
fn stat_state(stat: &str) -> Option<char> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

/// Parse the full content of a maps file, skipping blank lines
pub fn parse_maps_content(content: &str) -> SourceResult<Vec<RawRegion>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_maps_line(line, idx + 1))
        .collect()
}

fn parse_error(line: usize, reason: impl Into<String>) -> SourceError {
    SourceError::Parse {
        line,
        reason: reason.into(),
    }
}

fn parse_maps_line(line: &str, line_no: usize) -> SourceResult<RawRegion> {
    let mut fields = line.split_whitespace();
    let range = fields
        .next()
        .ok_or_else(|| parse_error(line_no, "missing address range"))?;
    let perms = fields
        .next()
        .ok_or_else(|| parse_error(line_no, "missing permissions"))?;
    // offset, device, inode
    for name in ["offset", "device", "inode"] {
        fields
            .next()
            .ok_or_else(|| parse_error(line_no, format!("missing {}", name)))?;
    }
    let pathname: Vec<&str> = fields.collect();
    let pathname = pathname.join(" ");

    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| parse_error(line_no, format!("bad address range '{}'", range)))?;
    let start = parse_hex(start, line_no)?;
    let end = parse_hex(end, line_no)?;
    if end <= start {
        return Err(parse_error(
            line_no,
            format!("empty or inverted range 0x{:x}-0x{:x}", start, end),
        ));
    }

    let perms = perms.as_bytes();
    if perms.len() != 4 {
        return Err(parse_error(line_no, "permissions must be four characters"));
    }
    let read = perms[0] == b'r';
    let write = perms[1] == b'w';
    let exec = perms[2] == b'x';
    let shared = perms[3] == b's';
    let file_backed = pathname.starts_with('/');

    let region_state = if read || write || exec {
        state::COMMIT
    } else {
        state::RESERVE
    };
    let region_kind = if shared {
        kind::MAPPED
    } else if file_backed {
        kind::IMAGE
    } else {
        kind::PRIVATE
    };
    let copy_on_write = write && !shared && file_backed;

    Ok(RawRegion::new(
        start,
        end - start,
        region_state,
        protection(read, write, exec, copy_on_write),
        region_kind,
    ))
}

fn parse_hex(value: &str, line_no: usize) -> SourceResult<Address> {
    Address::from_str_radix(value, 16)
        .map_err(|e| parse_error(line_no, format!("bad address '{}': {}", value, e)))
}

fn protection(read: bool, write: bool, exec: bool, copy_on_write: bool) -> Attribute {
    match (read || write, write, exec) {
        (_, true, true) if copy_on_write => protect::EXECUTE_WRITECOPY,
        (_, true, true) => protect::EXECUTE_READWRITE,
        (true, false, true) => protect::EXECUTE_READ,
        (false, false, true) => protect::EXECUTE,
        (_, true, false) if copy_on_write => protect::WRITECOPY,
        (_, true, false) => protect::READWRITE,
        (true, false, false) => protect::READONLY,
        (false, false, false) => protect::NOACCESS,
    }
}
