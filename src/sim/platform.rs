//! Simulated multi-process handle tables

use crate::error::{Error, Result};
use crate::platform::HandlePlatform;
use crate::types::{ProcessHandle, RawHandle};

use parking_lot::Mutex;
use std::collections::HashMap;

/// First handle value handed out; values step by 4 like NT handles
const FIRST_HANDLE_VALUE: u64 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// A kernel object (swap chain surface) shared by every handle to it
    Object(u64),
    /// A process handle with duplicate rights
    Process(u32),
}

#[derive(Debug, Default)]
struct HandleTable {
    alive: bool,
    handles: HashMap<u64, Entry>,
}

/// Operation counters for assertions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub processes_opened: u64,
    pub duplications: u64,
    pub failed_duplications: u64,
    pub local_closes: u64,
    pub remote_closes: u64,
    /// Close attempts on handles that were not open
    pub failed_closes: u64,
}

#[derive(Debug)]
struct SimState {
    next_value: u64,
    next_object: u64,
    tables: HashMap<u32, HandleTable>,
    forced_duplication_failures: u32,
    stats: SimStats,
}

impl SimState {
    fn mint(&mut self) -> u64 {
        let value = self.next_value;
        self.next_value += 4;
        value
    }
}

/// In-memory stand-in for the OS handle tables of several processes.
///
/// Handle values are unique across all processes so a remote handle can
/// never collide with one issued earlier.
#[derive(Debug)]
pub struct SimulatedPlatform {
    current_pid: u32,
    state: Mutex<SimState>,
}

impl SimulatedPlatform {
    /// Create a platform whose calling process is `current_pid`
    pub fn new(current_pid: u32) -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            current_pid,
            HandleTable {
                alive: true,
                handles: HashMap::new(),
            },
        );
        Self {
            current_pid,
            state: Mutex::new(SimState {
                next_value: FIRST_HANDLE_VALUE,
                next_object: 1,
                tables,
                forced_duplication_failures: 0,
                stats: SimStats::default(),
            }),
        }
    }

    /// Start a process that handles can be duplicated into
    pub fn spawn_process(&self, pid: u32) {
        let mut state = self.state.lock();
        let table = state.tables.entry(pid).or_default();
        table.alive = true;
    }

    /// Terminate a process; its handle table goes away with it
    pub fn exit_process(&self, pid: u32) {
        let mut state = self.state.lock();
        if let Some(table) = state.tables.get_mut(&pid) {
            table.alive = false;
            table.handles.clear();
        }
    }

    /// Create a new surface object owned by the current process
    pub fn create_surface(&self) -> RawHandle {
        let mut state = self.state.lock();
        let object = state.next_object;
        state.next_object += 1;
        let value = state.mint();
        let current = self.current_pid;
        state
            .tables
            .entry(current)
            .or_default()
            .handles
            .insert(value, Entry::Object(object));
        RawHandle::from_raw(value)
    }

    /// Make the next `count` duplications fail as if the source was already gone
    pub fn fail_next_duplications(&self, count: u32) {
        self.state.lock().forced_duplication_failures = count;
    }

    /// Is `handle` open in the handle table of `pid`?
    pub fn is_open(&self, pid: u32, handle: RawHandle) -> bool {
        self.state
            .lock()
            .tables
            .get(&pid)
            .is_some_and(|t| t.handles.contains_key(&handle.as_raw()))
    }

    /// Surface object a handle refers to, if it is open
    pub fn object_of(&self, pid: u32, handle: RawHandle) -> Option<u64> {
        let state = self.state.lock();
        match state.tables.get(&pid)?.handles.get(&handle.as_raw())? {
            Entry::Object(object) => Some(*object),
            Entry::Process(_) => None,
        }
    }

    /// Number of open handles (of any kind) in `pid`
    pub fn open_handle_count(&self, pid: u32) -> usize {
        self.state
            .lock()
            .tables
            .get(&pid)
            .map_or(0, |t| t.handles.len())
    }

    pub fn stats(&self) -> SimStats {
        self.state.lock().stats
    }
}

impl HandlePlatform for SimulatedPlatform {
    fn current_process_id(&self) -> u32 {
        self.current_pid
    }

    fn open_process(&self, pid: u32) -> Result<ProcessHandle> {
        let mut state = self.state.lock();
        let alive = state.tables.get(&pid).is_some_and(|t| t.alive);
        if !alive {
            return Err(Error::ProcessOpen {
                pid,
                reason: "no such process".into(),
            });
        }
        let value = state.mint();
        let current = self.current_pid;
        state
            .tables
            .entry(current)
            .or_default()
            .handles
            .insert(value, Entry::Process(pid));
        state.stats.processes_opened += 1;
        Ok(ProcessHandle {
            pid,
            raw: RawHandle::from_raw(value),
        })
    }

    fn duplicate_into(&self, local: RawHandle, target: &ProcessHandle) -> Result<RawHandle> {
        let mut state = self.state.lock();
        if state.forced_duplication_failures > 0 {
            state.forced_duplication_failures -= 1;
            state.stats.failed_duplications += 1;
            return Err(Error::Duplicate(format!("{} is no longer open", local)));
        }

        let current = self.current_pid;
        let own = state.tables.get(&current);
        let process_ok = own
            .and_then(|t| t.handles.get(&target.raw.as_raw()))
            .is_some_and(|e| *e == Entry::Process(target.pid));
        let object = own.and_then(|t| match t.handles.get(&local.as_raw()) {
            Some(Entry::Object(object)) => Some(*object),
            _ => None,
        });
        let target_alive = state.tables.get(&target.pid).is_some_and(|t| t.alive);

        let object = match (process_ok, object, target_alive) {
            (true, Some(object), true) => object,
            (false, _, _) => {
                state.stats.failed_duplications += 1;
                return Err(Error::Duplicate(format!(
                    "process handle {} for pid {} is not open",
                    target.raw, target.pid
                )));
            }
            (_, None, _) => {
                state.stats.failed_duplications += 1;
                return Err(Error::Duplicate(format!("{} is no longer open", local)));
            }
            (_, _, false) => {
                state.stats.failed_duplications += 1;
                return Err(Error::Duplicate(format!("pid {} has exited", target.pid)));
            }
        };

        let value = state.mint();
        state
            .tables
            .entry(target.pid)
            .or_default()
            .handles
            .insert(value, Entry::Object(object));
        state.stats.duplications += 1;
        Ok(RawHandle::from_raw(value))
    }

    fn close_local(&self, handle: RawHandle) -> Result<()> {
        let mut state = self.state.lock();
        let current = self.current_pid;
        let removed = state
            .tables
            .get_mut(&current)
            .and_then(|t| t.handles.remove(&handle.as_raw()));
        if removed.is_none() {
            state.stats.failed_closes += 1;
            return Err(Error::HandleClose(format!("{} is not open", handle)));
        }
        state.stats.local_closes += 1;
        Ok(())
    }

    fn close_in_owner(&self, remote: RawHandle, owner: &ProcessHandle) -> Result<()> {
        let mut state = self.state.lock();
        let current = self.current_pid;
        let process_ok = state
            .tables
            .get(&current)
            .and_then(|t| t.handles.get(&owner.raw.as_raw()))
            .is_some_and(|e| *e == Entry::Process(owner.pid));
        let removed = if process_ok {
            state
                .tables
                .get_mut(&owner.pid)
                .and_then(|t| t.handles.remove(&remote.as_raw()))
        } else {
            None
        };
        if removed.is_none() {
            state.stats.failed_closes += 1;
            return Err(Error::HandleClose(format!(
                "{} is not open in pid {}",
                remote, owner.pid
            )));
        }
        state.stats.remote_closes += 1;
        Ok(())
    }

    fn close_process(&self, process: ProcessHandle) -> Result<()> {
        self.close_local(process.raw)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: u32 = 100;
    const FOREGROUND: u32 = 200;

    #[test]
    fn test_duplicate_shares_object() {
        let platform = SimulatedPlatform::new(BACKGROUND);
        platform.spawn_process(FOREGROUND);

        let local = platform.create_surface();
        let process = platform.open_process(FOREGROUND).unwrap();
        let remote = platform.duplicate_into(local, &process).unwrap();

        assert_ne!(local, remote);
        assert_eq!(
            platform.object_of(BACKGROUND, local),
            platform.object_of(FOREGROUND, remote)
        );
    }

    #[test]
    fn test_open_unknown_process_fails() {
        let platform = SimulatedPlatform::new(BACKGROUND);
        let err = platform.open_process(999).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_duplicate_after_close_fails() {
        let platform = SimulatedPlatform::new(BACKGROUND);
        platform.spawn_process(FOREGROUND);
        let process = platform.open_process(FOREGROUND).unwrap();

        let local = platform.create_surface();
        platform.close_local(local).unwrap();
        assert!(platform.duplicate_into(local, &process).is_err());
        assert!(platform.close_local(local).is_err());
        assert_eq!(platform.stats().failed_closes, 1);
    }

    #[test]
    fn test_close_in_owner_removes_remote() {
        let platform = SimulatedPlatform::new(BACKGROUND);
        platform.spawn_process(FOREGROUND);
        let process = platform.open_process(FOREGROUND).unwrap();
        let local = platform.create_surface();
        let remote = platform.duplicate_into(local, &process).unwrap();

        platform.close_in_owner(remote, &process).unwrap();
        assert!(!platform.is_open(FOREGROUND, remote));
        assert!(platform.is_open(BACKGROUND, local));
    }

    #[test]
    fn test_exited_process_rejects_duplicates() {
        let platform = SimulatedPlatform::new(BACKGROUND);
        platform.spawn_process(FOREGROUND);
        let process = platform.open_process(FOREGROUND).unwrap();
        platform.exit_process(FOREGROUND);

        let local = platform.create_surface();
        assert!(platform.duplicate_into(local, &process).is_err());
        assert!(platform.open_process(FOREGROUND).is_err());
    }
}
