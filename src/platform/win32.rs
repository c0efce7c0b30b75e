//! Win32 handle duplication

use super::HandlePlatform;
use crate::error::{Error, Result};
use crate::types::{ProcessHandle, RawHandle};

use windows::Win32::Foundation::{
    CloseHandle, DuplicateHandle, BOOL, DUPLICATE_CLOSE_SOURCE, DUPLICATE_SAME_ACCESS, HANDLE,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetCurrentProcessId, OpenProcess, PROCESS_DUP_HANDLE,
};

fn to_win(handle: RawHandle) -> HANDLE {
    HANDLE(handle.as_raw() as usize as *mut core::ffi::c_void)
}

fn from_win(handle: HANDLE) -> RawHandle {
    RawHandle::from_raw(handle.0 as usize as u64)
}

/// `OpenProcess` + `DuplicateHandle` backed platform
#[derive(Debug, Default)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

impl HandlePlatform for Win32Platform {
    fn current_process_id(&self) -> u32 {
        unsafe { GetCurrentProcessId() }
    }

    fn open_process(&self, pid: u32) -> Result<ProcessHandle> {
        let handle = unsafe { OpenProcess(PROCESS_DUP_HANDLE, BOOL::from(true), pid) }.map_err(
            |e| Error::ProcessOpen {
                pid,
                reason: e.to_string(),
            },
        )?;
        if handle.is_invalid() {
            return Err(Error::ProcessOpen {
                pid,
                reason: "OpenProcess returned an invalid handle".into(),
            });
        }
        Ok(ProcessHandle {
            pid,
            raw: from_win(handle),
        })
    }

    fn duplicate_into(&self, local: RawHandle, target: &ProcessHandle) -> Result<RawHandle> {
        let mut remote = HANDLE::default();
        unsafe {
            DuplicateHandle(
                GetCurrentProcess(),
                to_win(local),
                to_win(target.raw),
                &mut remote,
                0,
                BOOL::from(true),
                DUPLICATE_SAME_ACCESS,
            )
        }
        .map_err(|e| Error::Duplicate(format!("{} into pid {}: {}", local, target.pid, e)))?;
        Ok(from_win(remote))
    }

    fn close_local(&self, handle: RawHandle) -> Result<()> {
        unsafe { CloseHandle(to_win(handle)) }
            .map_err(|e| Error::HandleClose(format!("{}: {}", handle, e)))
    }

    fn close_in_owner(&self, remote: RawHandle, owner: &ProcessHandle) -> Result<()> {
        // Closing authority lives in the owner's table: duplicate with
        // CLOSE_SOURCE and no target.
        unsafe {
            DuplicateHandle(
                to_win(owner.raw),
                to_win(remote),
                HANDLE::default(),
                std::ptr::null_mut(),
                0,
                BOOL::from(true),
                DUPLICATE_CLOSE_SOURCE,
            )
        }
        .map_err(|e| Error::HandleClose(format!("{} in pid {}: {}", remote, owner.pid, e)))
    }

    fn close_process(&self, process: ProcessHandle) -> Result<()> {
        self.close_local(process.raw)
    }

    fn name(&self) -> &'static str {
        "win32"
    }
}
