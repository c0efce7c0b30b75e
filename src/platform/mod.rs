//! Cross-process handle primitives
//!
//! Everything that touches raw OS handle tables lives behind [`HandlePlatform`]:
//! - Win32 `OpenProcess` / `DuplicateHandle` / `CloseHandle` on Windows
//! - [`crate::sim::SimulatedPlatform`] for tests and the CLI simulator

#[cfg(windows)]
mod win32;

#[cfg(windows)]
pub use self::win32::Win32Platform;

use crate::error::Result;
use crate::types::{ProcessHandle, RawHandle};
use std::sync::Arc;

/// Handle duplication across process boundaries.
///
/// Implementations must be callable from any thread. Callers never hold
/// renderer geometry locks across these calls since they may block.
pub trait HandlePlatform: Send + Sync {
    /// Id of the calling (background) process
    fn current_process_id(&self) -> u32;

    /// Open `pid` with rights to duplicate handles into it
    fn open_process(&self, pid: u32) -> Result<ProcessHandle>;

    /// Duplicate a handle owned by the current process into `target`.
    /// The returned value is only valid inside the target process.
    fn duplicate_into(&self, local: RawHandle, target: &ProcessHandle) -> Result<RawHandle>;

    /// Close a handle owned by the current process
    fn close_local(&self, handle: RawHandle) -> Result<()>;

    /// Close a handle living in `owner`'s handle table
    fn close_in_owner(&self, remote: RawHandle, owner: &ProcessHandle) -> Result<()>;

    /// Release a process handle obtained from [`HandlePlatform::open_process`]
    fn close_process(&self, process: ProcessHandle) -> Result<()>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

/// The handle platform for the host OS, if there is one
pub fn native() -> Option<Arc<dyn HandlePlatform>> {
    #[cfg(windows)]
    {
        Some(Arc::new(Win32Platform::new()))
    }
    #[cfg(not(windows))]
    {
        None
    }
}
