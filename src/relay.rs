//! Swap chain handle relay
//!
//! A [`HandleRelay`] owns one duplication "leg": a handle valid in the
//! background process and its duplicate valid in a target (foreground)
//! process. It caches the process handle used for duplication and only
//! re-opens the target when its process id changes.
//!
//! The remote leg can only be closed by the process that owns its handle
//! table, so it is released through the platform's close-in-owner primitive
//! rather than a local close.

use crate::platform::HandlePlatform;
use crate::types::{ProcessHandle, RawHandle};

use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Owner of a local surface handle and its cross-process duplicate
pub struct HandleRelay {
    platform: Arc<dyn HandlePlatform>,
    local: Option<RawHandle>,
    remote: Option<RawHandle>,
    target_pid: u32,
    target_process: Option<ProcessHandle>,
}

impl HandleRelay {
    pub fn new(platform: Arc<dyn HandlePlatform>) -> Self {
        Self {
            platform,
            local: None,
            remote: None,
            target_pid: 0,
            target_process: None,
        }
    }

    /// Take ownership of `local` and duplicate it into `target_pid`.
    ///
    /// Failures never propagate: a missing target process or a handle that
    /// is already gone (two surface changes in quick succession) leaves the
    /// relay holding `local` with no remote leg, i.e. invalid.
    ///
    /// Assigning the handle the relay already holds is a no-op.
    /// Returns [`HandleRelay::is_valid`].
    pub fn assign_handle(&mut self, local: RawHandle, target_pid: u32) -> bool {
        if self.local == Some(local) {
            return self.is_valid();
        }

        let reopen = target_pid != self.target_pid || self.target_process.is_none();
        let process = if reopen {
            match self.platform.open_process(target_pid) {
                Ok(process) => Some(process),
                Err(e) => {
                    warn!("Cannot open foreground process {}: {}", target_pid, e);
                    None
                }
            }
        } else {
            self.target_process
        };

        let remote = process.and_then(|p| match self.platform.duplicate_into(local, &p) {
            Ok(remote) => Some(remote),
            Err(e) => {
                warn!("Swap chain handle {} not relayed to pid {}: {}", local, target_pid, e);
                None
            }
        });

        self.close();
        if reopen {
            self.release_process();
            self.target_process = process;
            self.target_pid = target_pid;
        }
        self.local = Some(local);
        self.remote = remote;

        if let Some(remote) = remote {
            debug!("Relayed {} -> {} (pid {})", local, remote, target_pid);
        }
        self.is_valid()
    }

    /// Close both legs. The cached process handle is kept for reuse.
    pub fn close(&mut self) {
        if let Some(local) = self.local.take() {
            if let Err(e) = self.platform.close_local(local) {
                debug!("Ignoring local close failure: {}", e);
            }
        }
        if let Some(remote) = self.remote.take() {
            let result = match &self.target_process {
                Some(owner) => self.platform.close_in_owner(remote, owner),
                None => Ok(()),
            };
            if let Err(e) = result {
                debug!("Ignoring remote close failure: {}", e);
            }
        }
    }

    /// Move both legs and the cached process identity into `dest`,
    /// closing whatever `dest` held. Leaves `self` empty.
    pub fn detach_move(&mut self, dest: &mut HandleRelay) {
        dest.close();
        dest.release_process();
        dest.local = self.local.take();
        dest.remote = self.remote.take();
        dest.target_pid = std::mem::take(&mut self.target_pid);
        dest.target_process = self.target_process.take();
    }

    /// Give up ownership of the local handle to the caller.
    /// The remote leg and process cache are left as they are.
    pub fn detach_local_handle(&mut self) -> Option<RawHandle> {
        self.local.take()
    }

    pub fn local_handle(&self) -> Option<RawHandle> {
        self.local
    }

    pub fn remote_handle(&self) -> Option<RawHandle> {
        self.remote
    }

    pub fn target_pid(&self) -> u32 {
        self.target_pid
    }

    /// Both legs present
    pub fn is_valid(&self) -> bool {
        self.local.is_some() && self.remote.is_some()
    }

    /// Either leg present
    pub fn is_empty(&self) -> bool {
        self.local.is_none() && self.remote.is_none()
    }

    fn release_process(&mut self) {
        if let Some(process) = self.target_process.take() {
            trace!("Releasing process handle for pid {}", process.pid);
            if let Err(e) = self.platform.close_process(process) {
                debug!("Ignoring process handle close failure: {}", e);
            }
        }
    }
}

impl Drop for HandleRelay {
    fn drop(&mut self) {
        self.close();
        self.release_process();
    }
}

impl std::fmt::Debug for HandleRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRelay")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("target_pid", &self.target_pid)
            .finish()
    }
}
