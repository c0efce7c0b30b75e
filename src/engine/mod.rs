//! Video engine interface
//!
//! The decode/compose engine is an external collaborator. GhostRelay only
//! drives it through [`VideoEngine`] and receives its lifecycle callbacks
//! through [`EngineNotify`] on an engine-owned thread.

mod event;
mod notify;
mod source;

pub use event::{codes, EngineEvent};
pub use notify::{EngineEventSink, EngineNotify};
pub use source::{MediaSource, SchemeRegistry};

use crate::device::GpuDevice;
use crate::error::Result;
use crate::processing::StreamGeometry;
use crate::types::{FrameFormat, RawHandle, Resolution};

use std::sync::Arc;

/// Creation attributes handed to the engine factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineAttributes {
    /// Output surface format
    pub output_format: FrameFormat,
    /// Low-latency playback
    pub real_time: bool,
    /// Block engine calls until the engine reaches a stable state
    pub wait_for_stable_state: bool,
}

impl Default for EngineAttributes {
    fn default() -> Self {
        Self {
            output_format: FrameFormat::Nv12,
            real_time: true,
            wait_for_stable_state: true,
        }
    }
}

/// Playback engine rendering into a swap chain it owns.
///
/// Calls may block or re-enter the notify callback; never hold a renderer
/// lock across them.
pub trait VideoEngine: Send + Sync {
    /// Render into a swap chain whose handle can be queried, instead of a window
    fn enable_windowless_swapchain(&self) -> Result<()>;

    fn set_real_time_mode(&self, enabled: bool) -> Result<()>;

    fn enable_horizontal_mirror(&self, enabled: bool) -> Result<()>;

    /// Point the engine at a source URL (resolved through a [`SchemeRegistry`])
    fn set_source(&self, url: &str) -> Result<()>;

    /// Start loading the current source
    fn load(&self) -> Result<()>;

    /// Start playback; playing an already playing stream is a no-op
    fn play(&self) -> Result<()>;

    fn native_video_size(&self) -> Resolution;

    /// Fresh handle to the current swap chain, owned by the caller
    fn video_swapchain_handle(&self) -> Option<RawHandle>;

    /// Apply crop and destination framing. Must tolerate repeated identical calls.
    fn update_video_stream(&self, geometry: &StreamGeometry) -> Result<()>;

    fn shutdown(&self) -> Result<()>;
}

/// Creates engines bound to a GPU device and a notify callback
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        device: Arc<dyn GpuDevice>,
        attributes: &EngineAttributes,
        notify: EngineNotify,
    ) -> Result<Arc<dyn VideoEngine>>;
}
