//! GhostRelay - background swap chain relay
//!
//! Renders a live video stream in a background process and hands the
//! resulting swap chain to whichever foreground process owns the UI.
//!
//! # Features
//!
//! - **Relay**: cross-process handle duplication with a grace window for
//!   superseded handles
//! - **Retarget**: move the swap chain to a new foreground process without
//!   recreating the engine
//! - **Scale**: crop-to-fill geometry recomputed off the UI thread
//! - **Sim**: in-memory handle tables, devices and engine for tests and demos
//!
//! # Example
//!
//! ```rust,no_run
//! use ghostrelay::sim::{
//!     SimulatedDeviceFactory, SimulatedEngineFactory, SimulatedPlatform, SimulatedSource,
//! };
//! use ghostrelay::{Collaborators, Renderer, RendererConfig, SchemeRegistry, Size};
//! use std::sync::Arc;
//!
//! fn main() -> ghostrelay::Result<()> {
//!     let config = RendererConfig::default();
//!     let platform = Arc::new(SimulatedPlatform::new(std::process::id()));
//!     let sources = Arc::new(SchemeRegistry::new(config.url_scheme.clone()));
//!     let collaborators = Collaborators {
//!         platform: platform.clone(),
//!         devices: Arc::new(SimulatedDeviceFactory::new()),
//!         engines: Arc::new(SimulatedEngineFactory::new(platform, sources.clone())),
//!         sources,
//!     };
//!
//!     let renderer = Renderer::new(config, collaborators);
//!     let updates = renderer.subscribe();
//!     renderer.setup(4242, Arc::new(SimulatedSource::new("peer")), Size::new(1280.0, 720.0))?;
//!     for update in updates.try_iter() {
//!         println!("{:?}", update);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod platform;
pub mod processing;
pub mod relay;
pub mod renderer;
pub mod sim;
pub mod types;

// Re-exports for convenience
pub use bridge::HostContext;
pub use config::RendererConfig;
pub use device::{AdapterInfo, DeviceFactory, DriverKind, GpuDevice};
pub use engine::{
    EngineEvent, EngineFactory, EngineNotify, MediaSource, SchemeRegistry, VideoEngine,
};
pub use error::{Error, Result};
pub use platform::HandlePlatform;
pub use processing::{crop_to_fill, stream_geometry, StreamGeometry};
pub use relay::HandleRelay;
pub use renderer::{Collaborators, Renderer, RendererEvent, RendererState};
pub use types::{
    BorderColor, FrameFormat, NormalizedRect, RawHandle, RenderFormat, Resolution, Size,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the native handle backend, if this platform has one
pub fn native_platform_name() -> Option<&'static str> {
    platform::native().map(|p| p.name())
}
