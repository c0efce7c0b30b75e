//! Video framing
//!
//! Provides the crop/scale computation applied to the engine's video
//! stream whenever the render control or the native video size changes.

mod scale;

pub use scale::{crop_to_fill, stream_geometry, StreamGeometry};
