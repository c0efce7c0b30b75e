//! Simulated collaborators
//!
//! Deterministic stand-ins for the OS handle tables, the GPU device and the
//! video engine. Used by the unit tests and by `ghostrelay simulate` on
//! hosts without a native backend.

mod device;
mod engine;
mod platform;

pub use device::{SimulatedDevice, SimulatedDeviceFactory};
pub use engine::{FailPoint, SimulatedEngine, SimulatedEngineFactory, SimulatedSource};
pub use platform::{SimStats, SimulatedPlatform};
