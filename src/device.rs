//! GPU device selection
//!
//! The renderer needs one video-capable device shared with the engine.
//! Hardware is tried first; a software rasterizer is the only fallback.

use crate::error::{Error, Result};
use std::sync::Arc;

/// Driver backing a GPU device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Hardware adapter with video support
    Hardware,
    /// Software rasterizer (WARP)
    Software,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Hardware => write!(f, "hardware"),
            DriverKind::Software => write!(f, "software"),
        }
    }
}

/// A created GPU device
pub trait GpuDevice: Send + Sync {
    fn driver(&self) -> DriverKind;

    /// Allow the device to be used from the engine's threads
    fn set_multithread_protected(&self) -> Result<()>;

    /// End the pipeline: unbind all state from the immediate context
    fn clear_state(&self);

    /// Release temporary driver allocations
    fn trim(&self);
}

/// Creates devices and describes the primary adapter
pub trait DeviceFactory: Send + Sync {
    fn create(&self, driver: DriverKind) -> Result<Arc<dyn GpuDevice>>;

    /// Primary display adapter, if it can be queried
    fn primary_adapter(&self) -> Option<AdapterInfo>;
}

/// Display adapter identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub vendor_id: u32,
    pub device_id: u32,
    pub description: String,
}

const VENDOR_INTEL: u32 = 0x8086;

/// Skylake parts (HD Graphics 515 family) with a video scaling defect.
/// There may be more; these are the ones observed.
const SKYLAKE_SCALING_DEFECT: [u32; 3] = [0x191E, 0x1916, 0x191B];

impl AdapterInfo {
    /// Adapter needs horizontal mirror mode to scale video correctly
    pub fn needs_mirror_workaround(&self) -> bool {
        self.vendor_id == VENDOR_INTEL && SKYLAKE_SCALING_DEFECT.contains(&self.device_id)
    }
}

/// Create a hardware device, falling back to software once
pub fn create_device(factory: &dyn DeviceFactory) -> Result<Arc<dyn GpuDevice>> {
    match factory.create(DriverKind::Hardware) {
        Ok(device) => {
            device.set_multithread_protected().map_err(|e| {
                Error::DeviceCreation(format!("Failed to set device to multithreaded: {}", e))
            })?;
            tracing::info!("Using hardware GPU device");
            Ok(device)
        }
        Err(e) => {
            tracing::warn!("Hardware device unavailable ({}), falling back to software", e);
            let device = factory
                .create(DriverKind::Software)
                .map_err(|e| Error::DeviceCreation(format!("Failed to create a device: {}", e)))?;
            tracing::info!("Using software GPU device");
            Ok(device)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedDeviceFactory;

    #[test]
    fn test_hardware_preferred() {
        let factory = SimulatedDeviceFactory::new();
        let device = create_device(&factory).unwrap();
        assert_eq!(device.driver(), DriverKind::Hardware);
    }

    #[test]
    fn test_software_fallback() {
        let factory = SimulatedDeviceFactory::new().without_hardware();
        let device = create_device(&factory).unwrap();
        assert_eq!(device.driver(), DriverKind::Software);
    }

    #[test]
    fn test_no_device_is_fatal() {
        let factory = SimulatedDeviceFactory::new()
            .without_hardware()
            .without_software();
        let err = create_device(&factory).err().unwrap();
        assert!(matches!(err, Error::DeviceCreation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_skylake_detection() {
        let skylake = AdapterInfo {
            vendor_id: 0x8086,
            device_id: 0x1916,
            description: "Intel(R) HD Graphics 520".into(),
        };
        assert!(skylake.needs_mirror_workaround());

        let other = AdapterInfo {
            vendor_id: 0x10DE,
            device_id: 0x1916,
            description: "NVIDIA".into(),
        };
        assert!(!other.needs_mirror_workaround());
    }
}
