//! Simulated GPU devices

use crate::device::{AdapterInfo, DeviceFactory, DriverKind, GpuDevice};
use crate::error::{Error, Result};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Device that only counts what was done to it
#[derive(Debug)]
pub struct SimulatedDevice {
    driver: DriverKind,
    protected: AtomicBool,
    clears: AtomicU32,
    trims: AtomicU32,
}

impl SimulatedDevice {
    fn new(driver: DriverKind) -> Self {
        Self {
            driver,
            protected: AtomicBool::new(false),
            clears: AtomicU32::new(0),
            trims: AtomicU32::new(0),
        }
    }

    pub fn is_multithread_protected(&self) -> bool {
        self.protected.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> u32 {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn trim_count(&self) -> u32 {
        self.trims.load(Ordering::SeqCst)
    }
}

impl GpuDevice for SimulatedDevice {
    fn driver(&self) -> DriverKind {
        self.driver
    }

    fn set_multithread_protected(&self) -> Result<()> {
        self.protected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn clear_state(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn trim(&self) {
        self.trims.fetch_add(1, Ordering::SeqCst);
    }
}

/// Device factory with switchable driver availability
#[derive(Debug)]
pub struct SimulatedDeviceFactory {
    hardware: bool,
    software: bool,
    adapter: Option<AdapterInfo>,
    created: Mutex<Vec<Arc<SimulatedDevice>>>,
}

impl SimulatedDeviceFactory {
    pub fn new() -> Self {
        Self {
            hardware: true,
            software: true,
            adapter: Some(AdapterInfo {
                vendor_id: 0x10DE,
                device_id: 0x2684,
                description: "Simulated GPU".into(),
            }),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn without_hardware(mut self) -> Self {
        self.hardware = false;
        self
    }

    pub fn without_software(mut self) -> Self {
        self.software = false;
        self
    }

    pub fn with_adapter(mut self, adapter: AdapterInfo) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Devices created so far, oldest first
    pub fn devices(&self) -> Vec<Arc<SimulatedDevice>> {
        self.created.lock().clone()
    }
}

impl Default for SimulatedDeviceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceFactory for SimulatedDeviceFactory {
    fn create(&self, driver: DriverKind) -> Result<Arc<dyn GpuDevice>> {
        let available = match driver {
            DriverKind::Hardware => self.hardware,
            DriverKind::Software => self.software,
        };
        if !available {
            return Err(Error::DeviceCreation(format!("no {} driver", driver)));
        }
        let device = Arc::new(SimulatedDevice::new(driver));
        self.created.lock().push(device.clone());
        Ok(device)
    }

    fn primary_adapter(&self) -> Option<AdapterInfo> {
        self.adapter.clone()
    }
}
