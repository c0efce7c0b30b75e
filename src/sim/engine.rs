//! Scriptable video engine
//!
//! Events are only raised when a test (or the CLI simulator) asks for them,
//! on whatever thread it calls from. That thread plays the role of the
//! engine's callback thread.

use super::platform::SimulatedPlatform;
use crate::device::GpuDevice;
use crate::engine::{
    EngineAttributes, EngineEvent, EngineFactory, EngineNotify, MediaSource, SchemeRegistry,
    VideoEngine,
};
use crate::error::{Error, Result};
use crate::processing::StreamGeometry;
use crate::types::{RawHandle, Resolution};

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Create,
    WindowlessSwapchain,
    SetSource,
    Load,
}

/// Named media source
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    name: String,
}

impl SimulatedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MediaSource for SimulatedSource {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Default)]
struct EngineState {
    windowless: bool,
    real_time: bool,
    mirrored: bool,
    source: Option<String>,
    loaded: bool,
    play_calls: u32,
    shut_down: bool,
    native_size: Resolution,
    stream_updates: Vec<StreamGeometry>,
}

/// Engine that renders nothing but hands out real (simulated) swap chain handles
pub struct SimulatedEngine {
    platform: Arc<SimulatedPlatform>,
    sources: Arc<SchemeRegistry>,
    notify: EngineNotify,
    attributes: EngineAttributes,
    state: Mutex<EngineState>,
    updated: Condvar,
}

impl SimulatedEngine {
    fn ready(&self) -> Result<()> {
        if self.state.lock().shut_down {
            return Err(Error::Internal("engine is shut down".into()));
        }
        Ok(())
    }

    /// Deliver an event to the renderer
    pub fn fire(&self, event: EngineEvent) -> Result<()> {
        self.notify.dispatch(event)
    }

    /// Change the native size and raise a format change
    pub fn format_change(&self, size: Resolution) -> Result<()> {
        self.state.lock().native_size = size;
        self.fire(EngineEvent::FormatChange)
    }

    pub fn tick(&self) -> Result<()> {
        self.fire(EngineEvent::TimeUpdate)
    }

    pub fn can_play(&self) -> Result<()> {
        self.fire(EngineEvent::CanPlay)
    }

    pub fn attributes(&self) -> EngineAttributes {
        self.attributes
    }

    pub fn is_windowless(&self) -> bool {
        self.state.lock().windowless
    }

    pub fn is_real_time(&self) -> bool {
        self.state.lock().real_time
    }

    pub fn is_mirrored(&self) -> bool {
        self.state.lock().mirrored
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().play_calls > 0
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn stream_updates(&self) -> Vec<StreamGeometry> {
        self.state.lock().stream_updates.clone()
    }

    /// Wait until a stream update matching `pred` has been applied
    pub fn wait_for_stream_update(
        &self,
        timeout: Duration,
        pred: impl Fn(&StreamGeometry) -> bool,
    ) -> Option<StreamGeometry> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(found) = state.stream_updates.iter().rev().find(|g| pred(g)) {
                return Some(*found);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.updated.wait_for(&mut state, deadline - now);
        }
    }
}

impl VideoEngine for SimulatedEngine {
    fn enable_windowless_swapchain(&self) -> Result<()> {
        self.ready()?;
        self.state.lock().windowless = true;
        Ok(())
    }

    fn set_real_time_mode(&self, enabled: bool) -> Result<()> {
        self.ready()?;
        self.state.lock().real_time = enabled;
        Ok(())
    }

    fn enable_horizontal_mirror(&self, enabled: bool) -> Result<()> {
        self.ready()?;
        self.state.lock().mirrored = enabled;
        Ok(())
    }

    fn set_source(&self, url: &str) -> Result<()> {
        self.ready()?;
        self.state.lock().source = Some(url.to_string());
        Ok(())
    }

    fn load(&self) -> Result<()> {
        self.ready()?;
        let url = self
            .state
            .lock()
            .source
            .clone()
            .ok_or_else(|| Error::EngineSetup("no source set".into()))?;
        let source = self
            .sources
            .resolve(&url)
            .ok_or_else(|| Error::SourceAttach(format!("{} is not registered", url)))?;
        tracing::debug!("Simulated engine loading {}", source.describe());
        self.state.lock().loaded = true;
        Ok(())
    }

    fn play(&self) -> Result<()> {
        self.ready()?;
        self.state.lock().play_calls += 1;
        Ok(())
    }

    fn native_video_size(&self) -> Resolution {
        self.state.lock().native_size
    }

    fn video_swapchain_handle(&self) -> Option<RawHandle> {
        let state = self.state.lock();
        if !state.windowless || !state.loaded || state.shut_down {
            return None;
        }
        drop(state);
        Some(self.platform.create_surface())
    }

    fn update_video_stream(&self, geometry: &StreamGeometry) -> Result<()> {
        self.ready()?;
        self.state.lock().stream_updates.push(*geometry);
        self.updated.notify_all();
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.shut_down = true;
        state.loaded = false;
        Ok(())
    }
}

/// Creates [`SimulatedEngine`]s and remembers them for inspection
pub struct SimulatedEngineFactory {
    platform: Arc<SimulatedPlatform>,
    sources: Arc<SchemeRegistry>,
    fail_points: Vec<FailPoint>,
    created: Mutex<Vec<Arc<SimulatedEngine>>>,
}

impl SimulatedEngineFactory {
    pub fn new(platform: Arc<SimulatedPlatform>, sources: Arc<SchemeRegistry>) -> Self {
        Self {
            platform,
            sources,
            fail_points: Vec::new(),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(mut self, point: FailPoint) -> Self {
        self.fail_points.push(point);
        self
    }

    /// Most recently created engine
    pub fn last_engine(&self) -> Option<Arc<SimulatedEngine>> {
        self.created.lock().last().cloned()
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(
        &self,
        _device: Arc<dyn GpuDevice>,
        attributes: &EngineAttributes,
        notify: EngineNotify,
    ) -> Result<Arc<dyn VideoEngine>> {
        if self.fail_points.contains(&FailPoint::Create) {
            return Err(Error::EngineCreation("simulated failure".into()));
        }
        let engine = Arc::new(FailingEngine::wrap(
            SimulatedEngine {
                platform: self.platform.clone(),
                sources: self.sources.clone(),
                notify,
                attributes: *attributes,
                state: Mutex::new(EngineState::default()),
                updated: Condvar::new(),
            },
            self.fail_points.clone(),
        ));
        self.created.lock().push(engine.inner.clone());
        Ok(engine)
    }
}

/// Applies the factory's fail points in front of a simulated engine
struct FailingEngine {
    inner: Arc<SimulatedEngine>,
    fail_points: Vec<FailPoint>,
}

impl FailingEngine {
    fn wrap(engine: SimulatedEngine, fail_points: Vec<FailPoint>) -> Self {
        Self {
            inner: Arc::new(engine),
            fail_points,
        }
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.contains(&point) {
            return Err(Error::Internal(format!("simulated {:?} failure", point)));
        }
        Ok(())
    }
}

impl VideoEngine for FailingEngine {
    fn enable_windowless_swapchain(&self) -> Result<()> {
        self.check(FailPoint::WindowlessSwapchain)?;
        self.inner.enable_windowless_swapchain()
    }

    fn set_real_time_mode(&self, enabled: bool) -> Result<()> {
        self.inner.set_real_time_mode(enabled)
    }

    fn enable_horizontal_mirror(&self, enabled: bool) -> Result<()> {
        self.inner.enable_horizontal_mirror(enabled)
    }

    fn set_source(&self, url: &str) -> Result<()> {
        self.check(FailPoint::SetSource)?;
        self.inner.set_source(url)
    }

    fn load(&self) -> Result<()> {
        self.check(FailPoint::Load)?;
        self.inner.load()
    }

    fn play(&self) -> Result<()> {
        self.inner.play()
    }

    fn native_video_size(&self) -> Resolution {
        self.inner.native_video_size()
    }

    fn video_swapchain_handle(&self) -> Option<RawHandle> {
        self.inner.video_swapchain_handle()
    }

    fn update_video_stream(&self, geometry: &StreamGeometry) -> Result<()> {
        self.inner.update_video_stream(geometry)
    }

    fn shutdown(&self) -> Result<()> {
        self.inner.shutdown()
    }
}
