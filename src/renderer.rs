//! Background swap chain renderer
//!
//! Drives the video engine in the background process and relays its swap
//! chain to whichever process currently owns the UI.
//!
//! Two threads touch a renderer:
//! - the UI/owner thread: setup, resize, retarget requests, teardown
//! - the engine's callback thread: format change, time update, error
//!
//! Relays are only mutated from engine callbacks (and teardown). A retarget
//! requested by the UI thread is parked in `pending_*` and applied on the
//! next engine tick. The geometry lock is never held across a duplication
//! or an engine call.

use crate::config::RendererConfig;
use crate::device::{self, DeviceFactory, GpuDevice};
use crate::engine::{
    EngineAttributes, EngineEvent, EngineEventSink, EngineFactory, EngineNotify, MediaSource,
    SchemeRegistry, VideoEngine,
};
use crate::error::{Error, Result};
use crate::platform::HandlePlatform;
use crate::processing;
use crate::relay::HandleRelay;
use crate::types::{BorderColor, RawHandle, RenderFormat, Size};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Renderer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Initializing,
    Streaming,
}

/// Notifications for the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererEvent {
    /// A new or retargeted swap chain handle is valid in the foreground process
    RenderFormatUpdate(RenderFormat),
    /// The engine failed; the renderer should be torn down
    EngineError { status: u32 },
}

/// External collaborators a renderer drives
#[derive(Clone)]
pub struct Collaborators {
    pub platform: Arc<dyn HandlePlatform>,
    pub devices: Arc<dyn DeviceFactory>,
    pub engines: Arc<dyn EngineFactory>,
    pub sources: Arc<SchemeRegistry>,
}

struct Resources {
    state: RendererState,
    /// Bumped by every setup; engine callbacks carry it into the hand-off
    session: u64,
    device: Option<Arc<dyn GpuDevice>>,
    engine: Option<Arc<dyn VideoEngine>>,
    source_url: Option<String>,
    rescaler: Option<Rescaler>,
}

/// Guarded by the geometry lock
struct Geometry {
    render_control_size: Size,
    video_size: Size,
    pending_foreground_pid: u32,
}

/// Relay state; mutated on the engine callback thread
struct Presentation {
    /// Session relays may be handed off for; `None` once torn down
    session: Option<u64>,
    foreground_pid: u32,
    active: HandleRelay,
    stale: HandleRelay,
    stale_since: Option<Instant>,
}

impl Presentation {
    /// Active relay becomes the stale one; the previous stale relay is closed
    fn retire_active(&mut self) {
        self.active.detach_move(&mut self.stale);
        self.stale_since = Some(Instant::now());
    }

    fn release_stale(&mut self) {
        self.stale.close();
        self.stale_since = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct RescaleJob {
    control: Size,
    video: Size,
}

/// Fire-and-forget scale recomputation off the calling thread
struct Rescaler {
    tx: Sender<RescaleJob>,
    thread: JoinHandle<()>,
}

impl Rescaler {
    fn spawn(engine: Arc<dyn VideoEngine>, border: BorderColor) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<RescaleJob>();
        let thread = std::thread::Builder::new()
            .name("ghostrelay-rescale".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let Some(geometry) = processing::stream_geometry(job.control, job.video, border)
                    else {
                        continue;
                    };
                    trace!(
                        "Video stream crop {:?} for control {} / video {}",
                        geometry.source,
                        job.control,
                        job.video
                    );
                    if let Err(e) = engine.update_video_stream(&geometry) {
                        warn!("Video stream update failed: {}", e);
                    }
                }
                debug!("Rescale worker stopped");
            })?;
        Ok(Self { tx, thread })
    }

    fn dispatch(&self, job: RescaleJob) {
        if self.tx.send(job).is_err() {
            debug!("Rescale worker gone, dropping job");
        }
    }

    fn stop(self) {
        let Rescaler { tx, thread } = self;
        drop(tx);
        if thread.join().is_err() {
            error!("Rescale worker panicked");
        }
    }
}

struct Shared {
    config: RendererConfig,
    collaborators: Collaborators,
    resources: Mutex<Resources>,
    geometry: Mutex<Geometry>,
    pending_changes: AtomicU32,
    presentation: Mutex<Presentation>,
    listeners: Mutex<Vec<Sender<RendererEvent>>>,
}

/// Renders a live stream in this process for display in a foreground process
pub struct Renderer {
    shared: Arc<Shared>,
}

impl Renderer {
    pub fn new(config: RendererConfig, collaborators: Collaborators) -> Self {
        let platform = collaborators.platform.clone();
        Self {
            shared: Arc::new(Shared {
                config,
                collaborators,
                resources: Mutex::new(Resources {
                    state: RendererState::Uninitialized,
                    session: 0,
                    device: None,
                    engine: None,
                    source_url: None,
                    rescaler: None,
                }),
                geometry: Mutex::new(Geometry {
                    render_control_size: Size::default(),
                    video_size: Size::default(),
                    pending_foreground_pid: 0,
                }),
                pending_changes: AtomicU32::new(0),
                presentation: Mutex::new(Presentation {
                    session: None,
                    foreground_pid: 0,
                    active: HandleRelay::new(platform.clone()),
                    stale: HandleRelay::new(platform),
                    stale_since: None,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create the device and engine, attach `source` and start loading it.
    ///
    /// Once the engine produces a swap chain a
    /// [`RendererEvent::RenderFormatUpdate`] carries its handle for
    /// `foreground_pid`. Any failure is fatal: call [`Renderer::teardown`].
    pub fn setup(
        &self,
        foreground_pid: u32,
        source: Arc<dyn MediaSource>,
        control_size: Size,
    ) -> Result<()> {
        let previous = {
            let resources = self.shared.resources.lock();
            let previous = resources.state;
            if previous == RendererState::Streaming {
                return Err(Error::AlreadyStreaming);
            }
            previous
        };
        if previous == RendererState::Initializing {
            warn!("Retrying setup after a failed attempt");
            self.shared.teardown();
        }
        let session = {
            let mut resources = self.shared.resources.lock();
            resources.state = RendererState::Initializing;
            resources.session += 1;
            resources.session
        };
        info!("Setting up renderer for foreground pid {}", foreground_pid);

        let shared = &self.shared;
        let config = &shared.config;
        let collaborators = &shared.collaborators;

        shared.geometry.lock().render_control_size = control_size;
        {
            let mut presentation = shared.presentation.lock();
            presentation.session = Some(session);
            presentation.foreground_pid = foreground_pid;
        }

        let url = collaborators.sources.register(source);
        shared.resources.lock().source_url = Some(url.clone());

        let device = device::create_device(collaborators.devices.as_ref())?;
        shared.resources.lock().device = Some(device.clone());

        let sink: Weak<dyn EngineEventSink> = Arc::<Shared>::downgrade(&self.shared);
        let attributes = EngineAttributes {
            output_format: config.output_format,
            real_time: config.real_time_mode,
            wait_for_stable_state: true,
        };
        let engine = collaborators
            .engines
            .create(device, &attributes, EngineNotify::new(sink))
            .map_err(|e| Error::EngineCreation(format!("Failed to create media engine: {}", e)))?;
        shared.resources.lock().engine = Some(engine.clone());

        engine.enable_windowless_swapchain().map_err(|e| {
            Error::EngineSetup(format!("Failed to enable windowless swapchain mode: {}", e))
        })?;
        if let Err(e) = engine.set_real_time_mode(config.real_time_mode) {
            warn!("Failed to set real-time mode: {}", e);
        }
        if config.adapter_mirror_workaround {
            let adapter = collaborators.devices.primary_adapter();
            if let Some(adapter) = adapter.filter(|a| a.needs_mirror_workaround()) {
                info!(
                    "{} detected, switching to mirror mode",
                    adapter.description
                );
                if let Err(e) = engine.enable_horizontal_mirror(true) {
                    warn!("Failed to enable mirror mode: {}", e);
                }
            }
        }

        let rescaler = Rescaler::spawn(engine.clone(), config.border_color)?;
        shared.resources.lock().rescaler = Some(rescaler);

        engine
            .set_source(&url)
            .map_err(|e| Error::SourceAttach(format!("Failed to set media source: {}", e)))?;
        engine
            .load()
            .map_err(|e| Error::EngineSetup(format!("Failed to load media from source: {}", e)))?;

        shared.resources.lock().state = RendererState::Streaming;
        info!("Renderer loading {}", url);
        Ok(())
    }

    /// Render control was resized; recompute the crop asynchronously
    pub fn set_render_control_size(&self, size: Size) {
        let job = {
            let mut geometry = self.shared.geometry.lock();
            geometry.render_control_size = size;
            RescaleJob {
                control: size,
                video: geometry.video_size,
            }
        };
        debug!("Render control resized to {}", size);
        self.shared.schedule_rescale(job);
    }

    /// Request that the swap chain be relayed to a different foreground
    /// process. Applied on the next engine tick.
    pub fn update_foreground_process_id(&self, pid: u32) {
        self.shared.geometry.lock().pending_foreground_pid = pid;
        self.shared.pending_changes.fetch_add(1, Ordering::AcqRel);
        debug!("Foreground process change to pid {} queued", pid);
    }

    /// Current remote handle and video geometry, if a valid handle exists
    pub fn render_format(&self) -> Option<RenderFormat> {
        let (handle, foreground_pid) = {
            let presentation = self.shared.presentation.lock();
            (presentation.active.remote_handle()?, presentation.foreground_pid)
        };
        let engine = self.shared.engine()?;
        let size = engine.native_video_size();
        Some(RenderFormat {
            handle,
            width: size.width,
            height: size.height,
            foreground_process_id: foreground_pid,
        })
    }

    /// Release engine, GPU and handle resources. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    /// Inbound engine callback surface for hosts that deliver events themselves
    pub fn on_engine_event(&self, event: EngineEvent) -> Result<()> {
        self.shared.handle_event(event)
    }

    /// Receive render-format updates and engine errors.
    /// Sending never blocks the engine thread.
    pub fn subscribe(&self) -> Receiver<RendererEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.listeners.lock().push(tx);
        rx
    }

    pub fn state(&self) -> RendererState {
        self.shared.resources.lock().state
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.resources.lock().engine.is_some()
    }

    /// Id of this (background) process
    pub fn process_id(&self) -> u32 {
        self.shared.collaborators.platform.current_process_id()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.shared.config
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl Shared {
    fn engine(&self) -> Option<Arc<dyn VideoEngine>> {
        self.resources.lock().engine.clone()
    }

    fn session_engine(&self) -> Option<(Arc<dyn VideoEngine>, u64)> {
        let resources = self.resources.lock();
        let engine = resources.engine.clone()?;
        Some((engine, resources.session))
    }

    fn schedule_rescale(&self, job: RescaleJob) {
        if let Some(rescaler) = &self.resources.lock().rescaler {
            rescaler.dispatch(job);
        }
    }

    fn emit(&self, event: RendererEvent) {
        self.listeners.lock().retain(|tx| tx.send(event).is_ok());
    }

    fn handle_event(&self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Error { status } => {
                error!("Video engine error {:#010x}", status);
                self.emit(RendererEvent::EngineError { status });
                Err(Error::Engine { status })
            }
            EngineEvent::FormatChange => {
                self.release_stale_when_expired();
                self.check_foreground_process_id();
                if let Some((engine, session)) = self.session_engine() {
                    let handle = engine.video_swapchain_handle();
                    if let Some(handle) = handle.filter(RawHandle::is_valid) {
                        self.send_swap_chain_handle(engine.as_ref(), session, Some(handle));
                    }
                }
                Ok(())
            }
            EngineEvent::CanPlay => {
                if let Some(engine) = self.engine() {
                    debug!("Engine can play, starting playback");
                    if let Err(e) = engine.play() {
                        warn!("Failed to start playback: {}", e);
                    }
                }
                Ok(())
            }
            EngineEvent::TimeUpdate => {
                self.release_stale_when_expired();
                self.check_foreground_process_id();
                Ok(())
            }
            EngineEvent::StableState { .. } | EngineEvent::Other(_) => {
                trace!("Ignoring engine event {}", event.code());
                Ok(())
            }
        }
    }

    /// Hand a new swap chain to the foreground process, or with `None`
    /// re-announce the current one.
    ///
    /// A hand-off that lost the race with teardown only closes `new`.
    fn send_swap_chain_handle(
        &self,
        engine: &dyn VideoEngine,
        session: u64,
        new: Option<RawHandle>,
    ) {
        let (remote, foreground_pid) = {
            let mut presentation = self.presentation.lock();
            if presentation.session != Some(session) {
                drop(presentation);
                if let Some(handle) = new {
                    debug!("Session {} ended, closing late swap chain {}", session, handle);
                    if let Err(e) = self.collaborators.platform.close_local(handle) {
                        debug!("Ignoring local close failure: {}", e);
                    }
                }
                return;
            }
            if let Some(handle) = new {
                presentation.retire_active();
                let pid = presentation.foreground_pid;
                presentation.active.assign_handle(handle, pid);
            }
            (
                presentation.active.remote_handle(),
                presentation.foreground_pid,
            )
        };

        let native = engine.native_video_size();
        if let Some(handle) = remote {
            info!(
                "Swap chain {} ready for pid {} ({})",
                handle, foreground_pid, native
            );
            self.emit(RendererEvent::RenderFormatUpdate(RenderFormat {
                handle,
                width: native.width,
                height: native.height,
                foreground_process_id: foreground_pid,
            }));
        }

        let job = {
            let mut geometry = self.geometry.lock();
            geometry.video_size = Size::from(native);
            RescaleJob {
                control: geometry.render_control_size,
                video: geometry.video_size,
            }
        };
        self.schedule_rescale(job);
    }

    fn release_stale_when_expired(&self) {
        let mut presentation = self.presentation.lock();
        if presentation.stale.is_empty() {
            return;
        }
        let expired = presentation
            .stale_since
            .map_or(true, |since| since.elapsed() >= self.config.stale_timeout());
        if expired {
            debug!("Releasing stale swap chain handle");
            presentation.release_stale();
        }
    }

    /// Apply a queued foreground process change
    fn check_foreground_process_id(&self) {
        let observed = self.pending_changes.load(Ordering::Acquire);
        if observed == 0 {
            return;
        }
        let requested = self.geometry.lock().pending_foreground_pid;
        // Requests that land after the load stay counted for the next tick
        self.pending_changes.fetch_sub(observed, Ordering::AcqRel);

        {
            let mut presentation = self.presentation.lock();
            if presentation.session.is_none() || requested == presentation.foreground_pid {
                return;
            }
            info!(
                "Retargeting swap chain from pid {} to pid {}",
                presentation.foreground_pid, requested
            );
            presentation.foreground_pid = requested;
            let local = presentation.active.detach_local_handle();
            presentation.release_stale();
            presentation.retire_active();
            if let Some(local) = local {
                presentation.active.assign_handle(local, requested);
            }
        }

        if let Some((engine, session)) = self.session_engine() {
            self.send_swap_chain_handle(engine.as_ref(), session, None);
        }
    }

    fn teardown(&self) {
        let (previous, device, engine, url, rescaler) = {
            let mut resources = self.resources.lock();
            let previous = resources.state;
            resources.state = RendererState::Uninitialized;
            (
                previous,
                resources.device.take(),
                resources.engine.take(),
                resources.source_url.take(),
                resources.rescaler.take(),
            )
        };
        // Fence engine callbacks still in flight before anything is released
        self.presentation.lock().session = None;

        if let Some(rescaler) = rescaler {
            rescaler.stop();
        }
        if let Some(device) = &device {
            device.clear_state();
            device.trim();
        }
        if let Some(engine) = engine {
            debug!("Shutting down video engine");
            if let Err(e) = engine.shutdown() {
                debug!("Ignoring engine shutdown failure: {}", e);
            }
        }
        drop(device);

        {
            let mut presentation = self.presentation.lock();
            presentation.active.close();
            presentation.release_stale();
        }
        if let Some(url) = url {
            self.collaborators.sources.remove(&url);
        }

        self.pending_changes.store(0, Ordering::Release);
        self.geometry.lock().video_size = Size::default();

        if previous != RendererState::Uninitialized {
            info!("Renderer torn down");
        }
    }
}

impl EngineEventSink for Shared {
    fn on_engine_event(&self, event: EngineEvent) -> Result<()> {
        self.handle_event(event)
    }
}
