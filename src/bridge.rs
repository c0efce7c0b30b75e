//! Host integration context
//!
//! Owned by whatever layer exposes the renderer to an external runtime.
//! Renderer events are forwarded to a host callback on a dedicated thread so
//! the engine's callback thread never runs host code.

use crate::config::RendererConfig;
use crate::error::Result;
use crate::renderer::{Collaborators, Renderer, RendererEvent};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Renderer plus event forwarding for one host
pub struct HostContext {
    renderer: Mutex<Option<Arc<Renderer>>>,
    forwarder: Mutex<Option<Forwarder>>,
}

struct Forwarder {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl HostContext {
    /// Create a renderer and start forwarding its events to `on_event`
    pub fn init<F>(
        config: RendererConfig,
        collaborators: Collaborators,
        on_event: F,
    ) -> Result<Self>
    where
        F: Fn(RendererEvent) + Send + 'static,
    {
        let renderer = Arc::new(Renderer::new(config, collaborators));
        let events = renderer.subscribe();
        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);

        let thread = std::thread::Builder::new()
            .name("ghostrelay-bridge".into())
            .spawn(move || forward(events, stopped, on_event))?;

        info!("Host context initialized (pid {})", renderer.process_id());
        Ok(Self {
            renderer: Mutex::new(Some(renderer)),
            forwarder: Mutex::new(Some(Forwarder { stop, thread })),
        })
    }

    /// The renderer, until [`HostContext::shutdown`]
    pub fn renderer(&self) -> Option<Arc<Renderer>> {
        self.renderer.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.renderer.lock().is_some()
    }

    /// Tear the renderer down and stop forwarding. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let renderer = self.renderer.lock().take();
        if let Some(renderer) = renderer {
            renderer.teardown();
        }

        let forwarder = self.forwarder.lock().take();
        if let Some(Forwarder { stop, thread }) = forwarder {
            drop(stop);
            if thread.join().is_err() {
                error!("Host event forwarder panicked");
            }
            info!("Host context shut down");
        }
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn forward<F>(events: Receiver<RendererEvent>, stopped: Receiver<()>, on_event: F)
where
    F: Fn(RendererEvent),
{
    loop {
        select! {
            recv(events) -> event => match event {
                Ok(event) => on_event(event),
                Err(_) => break,
            },
            recv(stopped) -> _ => break,
        }
    }
    // Deliver anything queued before the stop
    for event in events.try_iter() {
        on_event(event);
    }
    debug!("Host event forwarder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SchemeRegistry;
    use crate::sim::{
        SimulatedDeviceFactory, SimulatedEngineFactory, SimulatedPlatform, SimulatedSource,
    };
    use crate::types::{Resolution, Size};
    use std::time::Duration;

    const FOREGROUND: u32 = 8200;

    fn context() -> (HostContext, Arc<SimulatedEngineFactory>, Receiver<RendererEvent>) {
        let platform = Arc::new(SimulatedPlatform::new(8100));
        platform.spawn_process(FOREGROUND);
        let sources = Arc::new(SchemeRegistry::new("webrtc"));
        let engines = Arc::new(SimulatedEngineFactory::new(
            platform.clone(),
            sources.clone(),
        ));
        let collaborators = Collaborators {
            platform,
            devices: Arc::new(SimulatedDeviceFactory::new()),
            engines: engines.clone(),
            sources,
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = HostContext::init(RendererConfig::default(), collaborators, move |event| {
            let _ = tx.send(event);
        })
        .unwrap();
        (ctx, engines, rx)
    }

    #[test]
    fn test_render_format_reaches_host() {
        let (ctx, engines, rx) = context();
        let renderer = ctx.renderer().unwrap();
        renderer
            .setup(
                FOREGROUND,
                Arc::new(SimulatedSource::new("peer")),
                Size::new(1280.0, 720.0),
            )
            .unwrap();

        engines
            .last_engine()
            .unwrap()
            .format_change(Resolution::HD_720P)
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            RendererEvent::RenderFormatUpdate(format) => {
                assert_eq!(format.foreground_process_id, FOREGROUND);
                assert_eq!(format.width, 1280);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (ctx, engines, _rx) = context();
        let renderer = ctx.renderer().unwrap();
        renderer
            .setup(
                FOREGROUND,
                Arc::new(SimulatedSource::new("peer")),
                Size::new(640.0, 480.0),
            )
            .unwrap();
        drop(renderer);

        ctx.shutdown();
        ctx.shutdown();

        assert!(!ctx.is_active());
        assert!(ctx.renderer().is_none());
        assert!(engines.last_engine().unwrap().is_shut_down());
    }
}
