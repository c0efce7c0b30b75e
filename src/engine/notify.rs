//! Engine callback adapter
//!
//! Thread-safety contract: [`EngineNotify::event_notify`] is invoked on a
//! thread owned by the engine, concurrently with calls the UI thread makes
//! on the renderer. The sink must not block it.

use super::event::EngineEvent;
use crate::error::Result;

use std::sync::{Arc, Weak};

/// Receiver of decoded engine events (the renderer)
pub trait EngineEventSink: Send + Sync {
    fn on_engine_event(&self, event: EngineEvent) -> Result<()>;
}

type StableStateHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Callback object handed to the engine at creation.
///
/// Holds the sink weakly: an engine that outlives the renderer just has its
/// events dropped.
#[derive(Clone)]
pub struct EngineNotify {
    sink: Weak<dyn EngineEventSink>,
    stable_state: Option<StableStateHook>,
}

impl EngineNotify {
    pub fn new(sink: Weak<dyn EngineEventSink>) -> Self {
        Self {
            sink,
            stable_state: None,
        }
    }

    /// Called with the waiter id when the engine reports a stable state
    pub fn with_stable_state_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.stable_state = Some(Arc::new(hook));
        self
    }

    /// Entry point for raw engine callbacks
    pub fn event_notify(&self, code: u32, param1: usize, param2: u32) -> Result<()> {
        self.dispatch(EngineEvent::from_raw(code, param1, param2))
    }

    /// Entry point for already decoded events
    pub fn dispatch(&self, event: EngineEvent) -> Result<()> {
        if let EngineEvent::StableState { signal } = event {
            tracing::trace!("Engine reached stable state ({:#x})", signal);
            if let Some(hook) = &self.stable_state {
                hook(signal);
            }
            return Ok(());
        }

        match self.sink.upgrade() {
            Some(sink) => sink.on_engine_event(event),
            None => {
                tracing::trace!("Dropping engine event {:?}: renderer gone", event);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for EngineNotify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineNotify")
            .field("attached", &(self.sink.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::codes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl EngineEventSink for Recorder {
        fn on_engine_event(&self, event: EngineEvent) -> Result<()> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    #[test]
    fn test_forwards_decoded_events() {
        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn EngineEventSink> = recorder.clone();
        let notify = EngineNotify::new(Arc::downgrade(&sink));

        notify.event_notify(codes::FORMAT_CHANGE, 0, 0).unwrap();
        notify.event_notify(codes::TIME_UPDATE, 0, 0).unwrap();

        assert_eq!(
            *recorder.events.lock(),
            vec![EngineEvent::FormatChange, EngineEvent::TimeUpdate]
        );
    }

    #[test]
    fn test_stable_state_answered_locally() {
        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn EngineEventSink> = recorder.clone();
        let signalled = Arc::new(AtomicUsize::new(0));
        let seen = signalled.clone();
        let notify = EngineNotify::new(Arc::downgrade(&sink))
            .with_stable_state_hook(move |signal| seen.store(signal, Ordering::SeqCst));

        notify.event_notify(codes::NOTIFY_STABLE_STATE, 0x42, 0).unwrap();

        assert_eq!(signalled.load(Ordering::SeqCst), 0x42);
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_events_after_sink_dropped_are_ignored() {
        let sink: Arc<dyn EngineEventSink> = Arc::new(Recorder::default());
        let notify = EngineNotify::new(Arc::downgrade(&sink));
        drop(sink);
        assert!(notify.event_notify(codes::ERROR, 0, 1).is_ok());
    }
}
