//! Engine event decoding

/// Raw engine event codes
pub mod codes {
    pub const ERROR: u32 = 5;
    pub const CAN_PLAY: u32 = 14;
    pub const TIME_UPDATE: u32 = 18;
    pub const FORMAT_CHANGE: u32 = 1000;
    pub const NOTIFY_STABLE_STATE: u32 = 1008;
}

/// Lifecycle event delivered on the engine's callback thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Playback failed; carries the engine status code
    Error { status: u32 },
    /// Video format changed, a new swap chain may be available
    FormatChange,
    /// Enough data to start playback
    CanPlay,
    /// Periodic playback tick
    TimeUpdate,
    /// The engine reached a stable state; `signal` identifies its waiter
    StableState { signal: usize },
    /// Anything else
    Other(u32),
}

impl EngineEvent {
    /// Decode `(event, param1, param2)` as delivered by the engine
    pub fn from_raw(code: u32, param1: usize, param2: u32) -> Self {
        match code {
            codes::ERROR => EngineEvent::Error { status: param2 },
            codes::CAN_PLAY => EngineEvent::CanPlay,
            codes::TIME_UPDATE => EngineEvent::TimeUpdate,
            codes::FORMAT_CHANGE => EngineEvent::FormatChange,
            codes::NOTIFY_STABLE_STATE => EngineEvent::StableState { signal: param1 },
            other => EngineEvent::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            EngineEvent::Error { .. } => codes::ERROR,
            EngineEvent::CanPlay => codes::CAN_PLAY,
            EngineEvent::TimeUpdate => codes::TIME_UPDATE,
            EngineEvent::FormatChange => codes::FORMAT_CHANGE,
            EngineEvent::StableState { .. } => codes::NOTIFY_STABLE_STATE,
            EngineEvent::Other(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_status() {
        let event = EngineEvent::from_raw(codes::ERROR, 0, 0xC00D_36C4);
        assert_eq!(event, EngineEvent::Error { status: 0xC00D_36C4 });
    }

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(EngineEvent::from_raw(1000, 0, 0), EngineEvent::FormatChange);
        assert_eq!(EngineEvent::from_raw(14, 0, 0), EngineEvent::CanPlay);
        assert_eq!(EngineEvent::from_raw(18, 0, 0), EngineEvent::TimeUpdate);
        assert_eq!(
            EngineEvent::from_raw(1008, 0xBEEF, 0),
            EngineEvent::StableState { signal: 0xBEEF }
        );
        // PLAYING
        assert_eq!(EngineEvent::from_raw(13, 0, 0), EngineEvent::Other(13));
        assert_eq!(EngineEvent::Other(13).code(), 13);
    }
}
