use tracing::debug;

use super::types::{SoundTrigger, Tone};
use crate::error::AudioError;

pub const SAMPLE_RATE: u32 = 22_050;

/// Host audio output
pub trait AudioSink: Send {
    /// Open the output; hosts typically refuse this before a user gesture
    fn unlock(&mut self) -> Result<(), AudioError>;

    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), AudioError>;
}

/// Sink for hosts without audio: every call is refused
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn unlock(&mut self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable {
            reason: "no audio output".to_string(),
        })
    }

    fn play(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<(), AudioError> {
        Err(AudioError::Unavailable {
            reason: "no audio output".to_string(),
        })
    }
}

/// Plays trigger tones once the page has seen a user gesture.
///
/// Every failure is swallowed: sound is decoration, and a refusing host just means silence.
pub struct SoundBoard {
    sink: Box<dyn AudioSink>,
    enabled: bool,
    armed: bool,
    played: usize,
}

impl SoundBoard {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            enabled: false,
            armed: false,
            played: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.armed = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// First user interaction: try to open the output
    pub fn on_user_gesture(&mut self) {
        if !self.enabled || self.armed {
            return;
        }
        match self.sink.unlock() {
            Ok(()) => self.armed = true,
            Err(e) => debug!("Audio stays silent: {}", e),
        }
    }

    /// Play the tone for a trigger; returns whether anything was played
    pub fn trigger(&mut self, trigger: SoundTrigger) -> bool {
        if !self.enabled || !self.armed {
            return false;
        }
        self.play_tone(trigger.tone())
    }

    fn play_tone(&mut self, tone: Tone) -> bool {
        let samples = tone.samples(SAMPLE_RATE);
        match self.sink.play(&samples, SAMPLE_RATE) {
            Ok(()) => {
                self.played += 1;
                true
            }
            Err(e) => {
                debug!("Dropped {:?} tone: {}", tone.waveform, e);
                false
            }
        }
    }

    /// Tones played so far
    pub fn played(&self) -> usize {
        self.played
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that shares what it played with the test
    #[derive(Clone, Default)]
    pub struct RecordingAudio {
        pub allow: bool,
        pub played: Arc<Mutex<Vec<usize>>>,
    }

    impl RecordingAudio {
        pub fn allowing() -> Self {
            Self {
                allow: true,
                played: Arc::default(),
            }
        }
    }

    impl AudioSink for RecordingAudio {
        fn unlock(&mut self) -> Result<(), AudioError> {
            if self.allow {
                Ok(())
            } else {
                Err(AudioError::Disallowed {
                    reason: "autoplay policy".to_string(),
                })
            }
        }

        fn play(&mut self, samples: &[f32], _sample_rate: u32) -> Result<(), AudioError> {
            self.played.lock().unwrap().push(samples.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingAudio;
    use super::*;

    #[test]
    fn test_silent_until_gesture() {
        let sink = RecordingAudio::allowing();
        let mut board = SoundBoard::new(Box::new(sink.clone()));
        board.set_enabled(true);

        assert!(!board.trigger(SoundTrigger::Click));
        board.on_user_gesture();
        assert!(board.trigger(SoundTrigger::Click));
        assert_eq!(sink.played.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disallowed_audio_fails_silently() {
        let sink = RecordingAudio::default();
        let mut board = SoundBoard::new(Box::new(sink.clone()));
        board.set_enabled(true);
        board.on_user_gesture();

        assert!(!board.is_armed());
        assert!(!board.trigger(SoundTrigger::Hover));
        assert!(sink.played.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disabling_disarms() {
        let mut board = SoundBoard::new(Box::new(RecordingAudio::allowing()));
        board.set_enabled(true);
        board.on_user_gesture();
        board.set_enabled(false);
        assert!(!board.trigger(SoundTrigger::CounterTick));
        assert_eq!(board.played(), 0);
    }

    #[test]
    fn test_null_audio_never_arms() {
        let mut board = SoundBoard::new(Box::new(NullAudio));
        board.set_enabled(true);
        board.on_user_gesture();
        assert!(!board.is_armed());
    }
}
