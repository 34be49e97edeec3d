//! # Retro Sound Effects
//!
//! Short tones synthesized on the fly, so no audio assets are ever fetched. Output goes through
//! an [`AudioSink`] supplied by the host; the [`SoundBoard`] keeps it silent until the first user
//! gesture and drops anything the host refuses.
//!
//! ## Usage
//!
//! ```rust
//! use retro_skin::audio::{NullAudio, SoundBoard, SoundTrigger};
//!
//! let mut board = SoundBoard::new(Box::new(NullAudio));
//! board.set_enabled(true);
//! board.on_user_gesture();
//! assert!(!board.trigger(SoundTrigger::Click));
//! ```

pub mod sink;
pub mod types;

pub use sink::{AudioSink, NullAudio, SoundBoard, SAMPLE_RATE};
pub use types::{SoundTrigger, Tone, Waveform};
