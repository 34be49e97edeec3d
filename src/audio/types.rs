use serde::{Deserialize, Serialize};

/// Oscillator shape of a synthesized tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

impl Waveform {
    /// Value of the waveform at a phase in `[0, 1)`
    fn at(&self, phase: f32) -> f32 {
        match self {
            Self::Sine => (phase * std::f32::consts::TAU).sin(),
            Self::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// A single procedurally synthesized note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    /// Frequency in Hz
    pub frequency: f32,
    /// Duration in milliseconds
    pub duration_ms: u32,
    /// Peak amplitude (0.0 - 1.0)
    pub volume: f32,
}

impl Tone {
    pub fn new(waveform: Waveform, frequency: f32, duration_ms: u32, volume: f32) -> Self {
        Self {
            waveform,
            frequency,
            duration_ms,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// Number of samples this tone occupies at a sample rate
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.duration_ms as u64 / 1000) as usize
    }

    /// Render mono samples with a linear decay envelope
    pub fn samples(&self, sample_rate: u32) -> Vec<f32> {
        let count = self.sample_count(sample_rate);
        if count == 0 || sample_rate == 0 {
            return Vec::new();
        }

        let step = self.frequency / sample_rate as f32;
        (0..count)
            .map(|i| {
                let phase = (i as f32 * step).fract();
                let envelope = 1.0 - i as f32 / count as f32;
                self.waveform.at(phase) * self.volume * envelope
            })
            .collect()
    }
}

/// Interaction that can make a retro sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundTrigger {
    /// Click on a link or button
    Click,
    /// Pointer entering an interactive element
    Hover,
    /// Visitor counter ticking over
    CounterTick,
}

impl SoundTrigger {
    /// The tone played for this trigger
    pub fn tone(&self) -> Tone {
        match self {
            Self::Click => Tone::new(Waveform::Square, 880.0, 60, 0.25),
            Self::Hover => Tone::new(Waveform::Triangle, 1320.0, 30, 0.1),
            Self::CounterTick => Tone::new(Waveform::Sine, 660.0, 120, 0.2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count() {
        let tone = Tone::new(Waveform::Sine, 440.0, 100, 0.5);
        assert_eq!(tone.sample_count(44_100), 4_410);
        assert_eq!(tone.samples(44_100).len(), 4_410);
    }

    #[test]
    fn test_envelope_decays() {
        let tone = Tone::new(Waveform::Square, 100.0, 50, 1.0);
        let samples = tone.samples(8_000);
        assert!((samples[0].abs() - 1.0).abs() < 1e-6);
        let tail = samples[samples.len() - 1].abs();
        assert!(tail < 0.01);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_volume_is_clamped() {
        let tone = Tone::new(Waveform::Triangle, 440.0, 10, 3.0);
        assert_eq!(tone.volume, 1.0);
    }

    #[test]
    fn test_zero_duration_is_silent() {
        let tone = Tone::new(Waveform::Sine, 440.0, 0, 0.5);
        assert!(tone.samples(44_100).is_empty());
    }
}
