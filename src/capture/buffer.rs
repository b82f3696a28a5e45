use serde::{Deserialize, Serialize};

const LEVEL_BOOST: f32 = 2.5;

/// Interleaved 16-bit PCM accumulated while recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        let channels = self.channels.max(1) as f32;
        self.samples.len() as f32 / (self.sample_rate as f32 * channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn append(&mut self, data: &[i16]) {
        self.samples.extend_from_slice(data);
    }

    pub fn append_f32(&mut self, data: &[f32]) {
        self.samples.extend(
            data.iter()
                .map(|&x| (x.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        );
    }
}

/// Meter value in `0.0..=1.0` for a chunk of i16 samples.
pub fn level_i16(input: &[i16]) -> f32 {
    if input.is_empty() {
        return 0.0;
    }
    let sum: f32 = input
        .iter()
        .map(|&s| {
            let v = s as f32 / i16::MAX as f32;
            v * v
        })
        .sum();
    boost((sum / input.len() as f32).sqrt())
}

/// Meter value in `0.0..=1.0` for a chunk of f32 samples.
pub fn level_f32(input: &[f32]) -> f32 {
    if input.is_empty() {
        return 0.0;
    }
    let sum: f32 = input.iter().map(|&s| s * s).sum();
    boost((sum / input.len() as f32).sqrt())
}

fn boost(rms: f32) -> f32 {
    (rms * LEVEL_BOOST).clamp(0.0, 1.0)
}
