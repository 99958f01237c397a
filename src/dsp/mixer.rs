//! Timeline mixer — sums scheduled buffers at sample offsets.

#[derive(Debug, Clone, Default)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            master_gain: 0.8,
            buffer: Vec::new(),
        }
    }

    /// Add `samples` starting at frame `offset`, growing the timeline as needed.
    pub fn mix_at(&mut self, offset: usize, samples: &[f32]) {
        let end = offset + samples.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0.0);
        }
        for (dst, &s) in self.buffer[offset..end].iter_mut().zip(samples) {
            *dst += s as f64;
        }
    }

    /// Mixed timeline with master gain and soft clipping applied.
    pub fn output(&self) -> Vec<f64> {
        self.buffer
            .iter()
            .map(|&s| soft_clip(s * self.master_gain))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
