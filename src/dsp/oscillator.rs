//! Phase-accumulating oscillators with per-sample frequency control.

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
}

/// Frequency is read each sample, so pitch sweeps stay phase-continuous.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn next_sample(&mut self, frequency: f64) -> f64 {
        let inc = frequency / self.sample_rate;
        let sample = match self.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
        };
        self.phase = (self.phase + inc).fract();
        sample
    }
}

/// Band-limiting correction around a unit step at phase 0.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_starts_at_zero() {
        let mut osc = Oscillator::new(Waveform::Sine, 44100.0);
        assert!(osc.next_sample(440.0).abs() < 1e-10);
    }

    #[test]
    fn waveforms_stay_bounded() {
        for wf in [Waveform::Sine, Waveform::Triangle, Waveform::Square] {
            let mut osc = Oscillator::new(wf, 44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample(330.0);
                assert!(s.abs() <= 1.5, "{wf:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn sweep_keeps_phase_continuous() {
        let mut osc = Oscillator::new(Waveform::Sine, 44100.0);
        let mut prev = osc.next_sample(150.0);
        for i in 0..4410 {
            let f = 150.0 - 100.0 * i as f64 / 4410.0;
            let s = osc.next_sample(f);
            assert!((s - prev).abs() < 0.05, "jump at sample {i}");
            prev = s;
        }
    }
}
