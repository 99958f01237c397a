//! Synthesizer bank — procedural percussion and answer-feedback sounds.
//!
//! Every sound is rendered from oscillators, filtered white noise and
//! exponential envelopes; nothing is decoded from sample files. A call
//! renders one hit and hands it to the backend at an absolute audio time.
//! The voice definitions below are fixed at compile time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::AudioBackend;
use crate::error::AudioError;
use crate::pattern::Voice;

use super::envelope::{ExpRamp, HitEnvelope};
use super::filter::{Biquad, FilterType};
use super::oscillator::{Oscillator, Waveform};

/// Everything the bank can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Kick,
    HiHat,
    Snare,
    /// Rising two-note chime after a correct answer.
    Correct,
    /// Low falling buzz after a wrong answer.
    Wrong,
}

impl From<Voice> for Sound {
    fn from(voice: Voice) -> Self {
        match voice {
            Voice::Kick => Sound::Kick,
            Voice::HiHat => Sound::HiHat,
            Voice::Snare => Sound::Snare,
        }
    }
}

pub struct SynthBank {
    rng: StdRng,
}

impl SynthBank {
    pub fn new() -> Self {
        SynthBank {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible noise, for tests and offline renders.
    pub fn with_seed(seed: u64) -> Self {
        SynthBank {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Render one hit of `sound` as mono samples.
    pub fn render(&mut self, sound: Sound, sample_rate: f64) -> Vec<f32> {
        match sound {
            Sound::Kick => kick(sample_rate),
            Sound::HiHat => hihat(sample_rate, &mut self.rng),
            Sound::Snare => snare(sample_rate, &mut self.rng),
            Sound::Correct => correct_chime(sample_rate),
            Sound::Wrong => wrong_buzz(sample_rate),
        }
    }

    /// Render `sound` and schedule it on `backend` at `time` (audio clock).
    pub fn trigger(
        &mut self,
        sound: Sound,
        time: f64,
        backend: &mut dyn AudioBackend,
    ) -> Result<(), AudioError> {
        let samples = self.render(sound, backend.sample_rate());
        backend.play(&samples, time)
    }
}

impl Default for SynthBank {
    fn default() -> Self {
        Self::new()
    }
}

fn frames(seconds: f64, sample_rate: f64) -> usize {
    (seconds * sample_rate).ceil() as usize
}

/// Sine with a fast downward pitch sweep.
fn kick(sr: f64) -> Vec<f32> {
    let pitch = ExpRamp::new(150.0, 45.0, 0.12);
    let env = HitEnvelope::new(1.0, 0.004, 0.35);
    let mut osc = Oscillator::new(Waveform::Sine, sr);
    (0..frames(env.length(), sr))
        .map(|i| {
            let t = i as f64 / sr;
            (osc.next_sample(pitch.value_at(t)) * env.gain_at(t)) as f32
        })
        .collect()
}

/// Short burst of high-passed noise.
fn hihat(sr: f64, rng: &mut StdRng) -> Vec<f32> {
    let env = HitEnvelope::new(0.35, 0.002, 0.05);
    let mut hp = Biquad::new(FilterType::Highpass, 7000.0, 0.7, sr);
    (0..frames(env.length(), sr))
        .map(|i| {
            let t = i as f64 / sr;
            let noise = rng.gen_range(-1.0..1.0);
            (hp.process(noise) * env.gain_at(t)) as f32
        })
        .collect()
}

/// Band-passed noise over a triangle body.
fn snare(sr: f64, rng: &mut StdRng) -> Vec<f32> {
    let noise_env = HitEnvelope::new(0.6, 0.002, 0.18);
    let body_env = HitEnvelope::new(0.5, 0.002, 0.1);
    let mut bp = Biquad::new(FilterType::Bandpass, 1800.0, 0.8, sr);
    let mut body = Oscillator::new(Waveform::Triangle, sr);
    let len = noise_env.length().max(body_env.length());
    (0..frames(len, sr))
        .map(|i| {
            let t = i as f64 / sr;
            let snap = bp.process(rng.gen_range(-1.0..1.0)) * noise_env.gain_at(t);
            let tone = body.next_sample(180.0) * body_env.gain_at(t);
            (snap + tone) as f32
        })
        .collect()
}

fn correct_chime(sr: f64) -> Vec<f32> {
    const SECOND_NOTE_AT: f64 = 0.07;
    let first = HitEnvelope::new(0.3, 0.005, 0.12);
    let second = HitEnvelope::new(0.3, 0.005, 0.18);
    let mut low = Oscillator::new(Waveform::Sine, sr);
    let mut high = Oscillator::new(Waveform::Sine, sr);
    let len = first.length().max(SECOND_NOTE_AT + second.length());
    (0..frames(len, sr))
        .map(|i| {
            let t = i as f64 / sr;
            let mut s = 0.0;
            if t <= first.length() {
                s += low.next_sample(880.0) * first.gain_at(t);
            }
            if t >= SECOND_NOTE_AT {
                s += high.next_sample(1320.0) * second.gain_at(t - SECOND_NOTE_AT);
            }
            s as f32
        })
        .collect()
}

fn wrong_buzz(sr: f64) -> Vec<f32> {
    let pitch = ExpRamp::new(140.0, 90.0, 0.25);
    let env = HitEnvelope::new(0.35, 0.01, 0.25);
    let mut osc = Oscillator::new(Waveform::Square, sr);
    let mut lp = Biquad::new(FilterType::Lowpass, 900.0, 0.707, sr);
    (0..frames(env.length(), sr))
        .map(|i| {
            let t = i as f64 / sr;
            (lp.process(osc.next_sample(pitch.value_at(t))) * env.gain_at(t)) as f32
        })
        .collect()
}
