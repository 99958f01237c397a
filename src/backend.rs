//! Audio output abstraction.
//!
//! The sequencer and synth bank only talk to [`AudioBackend`]: a sample
//! clock, a lifecycle state and "play this buffer at time t". The browser
//! implementation lives in `web`; [`OfflineBackend`] mixes into memory for
//! native use, previews and tests.

use serde::{Deserialize, Serialize};

use crate::dsp::mixer::Mixer;
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    Running,
    Suspended,
    Closed,
}

/// Result of asking a suspended output to resume.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// Running again already.
    Resumed,
    /// Completion will be reported later through
    /// `DrillSession::on_backend_resumed`.
    Pending,
    Failed(AudioError),
}

pub trait AudioBackend {
    fn state(&self) -> OutputState;
    /// Audio clock in seconds. Monotonic while running.
    fn current_time(&self) -> f64;
    fn sample_rate(&self) -> f64;
    /// Ask a suspended output to run. While an earlier request is still in
    /// flight this returns `Pending` without issuing another one.
    fn resume(&mut self) -> ResumeOutcome;
    /// Schedule mono `samples` to start at `at` on the audio clock. Once
    /// scheduled a buffer always plays out.
    fn play(&mut self, samples: &[f32], at: f64) -> Result<(), AudioError>;
}

/// Record of one buffer handed to an [`OfflineBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedBuffer {
    pub at: f64,
    pub frames: usize,
}

/// In-memory backend with a manually advanced clock.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: f64,
    time: f64,
    state: OutputState,
    resume_pending: bool,
    resume_requests: u32,
    mixer: Mixer,
    played: Vec<PlayedBuffer>,
}

impl OfflineBackend {
    pub fn new(sample_rate: f64) -> Self {
        OfflineBackend {
            sample_rate,
            time: 0.0,
            state: OutputState::Running,
            resume_pending: false,
            resume_requests: 0,
            mixer: Mixer::new(),
            played: Vec::new(),
        }
    }

    /// Starts suspended, like a browser context created before any user
    /// gesture. `resume()` then reports `Pending` until
    /// [`OfflineBackend::complete_resume`] is called.
    pub fn suspended(sample_rate: f64) -> Self {
        OfflineBackend {
            state: OutputState::Suspended,
            ..Self::new(sample_rate)
        }
    }

    pub fn complete_resume(&mut self, ok: bool) {
        if self.resume_pending {
            self.resume_pending = false;
            if ok {
                self.state = OutputState::Running;
            }
        }
    }

    /// Resume requests actually issued to the output.
    pub fn resume_requests(&self) -> u32 {
        self.resume_requests
    }

    pub fn close(&mut self) {
        self.state = OutputState::Closed;
    }

    pub fn set_time(&mut self, seconds: f64) {
        self.time = seconds.max(self.time);
    }

    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds.max(0.0);
    }

    pub fn played(&self) -> &[PlayedBuffer] {
        &self.played
    }

    /// Everything scheduled so far, mixed and soft-clipped.
    pub fn mixdown(&self) -> Vec<f64> {
        self.mixer.output()
    }
}

impl AudioBackend for OfflineBackend {
    fn state(&self) -> OutputState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn resume(&mut self) -> ResumeOutcome {
        match self.state {
            OutputState::Running => ResumeOutcome::Resumed,
            OutputState::Closed => {
                ResumeOutcome::Failed(AudioError::Unavailable("output is closed".into()))
            }
            OutputState::Suspended => {
                if !self.resume_pending {
                    self.resume_pending = true;
                    self.resume_requests += 1;
                }
                ResumeOutcome::Pending
            }
        }
    }

    fn play(&mut self, samples: &[f32], at: f64) -> Result<(), AudioError> {
        if self.state == OutputState::Closed {
            return Err(AudioError::Unavailable("output is closed".into()));
        }
        // Late buffers start immediately, as Web Audio does.
        let offset = (at.max(self.time) * self.sample_rate).round() as usize;
        self.mixer.mix_at(offset, samples);
        self.played.push(PlayedBuffer {
            at,
            frames: samples.len(),
        });
        Ok(())
    }
}
