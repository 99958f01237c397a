//! Step sequencer — lookahead scheduler over two clocks.
//!
//! A coarse wall-clock tick ([`TimerKind::Lookahead`]) polls the audio clock
//! and schedules every step boundary that falls inside the horizon. Voice
//! trigger times are always derived from the audio clock, so timer jitter
//! never reaches the audio.
//!
//! Accent hits (kick/snare) also raise a visual pulse. There is at most one
//! pending pulse timer: hits decided before it fires are merged into it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{AudioBackend, OutputState, ResumeOutcome};
use crate::config::DrillConfig;
use crate::dsp::bank::SynthBank;
use crate::error::AudioError;
use crate::pattern::{self, VoiceSet};
use crate::progression::ProgressionTracker;
use crate::timer::{TimerHandle, TimerHost, TimerKind};
use crate::transport::TransportPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Stopped,
    Running,
}

/// A merged visual pulse: audio time of its first hit and every voice that
/// fired while it was pending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub time: f64,
    pub voices: VoiceSet,
}

#[derive(Debug, Clone, Copy)]
struct PendingPulse {
    handle: TimerHandle,
    seq: u64,
    pulse: Pulse,
}

/// Everything a step needs besides the sequencer itself.
pub struct Rig<'a> {
    pub backend: &'a mut dyn AudioBackend,
    pub timers: &'a mut dyn TimerHost,
    pub bank: &'a mut SynthBank,
    pub tracker: &'a mut ProgressionTracker,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// Output was suspended; sequencing begins once the host reports the
    /// resume through [`StepSequencer::on_backend_resumed`].
    AwaitingResume,
    /// No usable output. Game logic carries on without a beat.
    Unavailable(AudioError),
}

#[derive(Debug)]
pub struct StepSequencer {
    config: DrillConfig,
    state: SequencerState,
    transport: TransportPosition,
    next_step_time: f64,
    lookahead: Option<TimerHandle>,
    pending_pulse: Option<PendingPulse>,
    pulse_seq: u64,
    awaiting_resume: bool,
}

impl StepSequencer {
    pub fn new(config: DrillConfig) -> Self {
        StepSequencer {
            config,
            state: SequencerState::Stopped,
            transport: TransportPosition::default(),
            next_step_time: 0.0,
            lookahead: None,
            pending_pulse: None,
            pulse_seq: 0,
            awaiting_resume: false,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SequencerState::Running
    }

    pub fn is_awaiting_resume(&self) -> bool {
        self.awaiting_resume
    }

    pub fn transport(&self) -> TransportPosition {
        self.transport
    }

    /// Audio time of the next step not yet scheduled.
    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    pub fn start(&mut self, rig: Rig<'_>) -> StartOutcome {
        if self.is_running() {
            return StartOutcome::AlreadyRunning;
        }
        match rig.backend.state() {
            OutputState::Running => self.begin(rig),
            OutputState::Closed => {
                let err = AudioError::Unavailable("output is closed".into());
                warn!(%err, "cannot start beat");
                StartOutcome::Unavailable(err)
            }
            OutputState::Suspended => match rig.backend.resume() {
                ResumeOutcome::Resumed => self.begin(rig),
                ResumeOutcome::Pending => {
                    debug!("waiting for audio output to resume");
                    self.awaiting_resume = true;
                    StartOutcome::AwaitingResume
                }
                ResumeOutcome::Failed(err) => {
                    warn!(%err, "audio resume failed");
                    StartOutcome::Unavailable(err)
                }
            },
        }
    }

    /// Completion of a resume issued by [`StepSequencer::start`]. Ignored if
    /// no start is waiting (it was stopped meanwhile, or never requested).
    pub fn on_backend_resumed(&mut self, ok: bool, rig: Rig<'_>) -> Option<StartOutcome> {
        if !std::mem::take(&mut self.awaiting_resume) {
            return None;
        }
        if !ok || rig.backend.state() != OutputState::Running {
            warn!("audio resume rejected, beat stays off");
            return Some(StartOutcome::Unavailable(AudioError::Blocked(
                "resume rejected".into(),
            )));
        }
        Some(self.begin(rig))
    }

    fn begin(&mut self, rig: Rig<'_>) -> StartOutcome {
        let handle = match rig
            .timers
            .set_interval(TimerKind::Lookahead, self.config.lookahead_interval_ms)
        {
            Ok(h) => h,
            Err(err) => {
                warn!(%err, "cannot arm lookahead timer");
                return StartOutcome::Unavailable(err);
            }
        };
        self.lookahead = Some(handle);
        self.state = SequencerState::Running;
        self.transport.reset();
        self.next_step_time = rig.backend.current_time() + self.config.start_offset_s;
        info!(at = self.next_step_time, "beat started");
        self.on_lookahead(rig);
        StartOutcome::Started
    }

    /// Cancel the lookahead tick and any pending pulse. Audio already handed
    /// to the backend rings out.
    pub fn stop(&mut self, timers: &mut dyn TimerHost) {
        self.awaiting_resume = false;
        if !self.is_running() {
            return;
        }
        if let Some(handle) = self.lookahead.take() {
            timers.clear(handle);
        }
        if let Some(pending) = self.pending_pulse.take() {
            timers.clear(pending.handle);
        }
        self.state = SequencerState::Stopped;
        info!("beat stopped");
    }

    /// One lookahead tick: schedule every step boundary inside the horizon.
    pub fn on_lookahead(&mut self, mut rig: Rig<'_>) {
        if !self.is_running() {
            return;
        }
        let now = rig.backend.current_time();
        let step = self.config.step_duration();
        if self.next_step_time < now - step {
            debug!(
                behind = now - self.next_step_time,
                "scheduler fell behind, resyncing"
            );
            self.next_step_time = now;
        }
        while self.next_step_time < now + self.config.schedule_horizon_s {
            self.schedule_step(self.next_step_time, &mut rig);
            self.next_step_time += step;
        }
    }

    /// Decide and trigger the hits for the current step at `time`, then
    /// advance the transport. Audio failures are logged and skipped.
    pub fn schedule_step(&mut self, time: f64, rig: &mut Rig<'_>) -> VoiceSet {
        if rig.tracker.consume_mute_step() {
            debug!(step = self.transport.step_index, "muted step");
            self.advance();
            return VoiceSet::default();
        }

        let st = rig.tracker.state();
        let hits = pattern::hits_for_step(
            self.transport.step_index,
            self.transport.bar_index,
            st.beat_level,
            st.bgm_variation,
            self.config.bgm_variation_cap,
        );

        for voice in hits.iter() {
            if let Err(err) = rig.bank.trigger(voice.into(), time, &mut *rig.backend) {
                debug!(%err, ?voice, "voice dropped");
            }
        }
        if hits.is_accent() {
            self.queue_pulse(time, hits, rig.backend.current_time(), &mut *rig.timers);
        }

        self.advance();
        hits
    }

    fn advance(&mut self) {
        self.transport
            .advance(self.config.steps_per_bar, self.config.bars_per_cycle);
    }

    fn queue_pulse(&mut self, time: f64, voices: VoiceSet, now: f64, timers: &mut dyn TimerHost) {
        if let Some(pending) = &mut self.pending_pulse {
            pending.pulse.voices = pending.pulse.voices.union(voices);
            return;
        }
        self.pulse_seq += 1;
        let seq = self.pulse_seq;
        let delay_ms = ((time - now) * 1000.0).max(0.0);
        match timers.set_timeout(TimerKind::Pulse { seq }, delay_ms) {
            Ok(handle) => {
                self.pending_pulse = Some(PendingPulse {
                    handle,
                    seq,
                    pulse: Pulse { time, voices },
                })
            }
            Err(err) => debug!(%err, "pulse timer dropped"),
        }
    }

    /// The pulse timer `seq` fired. Returns the merged pulse to deliver, or
    /// `None` if it is stale or the sequencer has stopped.
    pub fn on_pulse_due(&mut self, seq: u64) -> Option<Pulse> {
        match self.pending_pulse {
            Some(pending) if pending.seq == seq => {
                self.pending_pulse = None;
                self.is_running().then_some(pending.pulse)
            }
            _ => None,
        }
    }

    /// Back to step 0 of bar 0. Only affects future step decisions.
    pub fn reset_transport(&mut self) {
        self.transport.reset();
    }
}
