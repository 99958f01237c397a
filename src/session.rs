//! Drill session — the object the presentation layer talks to.
//!
//! Owns the progression tracker, the step sequencer, the synth bank and the
//! host backends, and turns answer events into tracker transitions,
//! transport resets, feedback sounds and queued [`Notification`]s.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arith::{self, Problem};
use crate::backend::{AudioBackend, OfflineBackend, OutputState, ResumeOutcome};
use crate::config::DrillConfig;
use crate::dsp::bank::{Sound, SynthBank};
use crate::error::DrillError;
use crate::pattern::VoiceSet;
use crate::progression::{BeatLevel, ProgressionEvent, ProgressionTracker};
use crate::sequencer::{Rig, StartOutcome, StepSequencer};
use crate::timer::{ManualTimers, TimerHost, TimerKind};

/// Core → presentation messages, serialised as `{type, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    StageClear { stage: u32 },
    BgmSwitch { variation: u32 },
    Wrong,
    Pulse { time: f64, voices: VoiceSet },
}

impl From<ProgressionEvent> for Notification {
    fn from(event: ProgressionEvent) -> Self {
        match event {
            ProgressionEvent::StageClear { stage } => Notification::StageClear { stage },
            ProgressionEvent::BgmSwitch { variation } => Notification::BgmSwitch { variation },
            ProgressionEvent::Wrong => Notification::Wrong,
        }
    }
}

/// Read-only snapshot for the stats panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub correct_total: u32,
    pub best_total: u32,
    pub stage: u32,
    pub stage_correct: u32,
    pub beat_level: BeatLevel,
    pub bgm_variation: u32,
    pub mute_steps_remaining: u32,
    pub beat_running: bool,
    pub sfx_enabled: bool,
}

pub struct DrillSession<B, T> {
    config: DrillConfig,
    tracker: ProgressionTracker,
    sequencer: StepSequencer,
    bank: SynthBank,
    backend: B,
    timers: T,
    rng: StdRng,
    problem: Problem,
    best_total: u32,
    sfx_enabled: bool,
    resume_requested: bool,
    notifications: Vec<Notification>,
}

impl<B: AudioBackend, T: TimerHost> DrillSession<B, T> {
    pub fn new(backend: B, timers: T) -> Self {
        Self::build(DrillConfig::default(), backend, timers, None)
    }

    /// Session with a custom configuration. `seed` makes problems and drum
    /// noise reproducible.
    pub fn with_config(
        config: DrillConfig,
        backend: B,
        timers: T,
        seed: Option<u64>,
    ) -> Result<Self, DrillError> {
        config.validate()?;
        Ok(Self::build(config, backend, timers, seed))
    }

    fn build(config: DrillConfig, backend: B, timers: T, seed: Option<u64>) -> Self {
        let (mut rng, bank) = match seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                SynthBank::with_seed(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), SynthBank::new()),
        };
        let tracker = ProgressionTracker::new(config.clone());
        let problem = arith::generate(tracker.profile(), &mut rng);
        DrillSession {
            sequencer: StepSequencer::new(config.clone()),
            config,
            tracker,
            bank,
            backend,
            timers,
            rng,
            problem,
            best_total: 0,
            sfx_enabled: true,
            resume_requested: false,
            notifications: Vec::new(),
        }
    }

    fn split(&mut self) -> (&mut StepSequencer, Rig<'_>) {
        (
            &mut self.sequencer,
            Rig {
                backend: &mut self.backend,
                timers: &mut self.timers,
                bank: &mut self.bank,
                tracker: &mut self.tracker,
            },
        )
    }

    pub fn config(&self) -> &DrillConfig {
        &self.config
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn next_problem(&mut self) -> &Problem {
        self.problem = arith::generate(self.tracker.profile(), &mut self.rng);
        &self.problem
    }

    pub fn stats(&self) -> SessionStats {
        let st = self.tracker.state();
        SessionStats {
            correct_total: st.correct_total,
            best_total: self.best_total,
            stage: st.difficulty_stage,
            stage_correct: st.stage_correct,
            beat_level: st.beat_level,
            bgm_variation: st.bgm_variation,
            mute_steps_remaining: st.mute_steps_remaining,
            beat_running: self.sequencer.is_running(),
            sfx_enabled: self.sfx_enabled,
        }
    }

    pub fn is_beat_running(&self) -> bool {
        self.sequencer.is_running()
    }

    pub fn sfx_enabled(&self) -> bool {
        self.sfx_enabled
    }

    /// Judge `input` against the current problem, apply the result and draw
    /// the next problem. Returns whether the answer was correct.
    ///
    /// Empty or non-numeric input is rejected with no state change.
    pub fn submit_answer(&mut self, input: &str) -> Result<bool, DrillError> {
        let correct = self.problem.check(input)?;
        if correct {
            self.on_correct_answer();
        } else {
            self.on_wrong_answer();
        }
        self.next_problem();
        Ok(correct)
    }

    pub fn on_correct_answer(&mut self) {
        let events = self.tracker.on_correct();
        self.best_total = self.best_total.max(self.tracker.state().correct_total);
        self.play_sfx(Sound::Correct);
        for event in events {
            self.sequencer.reset_transport();
            self.notifications.push(event.into());
        }
    }

    /// A mute window only opens while the beat is audible and SFX are on.
    pub fn on_wrong_answer(&mut self) {
        let mute = self.sequencer.is_running() && self.sfx_enabled;
        let event = self.tracker.on_wrong(mute);
        self.sequencer.reset_transport();
        self.play_sfx(Sound::Wrong);
        self.notifications.push(event.into());
    }

    pub fn on_user_requests_reset(&mut self) {
        self.tracker.reset();
        self.sequencer.reset_transport();
        self.next_problem();
        info!("session reset");
    }

    /// Start or stop the beat. Returns `true` if the beat is now on or
    /// waiting for the output to resume.
    pub fn on_toggle_beat(&mut self) -> bool {
        if self.sequencer.is_running() || self.sequencer.is_awaiting_resume() {
            self.stop_beat();
            return false;
        }
        let (seq, rig) = self.split();
        match seq.start(rig) {
            StartOutcome::Started
            | StartOutcome::AlreadyRunning
            | StartOutcome::AwaitingResume => true,
            StartOutcome::Unavailable(err) => {
                debug!(%err, "beat unavailable, continuing silently");
                false
            }
        }
    }

    /// Stop the beat if it is running or waiting to start.
    pub fn stop_beat(&mut self) {
        self.sequencer.stop(&mut self.timers);
    }

    pub fn on_toggle_sfx(&mut self) -> bool {
        self.sfx_enabled = !self.sfx_enabled;
        self.sfx_enabled
    }

    pub fn set_sfx_enabled(&mut self, enabled: bool) {
        self.sfx_enabled = enabled;
    }

    /// Dispatch a fired timer.
    pub fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Lookahead => {
                let (seq, rig) = self.split();
                seq.on_lookahead(rig);
            }
            TimerKind::Pulse { seq } => {
                if let Some(pulse) = self.sequencer.on_pulse_due(seq) {
                    self.notifications.push(Notification::Pulse {
                        time: pulse.time,
                        voices: pulse.voices,
                    });
                }
            }
        }
    }

    /// The host finished a resume requested earlier.
    pub fn on_backend_resumed(&mut self, ok: bool) {
        self.resume_requested = false;
        let (seq, rig) = self.split();
        if let Some(StartOutcome::Unavailable(err)) = seq.on_backend_resumed(ok, rig) {
            debug!(%err, "beat unavailable after resume");
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    /// Feedback sounds are best effort: skipped when muted or when the
    /// output cannot run right now.
    fn play_sfx(&mut self, sound: Sound) {
        if !self.sfx_enabled {
            return;
        }
        let ready = match self.backend.state() {
            OutputState::Running => {
                self.resume_requested = false;
                true
            }
            OutputState::Suspended if self.resume_requested => false,
            OutputState::Suspended => match self.backend.resume() {
                ResumeOutcome::Resumed => true,
                ResumeOutcome::Pending => {
                    self.resume_requested = true;
                    false
                }
                ResumeOutcome::Failed(_) => false,
            },
            OutputState::Closed => false,
        };
        if !ready {
            debug!(?sound, "sfx skipped, output not running");
            return;
        }
        let at = self.backend.current_time();
        if let Err(err) = self.bank.trigger(sound, at, &mut self.backend) {
            debug!(%err, ?sound, "sfx dropped");
        }
    }
}

impl DrillSession<OfflineBackend, ManualTimers> {
    /// Advance both clocks by `ms`, firing every timer that comes due. The
    /// audio clock tracks the timer clock one-to-one.
    pub fn run_for(&mut self, ms: f64) {
        let until = self.timers.now_ms() + ms;
        while let Some(kind) = self.timers.fire_next(until) {
            self.backend.set_time(self.timers.now_ms() / 1000.0);
            self.on_timer(kind);
        }
        self.timers.advance_to(until);
        self.backend.set_time(until / 1000.0);
    }
}
