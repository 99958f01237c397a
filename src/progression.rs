//! Progression tracker — maps the stream of answer results to difficulty
//! stage, percussion layering and BGM variation.
//!
//! All transitions are total over non-negative counters. The tracker is the
//! only writer of `ProgressionState`; the sequencer consumes mute steps
//! through [`ProgressionTracker::consume_mute_step`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::arith::DifficultyProfile;
use crate::config::DrillConfig;

/// Percussion layering tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeatLevel {
    Kick,
    KickHat,
    KickHatSnare,
}

impl BeatLevel {
    /// Step function of the in-stage correct count: two thresholds.
    pub fn for_stage_correct(stage_correct: u32, config: &DrillConfig) -> Self {
        if stage_correct >= config.snare_unlock {
            BeatLevel::KickHatSnare
        } else if stage_correct >= config.hihat_unlock {
            BeatLevel::KickHat
        } else {
            BeatLevel::Kick
        }
    }
}

/// `min(floor(stage_correct / interval), cap)`.
pub fn bgm_variation_for(stage_correct: u32, config: &DrillConfig) -> u32 {
    (stage_correct / config.bgm_switch_interval).min(config.bgm_variation_cap)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub correct_total: u32,
    pub stage_correct: u32,
    pub difficulty_stage: u32,
    pub beat_level: BeatLevel,
    pub bgm_variation: u32,
    pub mute_steps_remaining: u32,
}

impl Default for ProgressionState {
    fn default() -> Self {
        ProgressionState {
            correct_total: 0,
            stage_correct: 0,
            difficulty_stage: 0,
            beat_level: BeatLevel::Kick,
            bgm_variation: 0,
            mute_steps_remaining: 0,
        }
    }
}

/// Transition events. Each one also means "reset the transport".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressionEvent {
    BgmSwitch { variation: u32 },
    StageClear { stage: u32 },
    Wrong,
}

#[derive(Debug, Clone)]
pub struct ProgressionTracker {
    config: DrillConfig,
    state: ProgressionState,
    profile: DifficultyProfile,
}

impl ProgressionTracker {
    pub fn new(config: DrillConfig) -> Self {
        ProgressionTracker {
            config,
            state: ProgressionState::default(),
            profile: DifficultyProfile::for_stage(0),
        }
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn on_correct(&mut self) -> Vec<ProgressionEvent> {
        let mut events = Vec::new();
        let st = &mut self.state;
        st.correct_total += 1;
        st.stage_correct += 1;
        st.beat_level = BeatLevel::for_stage_correct(st.stage_correct, &self.config);

        let variation = bgm_variation_for(st.stage_correct, &self.config);
        if variation != st.bgm_variation {
            st.bgm_variation = variation;
            info!(variation, "bgm switch");
            events.push(ProgressionEvent::BgmSwitch { variation });
        }

        if st.correct_total % self.config.stage_clear_interval == 0 {
            events.push(self.stage_clear());
        }
        events
    }

    /// Advance one difficulty stage and drop the beat back to its first tier.
    pub fn stage_clear(&mut self) -> ProgressionEvent {
        let st = &mut self.state;
        st.difficulty_stage += 1;
        st.stage_correct = 0;
        st.beat_level = BeatLevel::Kick;
        st.bgm_variation = 0;
        self.profile = DifficultyProfile::for_stage(st.difficulty_stage);
        info!(stage = st.difficulty_stage, "stage clear");
        ProgressionEvent::StageClear {
            stage: st.difficulty_stage,
        }
    }

    /// Reset everything but the mute window, then open a fresh mute window
    /// when `mute_beat` is set.
    pub fn on_wrong(&mut self, mute_beat: bool) -> ProgressionEvent {
        let mute = self.state.mute_steps_remaining;
        self.state = ProgressionState {
            mute_steps_remaining: mute,
            ..ProgressionState::default()
        };
        self.profile = DifficultyProfile::for_stage(0);
        if mute_beat {
            self.state.mute_steps_remaining = self.config.mute_window_steps;
        }
        ProgressionEvent::Wrong
    }

    /// Explicit user reset: back to the session-start state.
    pub fn reset(&mut self) {
        self.state = ProgressionState::default();
        self.profile = DifficultyProfile::for_stage(0);
    }

    /// Spend one step of the mute window. Returns `true` if the step must
    /// stay silent.
    pub fn consume_mute_step(&mut self) -> bool {
        if self.state.mute_steps_remaining > 0 {
            self.state.mute_steps_remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ProgressionTracker {
        ProgressionTracker::new(DrillConfig::default())
    }

    #[test]
    fn beat_level_is_monotonic_step_function() {
        let cfg = DrillConfig::default();
        let mut prev = BeatLevel::Kick;
        let mut changes = 0;
        for n in 0..100 {
            let level = BeatLevel::for_stage_correct(n, &cfg);
            assert!(level >= prev);
            if level != prev {
                changes += 1;
            }
            prev = level;
        }
        assert_eq!(changes, 2);
    }

    #[test]
    fn layer_unlock_thresholds() {
        let cfg = DrillConfig::default();
        assert_eq!(BeatLevel::for_stage_correct(0, &cfg), BeatLevel::Kick);
        assert_eq!(BeatLevel::for_stage_correct(9, &cfg), BeatLevel::Kick);
        assert_eq!(BeatLevel::for_stage_correct(10, &cfg), BeatLevel::KickHat);
        assert_eq!(BeatLevel::for_stage_correct(19, &cfg), BeatLevel::KickHat);
        assert_eq!(BeatLevel::for_stage_correct(20, &cfg), BeatLevel::KickHatSnare);
    }

    #[test]
    fn hihat_unlocks_on_tenth_correct() {
        let mut t = tracker();
        for _ in 0..9 {
            t.on_correct();
        }
        assert_eq!(t.state().beat_level, BeatLevel::Kick);
        t.on_correct();
        assert_eq!(t.state().beat_level, BeatLevel::KickHat);
    }

    #[test]
    fn bgm_switch_every_five_until_cap() {
        let mut t = tracker();
        let mut switches = Vec::new();
        for _ in 0..19 {
            for e in t.on_correct() {
                if let ProgressionEvent::BgmSwitch { variation } = e {
                    switches.push(variation);
                }
            }
        }
        assert_eq!(switches, vec![1, 2, 3]);
        assert_eq!(t.state().bgm_variation, 3);
    }

    #[test]
    fn stage_clear_fires_at_interval() {
        let mut t = tracker();
        for n in 1..=60u32 {
            let events = t.on_correct();
            let cleared = events
                .iter()
                .any(|e| matches!(e, ProgressionEvent::StageClear { .. }));
            assert_eq!(cleared, n % 20 == 0, "correct #{n}");
        }
        assert_eq!(t.state().difficulty_stage, 3);
    }

    #[test]
    fn twentieth_correct_clears_stage() {
        let mut t = tracker();
        for _ in 0..19 {
            t.on_correct();
        }
        let events = t.on_correct();
        assert_eq!(events, vec![ProgressionEvent::StageClear { stage: 1 }]);
        let st = t.state();
        assert_eq!(st.difficulty_stage, 1);
        assert_eq!(st.stage_correct, 0);
        assert_eq!(st.beat_level, BeatLevel::Kick);
        assert_eq!(st.bgm_variation, 0);
        assert_eq!(st.correct_total, 20);
        assert_eq!(t.profile(), &DifficultyProfile::for_stage(1));
    }

    #[test]
    fn wrong_resets_everything() {
        let mut t = tracker();
        for _ in 0..47 {
            t.on_correct();
        }
        assert_eq!(t.state().difficulty_stage, 2);
        assert_eq!(t.on_wrong(false), ProgressionEvent::Wrong);
        assert_eq!(t.state(), &ProgressionState::default());
        assert_eq!(t.profile(), &DifficultyProfile::for_stage(0));
    }

    #[test]
    fn wrong_opens_mute_window_when_requested() {
        let mut t = tracker();
        t.on_wrong(true);
        assert_eq!(t.state().mute_steps_remaining, 4);
        let silent: Vec<bool> = (0..6).map(|_| t.consume_mute_step()).collect();
        assert_eq!(silent, vec![true, true, true, true, false, false]);
    }

    #[test]
    fn wrong_without_mute_keeps_running_window() {
        let mut t = tracker();
        t.on_wrong(true);
        t.consume_mute_step();
        t.on_wrong(false);
        assert_eq!(t.state().mute_steps_remaining, 3);
    }
}
