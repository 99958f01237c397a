//! Fixed engine constants and the `DrillConfig` bundle that carries them.

use serde::{Deserialize, Serialize};

use crate::error::DrillError;

// ── Production constants ────────────────────────────────────

pub const TEMPO_BPM: f64 = 120.0;
/// 16th-note resolution.
pub const STEPS_PER_BEAT: u32 = 4;
pub const STEPS_PER_BAR: u32 = 16;
pub const BARS_PER_CYCLE: u32 = 64;
pub const HIHAT_UNLOCK: u32 = 10;
pub const SNARE_UNLOCK: u32 = 20;
pub const BGM_SWITCH_INTERVAL: u32 = 5;
pub const BGM_VARIATION_CAP: u32 = 3;
pub const STAGE_CLEAR_INTERVAL: u32 = 20;
pub const MUTE_WINDOW_STEPS: u32 = 4;
pub const LOOKAHEAD_INTERVAL_MS: f64 = 40.0;
pub const SCHEDULE_HORIZON_S: f64 = 0.15;
/// Offset between `start()` and the first scheduled step.
pub const START_OFFSET_S: f64 = 0.05;

/// Every tunable the engine reads. `Default` is the shipped configuration;
/// the presentation layer only ever sees it read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillConfig {
    pub tempo_bpm: f64,
    pub steps_per_beat: u32,
    pub steps_per_bar: u32,
    pub bars_per_cycle: u32,
    /// In-stage correct answers needed for the hi-hat layer.
    pub hihat_unlock: u32,
    /// In-stage correct answers needed for the snare layer.
    pub snare_unlock: u32,
    pub bgm_switch_interval: u32,
    pub bgm_variation_cap: u32,
    /// Global correct-answer count between stage clears.
    pub stage_clear_interval: u32,
    pub mute_window_steps: u32,
    pub lookahead_interval_ms: f64,
    pub schedule_horizon_s: f64,
    pub start_offset_s: f64,
}

impl Default for DrillConfig {
    fn default() -> Self {
        DrillConfig {
            tempo_bpm: TEMPO_BPM,
            steps_per_beat: STEPS_PER_BEAT,
            steps_per_bar: STEPS_PER_BAR,
            bars_per_cycle: BARS_PER_CYCLE,
            hihat_unlock: HIHAT_UNLOCK,
            snare_unlock: SNARE_UNLOCK,
            bgm_switch_interval: BGM_SWITCH_INTERVAL,
            bgm_variation_cap: BGM_VARIATION_CAP,
            stage_clear_interval: STAGE_CLEAR_INTERVAL,
            mute_window_steps: MUTE_WINDOW_STEPS,
            lookahead_interval_ms: LOOKAHEAD_INTERVAL_MS,
            schedule_horizon_s: SCHEDULE_HORIZON_S,
            start_offset_s: START_OFFSET_S,
        }
    }
}

impl DrillConfig {
    /// Seconds between two consecutive steps.
    pub fn step_duration(&self) -> f64 {
        60.0 / self.tempo_bpm / self.steps_per_beat as f64
    }

    pub fn validate(&self) -> Result<(), DrillError> {
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(DrillError::Config(format!(
                "tempo must be positive, got {}",
                self.tempo_bpm
            )));
        }
        let counts = [
            ("stepsPerBeat", self.steps_per_beat),
            ("stepsPerBar", self.steps_per_bar),
            ("barsPerCycle", self.bars_per_cycle),
            ("bgmSwitchInterval", self.bgm_switch_interval),
            ("stageClearInterval", self.stage_clear_interval),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(DrillError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.hihat_unlock > self.snare_unlock {
            return Err(DrillError::Config(format!(
                "hi-hat threshold {} exceeds snare threshold {}",
                self.hihat_unlock, self.snare_unlock
            )));
        }
        if !(self.lookahead_interval_ms > 0.0) {
            return Err(DrillError::Config("lookahead interval must be positive".into()));
        }
        if !(self.schedule_horizon_s > 0.0) {
            return Err(DrillError::Config("schedule horizon must be positive".into()));
        }
        if self.start_offset_s < 0.0 {
            return Err(DrillError::Config("start offset cannot be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(DrillConfig::default().validate().is_ok());
    }

    #[test]
    fn sixteenth_note_at_120_bpm() {
        let cfg = DrillConfig::default();
        assert!((cfg.step_duration() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_steps_per_bar() {
        let cfg = DrillConfig {
            steps_per_bar: 0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("stepsPerBar"), "{err}");
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = DrillConfig {
            hihat_unlock: 30,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DrillError::Config(_))));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&DrillConfig::default()).unwrap();
        assert!(json.contains("\"stageClearInterval\":20"), "{json}");
        assert!(json.contains("\"muteWindowSteps\":4"), "{json}");
    }
}
