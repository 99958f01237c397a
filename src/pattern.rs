//! Drum pattern — which voices fire on a given step.
//!
//! Hits are a deterministic function of (step, bar, beat level, variation):
//!
//! | voice  | gate                 | steps                                          |
//! |--------|----------------------|------------------------------------------------|
//! | kick   | always               | every 4th, + variation extras (10, 6, 15)      |
//! | hi-hat | level ≥ `KickHat`    | even steps; every step at the top variation    |
//! | snare  | level `KickHatSnare` | 4 and 12; + 15 on every 4th bar at top variation |

use serde::{Deserialize, Serialize};

use crate::progression::BeatLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Kick,
    HiHat,
    Snare,
}

impl Voice {
    pub const ALL: [Voice; 3] = [Voice::Kick, Voice::HiHat, Voice::Snare];
}

/// Subset of {kick, hihat, snare}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceSet {
    pub kick: bool,
    pub hihat: bool,
    pub snare: bool,
}

impl VoiceSet {
    pub fn contains(&self, voice: Voice) -> bool {
        match voice {
            Voice::Kick => self.kick,
            Voice::HiHat => self.hihat,
            Voice::Snare => self.snare,
        }
    }

    pub fn insert(&mut self, voice: Voice) {
        match voice {
            Voice::Kick => self.kick = true,
            Voice::HiHat => self.hihat = true,
            Voice::Snare => self.snare = true,
        }
    }

    pub fn union(self, other: VoiceSet) -> VoiceSet {
        VoiceSet {
            kick: self.kick || other.kick,
            hihat: self.hihat || other.hihat,
            snare: self.snare || other.snare,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.kick || self.hihat || self.snare)
    }

    pub fn iter(self) -> impl Iterator<Item = Voice> {
        Voice::ALL.into_iter().filter(move |v| self.contains(*v))
    }

    /// Kick and snare drive the visual pulse; hi-hats alone do not.
    pub fn is_accent(&self) -> bool {
        self.kick || self.snare
    }
}

/// Extra kick steps unlocked per variation tier, cumulative.
const KICK_EXTRAS: [u32; 3] = [10, 6, 15];
const SNARE_STEPS: [u32; 2] = [4, 12];
const SNARE_FILL_STEP: u32 = 15;
/// The fill plays on the last bar of every group of this many bars.
const SNARE_FILL_BARS: u32 = 4;

pub fn hits_for_step(
    step_index: u32,
    bar_index: u32,
    beat_level: BeatLevel,
    bgm_variation: u32,
    variation_cap: u32,
) -> VoiceSet {
    let top_tier = bgm_variation >= variation_cap;
    let mut hits = VoiceSet::default();

    let extras = (bgm_variation as usize).min(KICK_EXTRAS.len());
    if step_index % 4 == 0 || KICK_EXTRAS[..extras].contains(&step_index) {
        hits.insert(Voice::Kick);
    }

    if beat_level >= BeatLevel::KickHat && (top_tier || step_index % 2 == 0) {
        hits.insert(Voice::HiHat);
    }

    if beat_level == BeatLevel::KickHatSnare {
        let fill = top_tier
            && step_index == SNARE_FILL_STEP
            && bar_index % SNARE_FILL_BARS == SNARE_FILL_BARS - 1;
        if SNARE_STEPS.contains(&step_index) || fill {
            hits.insert(Voice::Snare);
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(level: BeatLevel, variation: u32, bar_index: u32, voice: Voice) -> Vec<u32> {
        (0..16)
            .filter(|&s| hits_for_step(s, bar_index, level, variation, 3).contains(voice))
            .collect()
    }

    #[test]
    fn kick_on_quarters_at_base() {
        assert_eq!(bar(BeatLevel::Kick, 0, 0, Voice::Kick), vec![0, 4, 8, 12]);
    }

    #[test]
    fn kick_gains_syncopation_per_tier() {
        assert_eq!(bar(BeatLevel::Kick, 1, 0, Voice::Kick), vec![0, 4, 8, 10, 12]);
        assert_eq!(bar(BeatLevel::Kick, 2, 0, Voice::Kick), vec![0, 4, 6, 8, 10, 12]);
        assert_eq!(bar(BeatLevel::Kick, 3, 0, Voice::Kick), vec![0, 4, 6, 8, 10, 12, 15]);
    }

    #[test]
    fn hihat_gated_by_level() {
        assert!(bar(BeatLevel::Kick, 3, 0, Voice::HiHat).is_empty());
        assert_eq!(bar(BeatLevel::KickHat, 0, 0, Voice::HiHat).len(), 8);
        assert_eq!(bar(BeatLevel::KickHat, 3, 0, Voice::HiHat).len(), 16);
    }

    #[test]
    fn snare_backbeat_and_fill() {
        assert!(bar(BeatLevel::KickHat, 3, 3, Voice::Snare).is_empty());
        assert_eq!(bar(BeatLevel::KickHatSnare, 2, 3, Voice::Snare), vec![4, 12]);
        assert_eq!(bar(BeatLevel::KickHatSnare, 3, 2, Voice::Snare), vec![4, 12]);
        assert_eq!(bar(BeatLevel::KickHatSnare, 3, 3, Voice::Snare), vec![4, 12, 15]);
        assert_eq!(bar(BeatLevel::KickHatSnare, 3, 7, Voice::Snare), vec![4, 12, 15]);
    }

    #[test]
    fn voice_set_ops() {
        let mut a = VoiceSet::default();
        assert!(a.is_empty());
        a.insert(Voice::HiHat);
        assert!(!a.is_accent());
        let b = VoiceSet {
            snare: true,
            ..Default::default()
        };
        let u = a.union(b);
        assert!(u.is_accent());
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![Voice::HiHat, Voice::Snare]);
    }
}
