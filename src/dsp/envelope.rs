//! Exponential parameter ramps, modelled on Web Audio's
//! `exponentialRampToValueAtTime`.
//!
//! Exponential curves cannot touch zero, so percussive envelopes start and
//! end on [`SILENCE_FLOOR`] rather than 0.

/// Near-zero level used as the start and end of every envelope.
pub const SILENCE_FLOOR: f64 = 0.001;

/// One exponential segment from `from` to `to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpRamp {
    pub from: f64,
    pub to: f64,
    pub duration: f64,
}

impl ExpRamp {
    pub fn new(from: f64, to: f64, duration: f64) -> Self {
        ExpRamp {
            from: from.max(SILENCE_FLOOR),
            to: to.max(SILENCE_FLOOR),
            duration,
        }
    }

    /// Value at `t` seconds into the ramp; holds `to` afterwards.
    pub fn value_at(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.from;
        }
        if self.duration <= 0.0 || t >= self.duration {
            return self.to;
        }
        self.from * (self.to / self.from).powf(t / self.duration)
    }
}

/// Floor → peak → floor gain shape for one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEnvelope {
    attack: ExpRamp,
    decay: ExpRamp,
}

impl HitEnvelope {
    pub fn new(peak: f64, attack: f64, decay: f64) -> Self {
        HitEnvelope {
            attack: ExpRamp::new(SILENCE_FLOOR, peak, attack),
            decay: ExpRamp::new(peak, SILENCE_FLOOR, decay),
        }
    }

    /// Total time until the envelope is back on the floor.
    pub fn length(&self) -> f64 {
        self.attack.duration + self.decay.duration
    }

    pub fn gain_at(&self, t: f64) -> f64 {
        if t < self.attack.duration {
            self.attack.value_at(t)
        } else {
            self.decay.value_at(t - self.attack.duration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_hits_endpoints() {
        let r = ExpRamp::new(1.0, 0.01, 0.5);
        assert_eq!(r.value_at(0.0), 1.0);
        assert_eq!(r.value_at(0.5), 0.01);
        assert_eq!(r.value_at(2.0), 0.01);
        assert!((r.value_at(0.25) - 0.1).abs() < 1e-9, "geometric midpoint");
    }

    #[test]
    fn zero_target_is_clamped_to_floor() {
        let r = ExpRamp::new(1.0, 0.0, 0.1);
        assert_eq!(r.to, SILENCE_FLOOR);
        assert!(r.value_at(0.05).is_finite());
    }

    #[test]
    fn hit_envelope_peaks_after_attack() {
        let env = HitEnvelope::new(0.8, 0.005, 0.2);
        assert!((env.gain_at(0.0) - SILENCE_FLOOR).abs() < 1e-12);
        assert!((env.gain_at(0.005) - 0.8).abs() < 1e-9);
        assert!(env.gain_at(0.1) < 0.8);
        assert!((env.gain_at(env.length()) - SILENCE_FLOOR).abs() < 1e-12);
    }

    #[test]
    fn hit_envelope_never_exceeds_peak() {
        let env = HitEnvelope::new(0.6, 0.002, 0.05);
        for i in 0..1000 {
            let g = env.gain_at(i as f64 * 0.0001);
            assert!(g > 0.0 && g <= 0.6 + 1e-12, "gain {g} at step {i}");
        }
    }
}
