//! Wall-clock timers.
//!
//! The sequencer needs a repeating lookahead tick and one-shot pulse timers.
//! A [`TimerHost`] arms them; when one fires the host hands its
//! [`TimerKind`] back to `DrillSession::on_timer`.

use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Lookahead,
    /// Visual pulse; `seq` identifies which pending pulse armed it.
    Pulse { seq: u64 },
}

pub trait TimerHost {
    fn set_interval(&mut self, kind: TimerKind, period_ms: f64) -> Result<TimerHandle, AudioError>;
    fn set_timeout(&mut self, kind: TimerKind, delay_ms: f64) -> Result<TimerHandle, AudioError>;
    /// Cancelling an unknown or already-fired handle is a no-op.
    fn clear(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone)]
struct ManualTimer {
    handle: TimerHandle,
    kind: TimerKind,
    due_ms: f64,
    period_ms: Option<f64>,
}

/// Deterministic timer host driven by explicit clock advances.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    now_ms: f64,
    next_id: i32,
    timers: Vec<ManualTimer>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn has_pending_pulse(&self) -> bool {
        self.timers
            .iter()
            .any(|t| matches!(t.kind, TimerKind::Pulse { .. }))
    }

    /// Fire the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time. Intervals re-arm; timeouts are removed.
    pub fn fire_next(&mut self, until_ms: f64) -> Option<TimerKind> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms))
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        self.now_ms = self.now_ms.max(timer.due_ms);
        let kind = timer.kind;
        match timer.period_ms {
            Some(period) => timer.due_ms += period,
            None => {
                self.timers.remove(idx);
            }
        }
        Some(kind)
    }

    pub fn advance_to(&mut self, ms: f64) {
        self.now_ms = self.now_ms.max(ms);
    }

    fn arm(&mut self, kind: TimerKind, delay_ms: f64, period_ms: Option<f64>) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.push(ManualTimer {
            handle,
            kind,
            due_ms: self.now_ms + delay_ms.max(0.0),
            period_ms,
        });
        handle
    }
}

impl TimerHost for ManualTimers {
    fn set_interval(&mut self, kind: TimerKind, period_ms: f64) -> Result<TimerHandle, AudioError> {
        if !(period_ms > 0.0) {
            return Err(AudioError::Timer(format!("invalid interval {period_ms}ms")));
        }
        Ok(self.arm(kind, period_ms, Some(period_ms)))
    }

    fn set_timeout(&mut self, kind: TimerKind, delay_ms: f64) -> Result<TimerHandle, AudioError> {
        Ok(self.arm(kind, delay_ms, None))
    }

    fn clear(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_repeats() {
        let mut timers = ManualTimers::new();
        timers.set_interval(TimerKind::Lookahead, 40.0).unwrap();
        let mut fired = 0;
        while timers.fire_next(200.0).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 5);
        assert_eq!(timers.now_ms(), 200.0);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn timeout_fires_once_in_due_order() {
        let mut timers = ManualTimers::new();
        timers.set_interval(TimerKind::Lookahead, 40.0).unwrap();
        timers.set_timeout(TimerKind::Pulse { seq: 1 }, 30.0).unwrap();
        assert_eq!(timers.fire_next(100.0), Some(TimerKind::Pulse { seq: 1 }));
        assert_eq!(timers.fire_next(100.0), Some(TimerKind::Lookahead));
        assert!(!timers.has_pending_pulse());
    }

    #[test]
    fn cleared_timer_never_fires() {
        let mut timers = ManualTimers::new();
        let h = timers.set_timeout(TimerKind::Pulse { seq: 7 }, 10.0).unwrap();
        timers.clear(h);
        assert_eq!(timers.fire_next(1000.0), None);
        timers.clear(h);
    }

    #[test]
    fn rejects_zero_interval() {
        let mut timers = ManualTimers::new();
        assert!(timers.set_interval(TimerKind::Lookahead, 0.0).is_err());
    }
}
