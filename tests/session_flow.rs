use approx::assert_abs_diff_eq;
use beatdrill_core::backend::{AudioBackend, OfflineBackend};
use beatdrill_core::progression::BeatLevel;
use beatdrill_core::timer::ManualTimers;
use beatdrill_core::{DrillConfig, DrillSession, Notification};

type Session = DrillSession<OfflineBackend, ManualTimers>;

fn session(config: DrillConfig) -> Session {
    DrillSession::with_config(config, OfflineBackend::new(8000.0), ManualTimers::new(), Some(7))
        .unwrap()
}

fn answer_correctly(s: &mut Session) {
    let input = s.problem().answer.to_string();
    assert!(s.submit_answer(&input).unwrap());
}

fn pulses(notes: &[Notification]) -> Vec<f64> {
    notes
        .iter()
        .filter_map(|n| match n {
            Notification::Pulse { time, .. } => Some(*time),
            _ => None,
        })
        .collect()
}

#[test]
fn layers_unlock_while_the_beat_plays() {
    let mut s = session(DrillConfig::default());
    assert!(s.on_toggle_beat());
    s.run_for(1000.0);

    for _ in 0..9 {
        answer_correctly(&mut s);
    }
    assert_eq!(s.stats().beat_level, BeatLevel::Kick);
    answer_correctly(&mut s);
    assert_eq!(s.stats().beat_level, BeatLevel::KickHat);
    for _ in 0..9 {
        answer_correctly(&mut s);
    }
    assert_eq!(s.stats().beat_level, BeatLevel::KickHat);

    s.drain_notifications();
    answer_correctly(&mut s);
    let notes = s.drain_notifications();
    assert_eq!(notes, vec![Notification::StageClear { stage: 1 }]);
    let stats = s.stats();
    assert_eq!(stats.stage, 1);
    assert_eq!(stats.stage_correct, 0);
    assert_eq!(stats.beat_level, BeatLevel::Kick);
    assert!(stats.beat_running);
}

#[test]
fn snare_tier_reached_when_stage_clear_is_further_away() {
    let mut s = session(DrillConfig {
        stage_clear_interval: 50,
        ..DrillConfig::default()
    });
    for _ in 0..20 {
        answer_correctly(&mut s);
    }
    assert_eq!(s.stats().beat_level, BeatLevel::KickHatSnare);
    assert_eq!(s.stats().bgm_variation, 3);
}

#[test]
fn wrong_answer_mutes_the_next_four_steps() {
    let mut s = session(DrillConfig::default());
    s.on_toggle_beat();
    s.run_for(1000.0);
    s.drain_notifications();
    let played_before = s.backend().played().len();
    let now = s.backend().current_time();

    let wrong = (s.problem().answer + 1).to_string();
    assert!(!s.submit_answer(&wrong).unwrap());
    // The wrong-answer buzz plays immediately.
    assert_eq!(s.backend().played().len(), played_before + 1);
    assert_eq!(s.stats().mute_steps_remaining, 4);

    s.run_for(600.0);
    assert_eq!(s.stats().mute_steps_remaining, 0);
    // The transport restarted at step 0; steps 0..4 are muted, so the first
    // kick heard again is step 4.
    let drums: Vec<f64> = s.backend().played()[played_before + 1..]
        .iter()
        .map(|p| p.at)
        .filter(|&at| at > now + 0.15)
        .collect();
    assert!(!drums.is_empty());
    let step = DrillConfig::default().step_duration();
    assert!(drums.iter().all(|&at| at >= now + 4.0 * step - 0.15), "{drums:?}");
}

#[test]
fn pulse_cadence_follows_the_audio_clock() {
    let mut s = session(DrillConfig::default());
    s.on_toggle_beat();
    s.run_for(4000.0);
    let times = pulses(&s.drain_notifications());
    assert!(times.len() >= 7, "{times:?}");
    for pair in times.windows(2) {
        assert_abs_diff_eq!(pair[1] - pair[0], 0.5, epsilon = 1e-9);
    }
}

#[test]
fn stopping_drops_pending_pulses_and_keeps_scheduled_audio() {
    let mut s = session(DrillConfig::default());
    s.on_toggle_beat();
    s.run_for(430.0);
    let played = s.backend().played().len();
    assert!(!s.on_toggle_beat());
    s.run_for(2000.0);
    assert_eq!(s.backend().played().len(), played);
    assert!(pulses(&s.drain_notifications()).len() <= 1);
    assert_eq!(s.timers().pending(), 0);
}

#[test]
fn reset_keeps_the_beat_running() {
    let mut s = session(DrillConfig::default());
    s.on_toggle_beat();
    for _ in 0..6 {
        answer_correctly(&mut s);
    }
    s.on_user_requests_reset();
    let stats = s.stats();
    assert_eq!(stats.correct_total, 0);
    assert_eq!(stats.bgm_variation, 0);
    assert!(stats.beat_running);
    assert_eq!(stats.best_total, 6);
}
