//! WAV renderer — plays a drill session offline and encodes the beat.

use crate::backend::OfflineBackend;
use crate::config::DrillConfig;
use crate::error::DrillError;
use crate::session::DrillSession;
use crate::timer::ManualTimers;

/// Tail after the last bar so the final hits ring out.
const TAIL_SECONDS: f64 = 0.5;
const PREVIEW_SEED: u64 = 0x5eed;
const MAX_SAMPLE_RATE: u32 = 192_000;

/// Render `bars` bars of the beat a player hears after `correct_answers`
/// correct answers in a row, as 16-bit mono WAV bytes.
///
/// `bars` is limited to one cycle (`bars_per_cycle`). Only the answers since
/// the last stage clear shape the beat, so `correct_answers` is taken modulo
/// `stage_clear_interval`.
pub fn render_preview_wav(
    config: &DrillConfig,
    correct_answers: u32,
    bars: u32,
    sample_rate: u32,
) -> Result<Vec<u8>, DrillError> {
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(DrillError::Config(format!(
            "sample rate must be within 1..={MAX_SAMPLE_RATE}, got {sample_rate}"
        )));
    }
    config.validate()?;
    if bars > config.bars_per_cycle {
        return Err(DrillError::Config(format!(
            "preview is limited to {} bars, got {bars}",
            config.bars_per_cycle
        )));
    }
    let mut session = DrillSession::with_config(
        config.clone(),
        OfflineBackend::new(sample_rate as f64),
        ManualTimers::new(),
        Some(PREVIEW_SEED),
    )?;
    session.set_sfx_enabled(false);
    for _ in 0..correct_answers % config.stage_clear_interval {
        session.on_correct_answer();
    }
    session.on_toggle_beat();

    let steps = bars as f64 * config.steps_per_bar as f64;
    let beat_seconds = config.start_offset_s + steps * config.step_duration();
    // Stop before the step after the last bar is scheduled.
    let run_ms = (beat_seconds - config.schedule_horizon_s).max(0.0) * 1000.0;
    session.run_for(run_ms);
    session.on_toggle_beat();

    let total_frames = ((beat_seconds + TAIL_SECONDS) * sample_rate as f64).ceil() as usize;
    let mut mix = session.backend().mixdown();
    mix.resize(total_frames, 0.0);

    let pcm: Vec<i16> = mix
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f64) as i16)
        .collect();
    Ok(encode_wav(&pcm, sample_rate, 1))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
