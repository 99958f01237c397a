//! BeatDrill core — an arithmetic drill whose feedback is a procedurally
//! sequenced drum beat.
//!
//! Correct answers layer percussion onto the beat and raise the arithmetic
//! difficulty; a wrong answer resets both and briefly silences the beat.
//! [`session::DrillSession`] ties the pieces together over two host seams,
//! [`backend::AudioBackend`] and [`timer::TimerHost`]. The `web` module
//! implements them for the browser.

pub mod arith;
pub mod backend;
pub mod config;
pub mod dsp;
pub mod error;
pub mod pattern;
pub mod progression;
pub mod sequencer;
pub mod session;
pub mod timer;
pub mod transport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::DrillConfig;
pub use error::{AudioError, DrillError};
pub use session::{DrillSession, Notification, SessionStats};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Panic hook and a `tracing` subscriber that writes to the browser
/// console at `INFO` and above.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_start() {
    use tracing_subscriber::layer::SubscriberExt;

    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let config = tracing_wasm::WASMLayerConfigBuilder::new()
        .set_max_level(tracing::Level::INFO)
        .build();
    let subscriber =
        tracing_subscriber::registry().with(tracing_wasm::WASMLayer::new(config));
    // A host may already have installed one.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// WASM-exposed: return the beatdrill-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the fixed engine configuration, read-only.
#[wasm_bindgen(js_name = defaultConfig)]
pub fn default_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&DrillConfig::default())
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render `bars` bars of the beat reached after
/// `correct_answers` correct answers, as WAV bytes.
#[wasm_bindgen(js_name = renderPreviewWav)]
pub fn render_preview_wav(
    correct_answers: u32,
    bars: u32,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    dsp::renderer::render_preview_wav(&DrillConfig::default(), correct_answers, bars, sample_rate)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
