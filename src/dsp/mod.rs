//! DSP — procedural synthesis for the drill's drums and feedback sounds.
//!
//! Everything is rendered in Rust from oscillators, filtered noise and
//! envelopes. The same code feeds Web Audio buffers in the browser and the
//! offline WAV preview.

pub mod bank;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
