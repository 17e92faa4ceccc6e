//! DSP primitives
//!
//! Building blocks of the page's filter chain: audio blocks, biquad tone
//! filters, broadband gain stages and the analyser tap.

mod analyser;
mod biquad;
mod buffer;
mod gain;
mod wav;

pub use analyser::{Analyser, DEFAULT_FFT_SIZE, DEFAULT_MAX_DB, DEFAULT_MIN_DB, DEFAULT_SMOOTHING};
pub use biquad::{BiquadCoeffs, BiquadNode, FilterKind};
pub use buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
pub use gain::GainNode;
pub use wav::{read_wav, write_wav};
