//! Tabeq - Per-Tab 3-Band Equalizer
//!
//! Tabeq models a browser-tab equalizer split across two execution contexts
//! that only talk through typed messages:
//! 1. Page context - owns the audio graph and attaches it to every media
//!    element in the page, including late-inserted and shadow-DOM ones
//! 2. Control-surface context - sliders, presets, frequency knobs, the
//!    response-curve plot and the spectrum view
//!
//! # Architecture
//!
//! The filter chain is fixed per page:
//! - Bass low shelf -> mid peaking -> treble high shelf
//! - Preamp gain -> master gain -> analyser tap -> output
//!
//! Settings are persisted per tab in session storage and re-applied by the
//! coordinator whenever the page reloads.

pub mod bus;
pub mod channel;
pub mod cli;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod dsp;
pub mod error;
pub mod math;
pub mod page;
pub mod settings;
pub mod store;

pub use error::{EqError, Result};
