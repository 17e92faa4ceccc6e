//! Control surface: sliders, presets, knobs, curves and the spectrum view

pub mod animation;
pub mod curve;
pub mod knobs;
pub mod spectrum;
pub mod surface;

pub use animation::{ease_in_out_cubic, slider_steps};
pub use curve::{BandCurve, PlotPoint, ResponseCurves};
pub use knobs::{FrequencyKnobs, KnobMove};
pub use spectrum::SpectrumSampler;
pub use surface::ControlSurface;
