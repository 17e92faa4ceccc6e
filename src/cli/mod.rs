//! CLI Module
//!
//! Command-line front end for inspecting and exercising the equalizer.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{Band, EqField, EqualizerSettings, PresetName};

/// Tabeq - per-tab 3-band equalizer toolkit
#[derive(Parser, Debug)]
#[command(name = "tabeq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the band response curves as JSON
    #[command(name = "curve")]
    Curve {
        #[command(flatten)]
        eq: EqArgs,

        /// Plot width in pixels
        #[arg(long, default_value_t = 300.0)]
        width: f64,

        /// Plot height in pixels
        #[arg(long, default_value_t = 124.0)]
        height: f64,

        /// Print the cascaded response instead of the three bands
        #[arg(long)]
        composite: bool,
    },

    /// Convert between knob percent and frequency
    #[command(name = "freq")]
    Freq {
        /// Knob position (0-100 %)
        #[arg(long, conflicts_with = "hz")]
        percent: Option<f64>,

        /// Frequency in Hz
        #[arg(long)]
        hz: Option<f64>,
    },

    /// Run a WAV file through the audio graph
    #[command(name = "render")]
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        eq: EqArgs,

        /// Output bit depth (16, 24 or 32)
        #[arg(long, default_value_t = 16)]
        bit_depth: u16,
    },

    /// Run a scripted session against a simulated tab
    #[command(name = "simulate")]
    Simulate {
        /// Page URL to open
        #[arg(long, default_value = "https://example.com/watch")]
        url: String,
    },
}

/// Equalizer settings given on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct EqArgs {
    /// Start from a preset's band gains
    #[arg(long)]
    pub preset: Option<String>,

    /// Bass gain (dB)
    #[arg(long, allow_hyphen_values = true)]
    pub bass: Option<f64>,

    /// Mid gain (dB)
    #[arg(long, allow_hyphen_values = true)]
    pub mid: Option<f64>,

    /// Treble gain (dB)
    #[arg(long, allow_hyphen_values = true)]
    pub treble: Option<f64>,

    /// Preamp (dB)
    #[arg(long, allow_hyphen_values = true)]
    pub preamp: Option<f64>,

    /// Master level (percent)
    #[arg(long)]
    pub master: Option<f64>,

    /// Bass shelf corner (Hz)
    #[arg(long)]
    pub bass_freq: Option<f64>,

    /// Mid peak center (Hz)
    #[arg(long)]
    pub mid_freq: Option<f64>,

    /// Treble shelf corner (Hz)
    #[arg(long)]
    pub treble_freq: Option<f64>,

    /// Mid peak Q
    #[arg(long)]
    pub mid_q: Option<f64>,
}

impl EqArgs {
    /// Resolve into a clamped settings snapshot
    ///
    /// Explicit band gains win over the preset's.
    pub fn to_settings(&self) -> Result<EqualizerSettings> {
        let mut settings = EqualizerSettings::default();
        if let Some(name) = &self.preset {
            let preset = name.parse::<PresetName>()?.definition();
            for band in Band::ALL {
                settings.set(band.gain_field(), preset.gain(band));
            }
        }

        let given = [
            (EqField::Bass, self.bass),
            (EqField::Mid, self.mid),
            (EqField::Treble, self.treble),
            (EqField::Preamp, self.preamp),
            (EqField::Master, self.master),
            (EqField::BassFreq, self.bass_freq),
            (EqField::MidFreq, self.mid_freq),
            (EqField::TrebleFreq, self.treble_freq),
            (EqField::MidQ, self.mid_q),
        ];
        for (field, value) in given {
            if let Some(value) = value {
                settings.set(field, field.normalize(value)?);
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_then_override() {
        let args = EqArgs {
            preset: Some("boostBass".to_string()),
            mid: Some(-50.0),
            treble_freq: Some(9000.0),
            ..Default::default()
        };
        let settings = args.to_settings().unwrap();
        assert_eq!(settings.bass, 19.0);
        assert_eq!(settings.mid, -30.0);
        assert_eq!(settings.treble, -30.0);
        assert_eq!(settings.treble_freq, 9000.0);
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let args = EqArgs {
            preset: Some("loudness".to_string()),
            ..Default::default()
        };
        assert!(args.to_settings().is_err());
    }

    #[test]
    fn test_parse_render_command() {
        let cli = Cli::parse_from([
            "tabeq", "render", "in.wav", "-o", "out.wav", "--bass", "-6", "--mid-q", "2",
        ]);
        match cli.command {
            Some(Commands::Render { eq, bit_depth, .. }) => {
                assert_eq!(eq.bass, Some(-6.0));
                assert_eq!(eq.mid_q, Some(2.0));
                assert_eq!(bit_depth, 16);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
