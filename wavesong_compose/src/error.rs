// Error types for composition, configuration and rendering.
//
// Configuration mistakes (zero-length meters, empty option lists, empty
// chord-tone sets, inconsistent config ranges) surface here as explicit
// values instead of malformed progressions or half-built sections. A missing
// thematic match is not an error; the composer just builds fresh material.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid meter: {beats_per_measure} beats per measure, {num_measures} measures")]
    InvalidMeter {
        beats_per_measure: usize,
        num_measures: usize,
    },

    #[error("cannot draw from an empty option list")]
    EmptyChoice,

    #[error("chord requested with no chord tones")]
    EmptyChordTones,

    #[error("invalid composer config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("system clock unavailable for seeding: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize piece: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write rendered piece: {0}")]
    Io(#[from] std::io::Error),
}
