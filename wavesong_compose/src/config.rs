// Tunable ranges for piece composition.
//
// Every random draw the composer makes is bounded by a field here. Defaults
// reproduce the stock behavior; a JSON file can override any subset of them
// (missing fields fall back to the defaults).

use crate::error::{ComposeError, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An inclusive range from which an even measure count is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRange {
    pub min: usize,
    pub max: usize,
}

impl MeasureRange {
    pub const fn new(min: usize, max: usize) -> Self {
        MeasureRange { min, max }
    }

    fn has_even_value(&self) -> bool {
        self.min.div_ceil(2) <= self.max / 2
    }

    /// Smallest even value the range can produce.
    fn smallest_even(&self) -> usize {
        self.min.div_ceil(2) * 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Piece length bounds in sections, inclusive.
    pub min_sections: usize,
    pub max_sections: usize,
    /// Reserved ids, outside the thematic id range.
    pub intro_id: u32,
    pub outro_id: u32,
    /// Tempo draw: `seconds_per_beat_min + [0, 1) * seconds_per_beat_span`.
    pub seconds_per_beat_min: f64,
    pub seconds_per_beat_span: f64,
    /// Chance that a fresh interior section draws its own tempo.
    pub chance_to_diverge: f64,
    /// Global tonic root, integer Hz in `[tonic_hz_min, tonic_hz_min + tonic_hz_span)`.
    pub tonic_hz_min: u32,
    pub tonic_hz_span: u32,
    /// Meter draw: `[min, min + span)` beats per measure.
    pub beats_per_measure_min: usize,
    pub beats_per_measure_span: usize,
    /// Subdivisions per beat, `[min, min + span)`.
    pub subdivisions_per_beat_min: usize,
    pub subdivisions_per_beat_span: usize,
    pub intro_measures: MeasureRange,
    pub interior_measures: MeasureRange,
    pub outro_measures: MeasureRange,
    /// Start/end dynamics draw: `[volume_min, volume_min + volume_span)`.
    pub volume_min: u32,
    pub volume_span: u32,
    /// Instrument weight is `1 - [0, 1) * weight_jitter`.
    pub weight_jitter: f64,
    /// Chance that a subordinate tonic with a flat seventh gets a raised one.
    pub leading_tone_chance: f64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            min_sections: 4,
            max_sections: 8,
            intro_id: 100,
            outro_id: 101,
            seconds_per_beat_min: 0.2,
            seconds_per_beat_span: 1.0,
            chance_to_diverge: 0.25,
            tonic_hz_min: 100,
            tonic_hz_span: 100,
            beats_per_measure_min: 3,
            beats_per_measure_span: 7,
            subdivisions_per_beat_min: 3,
            subdivisions_per_beat_span: 3,
            intro_measures: MeasureRange::new(2, 8),
            interior_measures: MeasureRange::new(8, 16),
            outro_measures: MeasureRange::new(2, 6),
            volume_min: 50,
            volume_span: 100,
            weight_jitter: 0.25,
            leading_tone_chance: 0.3,
        }
    }
}

impl ComposerConfig {
    /// Load from a JSON file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Largest id an interior section can draw for thematic matching.
    pub fn max_theme_id(&self, num_sections: usize) -> u32 {
        (num_sections / 2) as u32
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        let fail = |msg: String| Err(ComposeError::InvalidConfig(msg));

        if self.min_sections < 2 {
            return fail(format!("min_sections must be at least 2, got {}", self.min_sections));
        }
        if self.min_sections > self.max_sections {
            return fail(format!(
                "min_sections {} exceeds max_sections {}",
                self.min_sections, self.max_sections
            ));
        }
        if self.intro_id == self.outro_id {
            return fail(format!("intro and outro share id {}", self.intro_id));
        }
        let theme_max = self.max_theme_id(self.max_sections);
        for (name, id) in [("intro_id", self.intro_id), ("outro_id", self.outro_id)] {
            if id <= theme_max {
                return fail(format!("{name} {id} collides with thematic ids 0..={theme_max}"));
            }
        }
        if !(self.seconds_per_beat_min > 0.0 && self.seconds_per_beat_span >= 0.0) {
            return fail("tempo range must be positive".to_string());
        }
        if self.tonic_hz_min == 0 || self.tonic_hz_span == 0 {
            return fail("tonic range must be positive and non-empty".to_string());
        }
        if self.tonic_hz_min.checked_add(self.tonic_hz_span).is_none() {
            return fail(format!(
                "tonic range {} + {} overflows",
                self.tonic_hz_min, self.tonic_hz_span
            ));
        }
        if self.beats_per_measure_min == 0 || self.beats_per_measure_span == 0 {
            return fail("meter range must be positive and non-empty".to_string());
        }
        if self.subdivisions_per_beat_min == 0 || self.subdivisions_per_beat_span == 0 {
            return fail("subdivision range must be positive and non-empty".to_string());
        }
        for (name, range) in [
            ("intro_measures", self.intro_measures),
            ("interior_measures", self.interior_measures),
            ("outro_measures", self.outro_measures),
        ] {
            // A zero-measure draw is impossible to play, and the intro needs
            // at least two measures to stagger entrances.
            if !range.has_even_value() || range.smallest_even() == 0 {
                return fail(format!(
                    "{name} [{}, {}] holds no positive even measure count",
                    range.min, range.max
                ));
            }
        }
        if self.volume_span == 0 {
            return fail("volume range must be non-empty".to_string());
        }
        if self.volume_min.checked_add(self.volume_span).is_none() {
            return fail(format!(
                "volume range {} + {} overflows",
                self.volume_min, self.volume_span
            ));
        }
        for (name, p) in [
            ("chance_to_diverge", self.chance_to_diverge),
            ("weight_jitter", self.weight_jitter),
            ("leading_tone_chance", self.leading_tone_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return fail(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        Ok(())
    }
}
