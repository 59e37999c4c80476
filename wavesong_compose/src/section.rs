// Sections: the unit a piece is assembled from.
//
// A section has an id (sections sharing an id are thematic reprises of one
// another), a rhythmic grid (`Time`), its instrument parts, and start/end
// dynamics. Each part carries an entrance delay in measures and a stereo
// balance.

use crate::error::ComposeError;
use crate::instrument::{Instrument, InstrumentKind};
use serde::{Deserialize, Serialize};
use wavesong_prng::GameRng;

/// The rhythmic grid of a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Time {
    pub seconds_per_beat: f64,
    pub beats_per_measure: usize,
    /// Subdivisions per measure; a whole multiple of `beats_per_measure`.
    pub subdivide: usize,
    pub num_measures: usize,
}

impl Time {
    pub fn new(
        seconds_per_beat: f64,
        beats_per_measure: usize,
        subdivide: usize,
        num_measures: usize,
    ) -> Result<Self, ComposeError> {
        if beats_per_measure == 0 || num_measures == 0 {
            return Err(ComposeError::InvalidMeter {
                beats_per_measure,
                num_measures,
            });
        }
        if subdivide == 0 || subdivide % beats_per_measure != 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "{subdivide} subdivisions do not divide evenly into {beats_per_measure} beats"
            )));
        }
        if !(seconds_per_beat.is_finite() && seconds_per_beat > 0.0) {
            return Err(ComposeError::InvalidConfig(format!(
                "seconds per beat must be positive, got {seconds_per_beat}"
            )));
        }
        Ok(Time {
            seconds_per_beat,
            beats_per_measure,
            subdivide,
            num_measures,
        })
    }

    /// The same grid with `measures` leading measures removed.
    pub fn truncated(&self, measures: usize) -> Result<Self, ComposeError> {
        Time::new(
            self.seconds_per_beat,
            self.beats_per_measure,
            self.subdivide,
            self.num_measures.saturating_sub(measures),
        )
    }

    pub fn total_beats(&self) -> usize {
        self.beats_per_measure * self.num_measures
    }

    pub fn subdivisions_per_beat(&self) -> usize {
        self.subdivide / self.beats_per_measure
    }

    pub fn total_subdivisions(&self) -> usize {
        self.subdivide * self.num_measures
    }

    pub fn duration_seconds(&self) -> f64 {
        self.total_beats() as f64 * self.seconds_per_beat
    }
}

/// An instrument placed in a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub instrument: Instrument,
    /// Measures of silence before the part enters.
    pub delay_measures: usize,
    /// Stereo position in [-1, 1), left to right.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    pub time: Time,
    pub parts: Vec<Part>,
    pub start_volume: u32,
    pub end_volume: u32,
}

impl Section {
    pub fn new(id: u32, time: Time) -> Self {
        Section {
            id,
            time,
            parts: Vec::new(),
            start_volume: 0,
            end_volume: 0,
        }
    }

    pub fn add_instrument(&mut self, instrument: Instrument) {
        self.add_instrument_delayed(instrument, 0);
    }

    pub fn add_instrument_delayed(&mut self, instrument: Instrument, delay_measures: usize) {
        self.parts.push(Part {
            instrument,
            delay_measures,
            balance: 0.0,
        });
    }

    /// Deep copy, used as the starting point of a reprise.
    pub fn duplicate(&self) -> Section {
        self.clone()
    }

    /// Escalate the material of every part.
    pub fn complexify(&mut self, rng: &mut GameRng) {
        for part in &mut self.parts {
            part.instrument.complexify(rng);
        }
    }

    pub fn randomize_balances(&mut self, rng: &mut GameRng) {
        for part in &mut self.parts {
            part.balance = rng.next_f64() * 2.0 - 1.0;
        }
    }

    pub fn instrument_kinds(&self) -> Vec<InstrumentKind> {
        self.parts.iter().map(|p| p.instrument.kind).collect()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.time.duration_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Note, Wave};

    fn instrument(kind: InstrumentKind, time: Time) -> Instrument {
        Instrument {
            kind,
            wave: Wave::Triangle,
            weight: 1.0,
            time,
            notes: vec![Note { start: 0, length: 4, hz: vec![220.0] }],
        }
    }

    #[test]
    fn test_time_rejects_degenerate_meter() {
        assert!(matches!(
            Time::new(0.5, 0, 12, 4),
            Err(ComposeError::InvalidMeter { .. })
        ));
        assert!(matches!(
            Time::new(0.5, 4, 12, 0),
            Err(ComposeError::InvalidMeter { .. })
        ));
        assert!(matches!(
            Time::new(0.5, 4, 10, 4),
            Err(ComposeError::InvalidConfig(_))
        ));
        assert!(matches!(
            Time::new(0.0, 4, 12, 4),
            Err(ComposeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_time_derived_counts() {
        let time = Time::new(0.25, 3, 12, 8).unwrap();
        assert_eq!(time.total_beats(), 24);
        assert_eq!(time.subdivisions_per_beat(), 4);
        assert_eq!(time.total_subdivisions(), 96);
        assert!((time.duration_seconds() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_truncated() {
        let time = Time::new(0.5, 4, 12, 6).unwrap();
        assert_eq!(time.truncated(2).unwrap().num_measures, 4);
        assert!(time.truncated(6).is_err());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let time = Time::new(0.5, 4, 8, 2).unwrap();
        let mut original = Section::new(3, time);
        original.add_instrument(instrument(InstrumentKind::Bass, time));
        let mut copy = original.duplicate();
        copy.complexify(&mut GameRng::new(1));
        copy.start_volume = 70;
        assert_eq!(original.parts[0].instrument.notes.len(), 1);
        assert_eq!(copy.parts[0].instrument.notes.len(), 2);
        assert_eq!(original.start_volume, 0);
    }

    #[test]
    fn test_balances_in_range() {
        let time = Time::new(0.5, 4, 8, 2).unwrap();
        let mut section = Section::new(0, time);
        for kind in InstrumentKind::ALL {
            section.add_instrument(instrument(kind, time));
        }
        section.randomize_balances(&mut GameRng::new(5));
        for part in &section.parts {
            assert!((-1.0..1.0).contains(&part.balance));
        }
        assert_eq!(section.instrument_kinds(), InstrumentKind::ALL.to_vec());
    }

    #[test]
    fn test_delayed_instrument() {
        let time = Time::new(0.5, 4, 8, 4).unwrap();
        let mut section = Section::new(100, time);
        section.add_instrument_delayed(instrument(InstrumentKind::Pad, time.truncated(2).unwrap()), 2);
        assert_eq!(section.parts[0].delay_measures, 2);
        assert_eq!(section.parts[0].instrument.time.num_measures, 2);
    }
}
