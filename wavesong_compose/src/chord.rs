// Chord and scale representation.
//
// A chord here is a root frequency plus the seven-degree diatonic scale built
// on it. The scale is stored twice: as semitone offsets from the root (the
// "shape", used when deriving chords on other degrees) and as frequencies in
// Hz (what instruments actually play). Frequencies are folded into one
// octave starting at the chord's base: its own root for a chord built
// directly, the tonic's root for a chord derived on a scale degree.
//
// The chord types are the seven diatonic modes. Every rotation of a diatonic
// scale is again one of them, which lets chords derived on scale degrees
// (progression.rs) report a meaningful type.
//
// Chromatic alterations are a sparse map from scale position (1..=7) to a
// semitone shift, applied on top of the offsets when frequencies are derived.

use crate::error::ComposeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of degrees in every scale.
pub const SCALE_LEN: usize = 7;

/// Root, third and fifth.
pub const TRIAD: [u8; 3] = [1, 3, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChordType {
    /// Major: 0 2 4 5 7 9 11
    Ionian,
    /// Minor with raised 6th.
    Dorian,
    /// Minor with lowered 2nd.
    Phrygian,
    /// Major with raised 4th.
    Lydian,
    /// Major with lowered 7th.
    Mixolydian,
    /// Natural minor.
    Aeolian,
    /// Diminished 5th over a minor scale.
    Locrian,
}

impl ChordType {
    pub const ALL: [ChordType; 7] = [
        ChordType::Ionian,
        ChordType::Dorian,
        ChordType::Phrygian,
        ChordType::Lydian,
        ChordType::Mixolydian,
        ChordType::Aeolian,
        ChordType::Locrian,
    ];

    /// Semitone offsets from the root to each scale degree 1-7.
    pub fn intervals(self) -> [i16; SCALE_LEN] {
        match self {
            ChordType::Ionian => [0, 2, 4, 5, 7, 9, 11],
            ChordType::Dorian => [0, 2, 3, 5, 7, 9, 10],
            ChordType::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            ChordType::Lydian => [0, 2, 4, 6, 7, 9, 11],
            ChordType::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            ChordType::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            ChordType::Locrian => [0, 1, 3, 5, 6, 8, 10],
        }
    }

    /// Identify the mode with exactly these offsets, if any.
    pub fn from_offsets(offsets: &[i16; SCALE_LEN]) -> Option<ChordType> {
        ChordType::ALL
            .into_iter()
            .find(|t| &t.intervals() == offsets)
    }

    /// Seventh degree a whole step below the octave (no leading tone).
    pub fn has_minor_seventh(self) -> bool {
        self.intervals()[6] == 10
    }
}

/// An immutable chord value: root, scale shape, chord tones and alterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    root_hz: f64,
    /// Bottom of the octave band the scale frequencies are folded into.
    base_hz: f64,
    chord_type: ChordType,
    scale_offsets: [i16; SCALE_LEN],
    chord_tones: Vec<u8>,
    chromatic: BTreeMap<u8, i8>,
    scale_hz: [f64; SCALE_LEN],
}

impl Chord {
    /// A triad on `root_hz` using the scale of `chord_type`.
    pub fn new(root_hz: f64, chord_type: ChordType) -> Self {
        let scale_offsets = chord_type.intervals();
        Chord {
            root_hz,
            base_hz: root_hz,
            chord_type,
            scale_offsets,
            chord_tones: TRIAD.to_vec(),
            chromatic: BTreeMap::new(),
            scale_hz: derive_scale_hz(root_hz, root_hz, &scale_offsets, &BTreeMap::new()),
        }
    }

    /// A chord with an explicit scale shape and chord-tone set.
    ///
    /// Scale frequencies are folded into [base_hz, 2 * base_hz). The type is
    /// recognised from the offsets when they match a mode, otherwise
    /// `fallback_type` is recorded.
    pub fn from_offsets(
        root_hz: f64,
        base_hz: f64,
        scale_offsets: [i16; SCALE_LEN],
        chord_tones: &[u8],
        fallback_type: ChordType,
    ) -> Result<Self, ComposeError> {
        if chord_tones.is_empty() {
            return Err(ComposeError::EmptyChordTones);
        }
        if let Some(&bad) = chord_tones
            .iter()
            .find(|&&t| t == 0 || t as usize > SCALE_LEN)
        {
            return Err(ComposeError::InvalidConfig(format!(
                "chord tone {bad} outside scale positions 1..={SCALE_LEN}"
            )));
        }
        let chord_type = ChordType::from_offsets(&scale_offsets).unwrap_or(fallback_type);
        Ok(Chord {
            root_hz,
            base_hz,
            chord_type,
            scale_offsets,
            chord_tones: chord_tones.to_vec(),
            chromatic: BTreeMap::new(),
            scale_hz: derive_scale_hz(root_hz, base_hz, &scale_offsets, &BTreeMap::new()),
        })
    }

    /// Replace the chromatic alteration set and re-derive frequencies against
    /// the same base. Positions outside 1..=7 are dropped.
    pub fn with_chromatic(mut self, chromatic: &BTreeMap<u8, i8>) -> Self {
        self.chromatic = chromatic
            .iter()
            .filter(|&(&pos, _)| pos >= 1 && pos as usize <= SCALE_LEN)
            .map(|(&pos, &shift)| (pos, shift))
            .collect();
        self.scale_hz = derive_scale_hz(
            self.root_hz,
            self.base_hz,
            &self.scale_offsets,
            &self.chromatic,
        );
        self
    }

    pub fn root_hz(&self) -> f64 {
        self.root_hz
    }

    pub fn chord_type(&self) -> ChordType {
        self.chord_type
    }

    /// Frequencies of scale degrees 1-7, each in [base, 2 * base).
    pub fn scale_hz(&self) -> &[f64; SCALE_LEN] {
        &self.scale_hz
    }

    pub fn scale_offsets(&self) -> &[i16; SCALE_LEN] {
        &self.scale_offsets
    }

    pub fn chord_tones(&self) -> &[u8] {
        &self.chord_tones
    }

    pub fn chromatic(&self) -> &BTreeMap<u8, i8> {
        &self.chromatic
    }

    /// Frequencies of the chord tones, in chord-tone order.
    pub fn tone_hz(&self) -> Vec<f64> {
        self.chord_tones
            .iter()
            .map(|&t| self.scale_hz[t as usize - 1])
            .collect()
    }
}

/// Fold `hz` into [base, 2 * base) by octave steps.
///
/// Non-positive or non-finite inputs are returned unchanged.
pub fn normalize_octave(hz: f64, base: f64) -> f64 {
    if !(hz.is_finite() && base.is_finite() && hz > 0.0 && base > 0.0) {
        return hz;
    }
    let mut hz = hz;
    while hz >= base * 2.0 {
        hz /= 2.0;
    }
    while hz < base {
        hz *= 2.0;
    }
    hz
}

fn derive_scale_hz(
    root_hz: f64,
    base_hz: f64,
    offsets: &[i16; SCALE_LEN],
    chromatic: &BTreeMap<u8, i8>,
) -> [f64; SCALE_LEN] {
    let mut out = [0.0; SCALE_LEN];
    for (i, &offset) in offsets.iter().enumerate() {
        let shift = chromatic.get(&(i as u8 + 1)).copied().unwrap_or(0) as i16;
        let semitones = (offset + shift) as f64;
        out[i] = normalize_octave(root_hz * 2f64.powf(semitones / 12.0), base_hz);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_major_scale_frequencies() {
        let c = Chord::new(100.0, ChordType::Ionian);
        let hz = c.scale_hz();
        assert!(close(hz[0], 100.0));
        assert!(close(hz[4], 100.0 * 2f64.powf(7.0 / 12.0))); // fifth
        assert!(close(hz[6], 100.0 * 2f64.powf(11.0 / 12.0))); // leading tone
    }

    #[test]
    fn test_scale_stays_in_root_octave() {
        for t in ChordType::ALL {
            let c = Chord::new(173.0, t);
            for &hz in c.scale_hz() {
                assert!((173.0..346.0).contains(&hz), "{t:?}: {hz} out of band");
            }
        }
    }

    #[test]
    fn test_triad_tones() {
        let c = Chord::new(200.0, ChordType::Aeolian);
        let tones = c.tone_hz();
        assert_eq!(tones.len(), 3);
        assert!(close(tones[0], 200.0));
        assert!(close(tones[1], 200.0 * 2f64.powf(3.0 / 12.0))); // minor third
    }

    #[test]
    fn test_from_offsets_recognises_rotation() {
        // Ionian rotated to start on its second degree is Dorian.
        let c = Chord::from_offsets(110.0, 110.0, [0, 2, 3, 5, 7, 9, 10], &TRIAD, ChordType::Ionian)
            .unwrap();
        assert_eq!(c.chord_type(), ChordType::Dorian);
    }

    #[test]
    fn test_from_offsets_rejects_empty_tones() {
        let err = Chord::from_offsets(110.0, 110.0, ChordType::Ionian.intervals(), &[], ChordType::Ionian);
        assert!(matches!(err, Err(ComposeError::EmptyChordTones)));
    }

    #[test]
    fn test_from_offsets_rejects_out_of_scale_tone() {
        let err = Chord::from_offsets(110.0, 110.0, ChordType::Ionian.intervals(), &[1, 9], ChordType::Ionian);
        assert!(matches!(err, Err(ComposeError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_offsets_folds_into_base_octave() {
        // Root a fifth above the base: the upper degrees wrap below the root.
        let root = 100.0 * 2f64.powf(7.0 / 12.0);
        let c = Chord::from_offsets(root, 100.0, ChordType::Mixolydian.intervals(), &TRIAD, ChordType::Ionian)
            .unwrap();
        assert!(close(c.scale_hz()[0], root));
        for &hz in c.scale_hz() {
            assert!((100.0..200.0).contains(&hz), "{hz} outside the base octave");
        }
    }

    #[test]
    fn test_chromatic_keeps_base() {
        let mut raised = BTreeMap::new();
        raised.insert(7, 1);
        let root = 100.0 * 2f64.powf(9.0 / 12.0);
        let c = Chord::from_offsets(root, 100.0, ChordType::Aeolian.intervals(), &TRIAD, ChordType::Aeolian)
            .unwrap()
            .with_chromatic(&raised);
        for &hz in c.scale_hz() {
            assert!((100.0..200.0).contains(&hz), "{hz} outside the base octave");
        }
    }

    #[test]
    fn test_chromatic_raises_seventh() {
        let mut raised = BTreeMap::new();
        raised.insert(7, 1);
        let minor = Chord::new(100.0, ChordType::Aeolian);
        let harmonic = minor.clone().with_chromatic(&raised);
        assert!(close(harmonic.scale_hz()[6], 100.0 * 2f64.powf(11.0 / 12.0)));
        assert_eq!(harmonic.scale_hz()[..6], minor.scale_hz()[..6]);
        assert_eq!(harmonic.chromatic().get(&7), Some(&1));
    }

    #[test]
    fn test_chromatic_ignores_bad_positions() {
        let mut bad = BTreeMap::new();
        bad.insert(0, 1);
        bad.insert(8, -1);
        let c = Chord::new(100.0, ChordType::Ionian).with_chromatic(&bad);
        assert!(c.chromatic().is_empty());
    }

    #[test]
    fn test_normalize_octave() {
        assert!(close(normalize_octave(440.0, 100.0), 110.0));
        assert!(close(normalize_octave(30.0, 100.0), 120.0));
        assert!(close(normalize_octave(200.0, 100.0), 100.0));
        assert!(close(normalize_octave(100.0, 100.0), 100.0));
    }

    #[test]
    fn test_mode_flags() {
        assert!(ChordType::Dorian.has_minor_seventh());
        assert!(!ChordType::Ionian.has_minor_seventh());
    }
}
