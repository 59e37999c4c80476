// Chord progression generation for a single section.
//
// A progression holds one chord per beat. Generation has three phases:
// - the first measure is the tonic, anchoring the section's opening
// - the body advances one beat at a time, either holding the previous chord
//   or moving to a chord built on one of its scale degrees (4, 3, 6, 5, 2,
//   stronger motions first). Moves are likelier on downbeats and mid-measure
// - the final measure is a rule-based cadence toward a target degree, so the
//   next section can pick up from a known harmonic position
//
// Chords on scale degrees are derived by rotating the source chord's scale
// shape to start on the chosen degree and placing the new root in the tonic's
// octave. This approximates secondary-function chords without modelling key
// signatures.
//
// Consumed by composer.rs (one generator per fresh section) and by
// instrument.rs (factories read the finished progression).

use crate::choice::{FAVOR_FRONT, choose_skewed};
use crate::chord::{Chord, SCALE_LEN, TRIAD, normalize_octave};
use crate::error::ComposeError;
use log::{debug, trace};
use std::iter::repeat_n;
use std::ops::Index;
use wavesong_prng::GameRng;

/// Scale-degree motions available in the body, strongest first:
/// subdominant, mediant, submediant, dominant, supertonic.
const MOVES: [usize; 5] = [4, 3, 6, 5, 2];

/// Move-probability multiplier on metrically strong beats.
const STRONG_BEAT_WEIGHT: f64 = 1.5;
/// Move-probability multiplier on all other beats.
const WEAK_BEAT_WEIGHT: f64 = 0.5;

/// An ordered, read-only sequence of chords (one per beat) and the tonic they
/// were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordProgression {
    tonic: Chord,
    beats_per_measure: usize,
    chords: Vec<Chord>,
}

impl ChordProgression {
    pub fn tonic(&self) -> &Chord {
        &self.tonic
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chord> {
        self.chords.iter()
    }

    /// A copy with the first `measures` measures removed. Skipping past the
    /// end leaves an empty progression.
    pub fn skip_measures(&self, measures: usize) -> ChordProgression {
        let start = (measures * self.beats_per_measure).min(self.chords.len());
        ChordProgression {
            tonic: self.tonic.clone(),
            beats_per_measure: self.beats_per_measure,
            chords: self.chords[start..].to_vec(),
        }
    }
}

impl Index<usize> for ChordProgression {
    type Output = Chord;

    fn index(&self, beat: usize) -> &Chord {
        &self.chords[beat]
    }
}

impl<'a> IntoIterator for &'a ChordProgression {
    type Item = &'a Chord;
    type IntoIter = std::slice::Iter<'a, Chord>;

    fn into_iter(self) -> Self::IntoIter {
        self.chords.iter()
    }
}

/// Fold a degree request into 1..=7: reduce mod 8, and 0 means 7.
///
/// Degrees above 7 collapse rather than transpose up an octave.
pub fn fold_degree(n: usize) -> usize {
    match n % 8 {
        0 => 7,
        d => d,
    }
}

/// Downbeats and the mid-measure beats (every `bpm / 2` beats within the
/// measure) are strong. The pattern repeats identically in every measure.
fn is_strong_beat(pos: usize, bpm: usize) -> bool {
    let beat = pos % bpm;
    beat == 0 || beat % (bpm / 2).max(1) == 0
}

/// Builds progressions around one tonic, drawing from its own random stream.
#[derive(Debug, Clone)]
pub struct HarmonicGenerator {
    tonic: Chord,
    rng: GameRng,
}

impl HarmonicGenerator {
    pub fn new(tonic: Chord, rng: GameRng) -> Self {
        HarmonicGenerator { tonic, rng }
    }

    pub fn tonic(&self) -> &Chord {
        &self.tonic
    }

    /// Generate `beats_per_measure * num_measures` chords.
    ///
    /// `rel_chord_rate` is the target number of chord changes per measure,
    /// applied probabilistically. `lead_to` (reduced mod 8) is the degree the
    /// final measure resolves toward. A single-measure progression is all
    /// cadence.
    pub fn generate(
        &mut self,
        beats_per_measure: usize,
        num_measures: usize,
        rel_chord_rate: f64,
        lead_to: usize,
    ) -> Result<ChordProgression, ComposeError> {
        if beats_per_measure == 0 || num_measures == 0 {
            return Err(ComposeError::InvalidMeter {
                beats_per_measure,
                num_measures,
            });
        }
        let bpm = beats_per_measure;
        let lead_to = lead_to % 8;
        let body_end = bpm * (num_measures - 1);
        let mut chords = Vec::with_capacity(bpm * num_measures);

        if num_measures > 1 {
            chords.extend(repeat_n(self.tonic.clone(), bpm));
        }

        let base_prob = rel_chord_rate / bpm as f64;
        while chords.len() < body_end {
            let pos = chords.len();
            let prev = chords[pos - 1].clone();
            let weight = if is_strong_beat(pos, bpm) { STRONG_BEAT_WEIGHT } else { WEAK_BEAT_WEIGHT };

            if self.rng.next_f64() < base_prob * weight {
                let degree = *choose_skewed(&MOVES, FAVOR_FRONT, &mut self.rng)?;
                trace!("beat {pos}: move by degree {degree}");
                chords.push(self.degree_chord(&prev, degree)?);
            } else {
                chords.push(prev);
            }
        }

        if bpm < 4 || rel_chord_rate < 1.0 {
            // Thin meter or slow harmonic rhythm: one substitute held all measure.
            let degree = *choose_skewed(&[lead_to + 4, lead_to + 6], 0.0, &mut self.rng)?;
            let held = self.degree_chord(&self.tonic, degree)?;
            chords.extend(repeat_n(held, bpm));
        } else {
            let resolve = self.degree_chord(&self.tonic, lead_to)?;
            chords.extend(repeat_n(resolve, bpm - 2));
            chords.push(self.degree_chord(&self.tonic, lead_to + 1)?);
            chords.push(self.degree_chord(&self.tonic, lead_to + 4)?);
        }

        debug!(
            "progression: {} chords over {num_measures}x{bpm}, rate {rel_chord_rate:.2}, lead to {lead_to}",
            chords.len()
        );

        Ok(ChordProgression {
            tonic: self.tonic.clone(),
            beats_per_measure: bpm,
            chords,
        })
    }

    /// The chord built on scale degree `n` of `root`, placed in the tonic's
    /// octave. Does not modify `root`.
    pub fn degree_chord(&self, root: &Chord, n: usize) -> Result<Chord, ComposeError> {
        let n = fold_degree(n);
        let tonic_hz = self.tonic.root_hz();
        let root_hz = normalize_octave(root.scale_hz()[n - 1], tonic_hz);

        let offsets = root.scale_offsets();
        let mut shape = [0i16; SCALE_LEN];
        let mut j = n;
        for i in 1..SCALE_LEN {
            let step = if j == SCALE_LEN {
                j = 0;
                offsets[0] - (offsets[SCALE_LEN - 1] - 12)
            } else {
                offsets[j] - offsets[j - 1]
            };
            shape[i] = shape[i - 1] + step;
            j += 1;
        }

        Ok(Chord::from_offsets(root_hz, tonic_hz, shape, &TRIAD, root.chord_type())?
            .with_chromatic(root.chromatic()))
    }
}
