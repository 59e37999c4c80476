// Instrument parts: turning a chord progression into notes.
//
// An instrument is a kind (its musical role), a synthesis wave character, a
// mix weight and a list of notes on the section's subdivision grid. How the
// notes are chosen is the factory's business; the composer only asks for "a
// part of this kind over this time and progression" through the
// `InstrumentFactory` trait.
//
// `PatternFactory` is the stock factory:
// - Bass: chord root an octave down, held for each run of an unchanged chord
// - Pad: the full chord, held for each run
// - Melody: one chord tone per beat an octave up, sometimes split in two
// - Arpeggio: cycles the chord tones on every subdivision

use crate::choice::choose_uniform;
use crate::chord::Chord;
use crate::error::ComposeError;
use crate::progression::ChordProgression;
use crate::section::Time;
use serde::{Deserialize, Serialize};
use wavesong_prng::GameRng;

/// Musical role of a part. Every section carries at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentKind {
    Bass,
    Pad,
    Melody,
    Arpeggio,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 4] = [
        InstrumentKind::Bass,
        InstrumentKind::Pad,
        InstrumentKind::Melody,
        InstrumentKind::Arpeggio,
    ];
}

/// Oscillator character used by the external synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wave {
    Sine,
    Saw,
    Square,
    Triangle,
    /// Band-limited saw.
    SoftSaw,
}

impl Wave {
    pub const ALL: [Wave; 5] = [Wave::Sine, Wave::Saw, Wave::Square, Wave::Triangle, Wave::SoftSaw];
}

/// A sounding event: one or more frequencies held for `length` subdivisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Onset, in subdivisions from the start of the part.
    pub start: usize,
    pub length: usize,
    pub hz: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub wave: Wave,
    /// Mix weight, nominally in (0, 1].
    pub weight: f64,
    pub time: Time,
    pub notes: Vec<Note>,
}

impl Instrument {
    /// Rhythmic escalation for reprised material.
    ///
    /// Every note of two or more subdivisions is split in half. The second
    /// half either re-attacks the same pitches or leaps an octave up.
    pub fn complexify(&mut self, rng: &mut GameRng) {
        let mut notes = Vec::with_capacity(self.notes.len() * 2);
        for note in self.notes.drain(..) {
            if note.length < 2 {
                notes.push(note);
                continue;
            }
            let first = note.length / 2;
            let hz = if rng.random_bool(0.5) {
                note.hz.iter().map(|f| f * 2.0).collect()
            } else {
                note.hz.clone()
            };
            notes.push(Note {
                start: note.start,
                length: first,
                hz: note.hz,
            });
            notes.push(Note {
                start: note.start + first,
                length: note.length - first,
                hz,
            });
        }
        self.notes = notes;
    }

    /// Subdivisions covered by the last note.
    pub fn span(&self) -> usize {
        self.notes.last().map_or(0, |n| n.start + n.length)
    }
}

/// Everything a factory needs to build one part.
#[derive(Debug, Clone, Copy)]
pub struct PartRequest<'a> {
    pub kind: InstrumentKind,
    pub wave: Wave,
    pub time: &'a Time,
    pub progression: &'a ChordProgression,
    pub weight: f64,
}

/// Assembles instrument parts from a progression.
pub trait InstrumentFactory {
    fn instrument(&mut self, request: PartRequest<'_>) -> Result<Instrument, ComposeError>;
}

/// Default pattern-based factory with its own random stream.
#[derive(Debug, Clone)]
pub struct PatternFactory {
    rng: GameRng,
}

impl PatternFactory {
    pub fn new(rng: GameRng) -> Self {
        PatternFactory { rng }
    }

    fn melody(&mut self, request: &PartRequest<'_>, per_beat: usize) -> Result<Vec<Note>, ComposeError> {
        let mut notes = Vec::new();
        for (beat, chord) in request.progression.iter().enumerate() {
            let tones = chord.tone_hz();
            let start = beat * per_beat;
            let pitch = *choose_uniform(&tones, &mut self.rng)? * 2.0;
            if per_beat >= 2 && self.rng.random_bool(0.25) {
                let first = per_beat / 2;
                let answer = *choose_uniform(&tones, &mut self.rng)? * 2.0;
                notes.push(Note { start, length: first, hz: vec![pitch] });
                notes.push(Note {
                    start: start + first,
                    length: per_beat - first,
                    hz: vec![answer],
                });
            } else {
                notes.push(Note { start, length: per_beat, hz: vec![pitch] });
            }
        }
        Ok(notes)
    }
}

impl InstrumentFactory for PatternFactory {
    fn instrument(&mut self, request: PartRequest<'_>) -> Result<Instrument, ComposeError> {
        let time = request.time;
        if request.progression.len() != time.total_beats() {
            return Err(ComposeError::InvalidConfig(format!(
                "progression has {} chords but the section has {} beats",
                request.progression.len(),
                time.total_beats()
            )));
        }
        let per_beat = time.subdivisions_per_beat();

        let notes = match request.kind {
            InstrumentKind::Bass => held_runs(request.progression, per_beat, |c| vec![c.root_hz() / 2.0]),
            InstrumentKind::Pad => held_runs(request.progression, per_beat, |c| c.tone_hz()),
            InstrumentKind::Melody => self.melody(&request, per_beat)?,
            InstrumentKind::Arpeggio => {
                let mut notes = Vec::with_capacity(time.total_subdivisions());
                for (beat, chord) in request.progression.iter().enumerate() {
                    let tones = chord.tone_hz();
                    for sub in 0..per_beat {
                        let step = beat * per_beat + sub;
                        notes.push(Note {
                            start: step,
                            length: 1,
                            hz: vec![tones[step % tones.len()]],
                        });
                    }
                }
                notes
            }
        };

        Ok(Instrument {
            kind: request.kind,
            wave: request.wave,
            weight: request.weight,
            time: *time,
            notes,
        })
    }
}

/// One note per run of identical consecutive chords.
fn held_runs(
    progression: &ChordProgression,
    per_beat: usize,
    voicing: impl Fn(&Chord) -> Vec<f64>,
) -> Vec<Note> {
    let chords = progression.chords();
    let mut notes = Vec::new();
    let mut beat = 0;
    while beat < chords.len() {
        let mut end = beat + 1;
        while end < chords.len() && chords[end] == chords[beat] {
            end += 1;
        }
        notes.push(Note {
            start: beat * per_beat,
            length: (end - beat) * per_beat,
            hz: voicing(&chords[beat]),
        });
        beat = end;
    }
    notes
}
