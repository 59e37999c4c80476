// wavesong: procedural harmony and song-structure generator.
//
// Produces the plan of a piece of music rather than its audio: which chord
// sounds on every beat of every section, and how sections are ordered,
// repeated, layered and faded. A separate synthesizer consumes the plan
// through the `Renderer` trait.
//
// Architecture:
// - chord.rs: Chord types (the seven diatonic modes), scale frequencies,
//   chromatic alterations, octave folding
// - choice.rs: Skewed/uniform draws over option lists
// - progression.rs: Per-section chord progression generation with a
//   rule-based final cadence, and scale-degree chord derivation
// - instrument.rs: Instrument kinds, wave characters, the factory trait and
//   the stock pattern factory
// - section.rs: Rhythmic grid (`Time`), sections and their parts
// - composer.rs: Whole-piece planning (intro layering, thematic reprise,
//   outro fade)
// - render.rs: Renderer trait and a JSON dump renderer
// - config.rs: Tunable draw ranges, loadable from JSON
// - error.rs: Error types
//
// Output is deterministic given a seed.

pub mod choice;
pub mod chord;
pub mod composer;
pub mod config;
pub mod error;
pub mod instrument;
pub mod progression;
pub mod render;
pub mod section;
