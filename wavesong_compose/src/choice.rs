// Drawing one entry from an ordered option list.
//
// Harmonic motion, cadence substitutes, chord types, wave characters and
// instrument picks are all "list of options + biased index" draws. They go
// through here so an empty list becomes a `ComposeError::EmptyChoice` rather
// than a panic inside the PRNG.

use crate::error::ComposeError;
use wavesong_prng::GameRng;

/// Skew that favors the front of the list (stronger options listed first).
pub const FAVOR_FRONT: f64 = -0.5;

/// Pick an option with `GameRng::skewed_index` semantics.
pub fn choose_skewed<'a, T>(
    options: &'a [T],
    skew: f64,
    rng: &mut GameRng,
) -> Result<&'a T, ComposeError> {
    if options.is_empty() {
        return Err(ComposeError::EmptyChoice);
    }
    Ok(&options[rng.skewed_index(options.len(), skew)])
}

/// Pick an option uniformly.
pub fn choose_uniform<'a, T>(options: &'a [T], rng: &mut GameRng) -> Result<&'a T, ComposeError> {
    if options.is_empty() {
        return Err(ComposeError::EmptyChoice);
    }
    Ok(&options[rng.uniform(options.len())])
}
