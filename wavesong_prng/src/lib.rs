// Deterministic, seedable pseudo-random source for wavesong.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) seeded through SplitMix64,
// plus the small set of draw primitives the composer works in terms of:
// bounded uniform integers, even integers in a range, unit-interval floats,
// Bernoulli trials and skewed index draws over an ordered option list.
//
// Every generator and composer in `wavesong_compose` owns its own `GameRng`.
// Child generators get their stream from `fork()`, so a whole piece is a pure
// function of the single seed handed to the composer.
//
// The integer core never touches floating point. `skewed_index` shapes its
// draw with `powf`, which is deterministic on a given platform but is not
// guaranteed bit-identical across libm implementations.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a generator from a `u64` seed.
    ///
    /// The seed is expanded to 256 bits with SplitMix64, so nearby seeds
    /// still give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { s }
    }

    /// Derive an independent child generator, advancing this one by one step.
    pub fn fork(&mut self) -> Self {
        GameRng::new(self.next_u64())
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[0]
            .wrapping_add(self.s[3])
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1) built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[0, bound)`.
    ///
    /// Panics if `bound == 0`.
    pub fn uniform(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "uniform: bound must be positive");
        self.range_u64(0, bound as u64) as usize
    }

    /// Uniform `usize` in `[low, high]`, inclusive on both ends.
    ///
    /// Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as usize
    }

    /// Uniform even integer in `[min, max]`.
    ///
    /// Panics if the range holds no even value.
    pub fn even_in_range(&mut self, min: usize, max: usize) -> usize {
        let lo = min.div_ceil(2);
        let hi = max / 2;
        assert!(lo <= hi, "even_in_range: no even value in [{min}, {max}]");
        self.range_usize_inclusive(lo, hi) * 2
    }

    /// `true` with probability `p`. `p <= 0` never fires, `p >= 1` always does.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Index into an ordered list of `n` options, biased by `skew`.
    ///
    /// `skew == 0` is uniform. Negative skew favors the front of the list,
    /// positive skew the back. The unit draw is raised to `4^(-skew)` before
    /// scaling (so `-0.5` squares it), and any finite skew is accepted.
    ///
    /// Panics if `n == 0`.
    pub fn skewed_index(&mut self, n: usize, skew: f64) -> usize {
        assert!(n > 0, "skewed_index: n must be positive");
        let exponent = 4f64.powf(-skew);
        let shaped = self.next_f64().powf(exponent);
        ((shaped * n as f64) as usize).min(n - 1)
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
