// Deterministic, portable pseudo-random number generator.
//
// xoshiro256++ (Blackman & Vigna, 2019) seeded through SplitMix64. The
// generator is written out by hand so its output stream is fixed by this file
// alone and never drifts with an external crate's version.
//
// `racetrack_gen` draws every random decision from a `TrackRng`: the
// desirability targets of a run, the per-attempt child seeds, and each
// weighted move pick. A run is therefore a pure function of
// `(template, seed)`, and the parallel attempt fan-out can hand each worker
// its own child generator without changing the result.
//
// **Critical constraint: determinism.** Every method must produce identical
// output given the same prior state on every platform. Integer arithmetic
// only; no floating point inside the core generator.

use serde::{Deserialize, Serialize};

/// xoshiro256++ state. The sole source of randomness for track generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRng {
    s: [u64; 4],
}

impl TrackRng {
    /// Create a generator from a `u64` seed.
    ///
    /// SplitMix64 expands the seed into the 256-bit state, so nearby seeds
    /// still produce unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Split off an independent child generator.
    ///
    /// Consumes exactly one `u64` from `self`, so the parent stream advances
    /// identically whether or not the child is ever used.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }

    /// Next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
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

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % span);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Uniform `u32` in `[low, high)`, or `low` when the range is empty.
    ///
    /// The degenerate case mirrors how template target ranges behave: a
    /// `min == max` range always yields `min`.
    pub fn range_u32_or_low(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.range_u64(u64::from(low), u64::from(high)) as u32
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
