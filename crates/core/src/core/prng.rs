// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure and makes no claim of statistical rigor.
// It only has to pick stimulus cells that a human cannot anticipate.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::CellSource;

const ZERO_STATE_REPLACEMENT: u64 = 0x9E3779B97F4A7C15;

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 {
            ZERO_STATE_REPLACEMENT
        } else {
            seed
        };
        Self { state: seed }
    }

    /// Seed from the wall clock so consecutive sessions differ.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ ZERO_STATE_REPLACEMENT.rotate_left(17))
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Integer in `[0, span)`; `0` when `span` is `0`.
    #[inline]
    pub fn gen_index(&mut self, span: usize) -> usize {
        if span <= 1 {
            return 0;
        }
        // Multiply-shift keeps the draw uniform enough without a modulo.
        let span = span as u128;
        ((self.next_u64() as u128 * span) >> 64) as usize
    }
}

impl Default for Prng {
    fn default() -> Self {
        Self::from_time()
    }
}

impl CellSource for Prng {
    fn draw_cell(&mut self, cells_per_box: usize) -> usize {
        self.gen_index(cells_per_box)
    }
}
