//! # Noise Module
//!
//! Deterministic noise for terrain generation:
//!
//! * [`noise3`]: improved Perlin noise over a fixed permutation table
//! * [`OctaveNoise`]: a sum of noise samples at doubling strides
//! * [`CombinedNoise`]: one column noise warped by another
//!
//! Everything here is a pure function of its inputs, so the same seed always
//! produces the same world no matter which thread generates a chunk.

use noise::NoiseFn;

/// The 256-entry reference permutation.
const REFERENCE_PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225,
    140, 36, 103, 30, 69, 142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148,
    247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219, 203, 117, 35, 11, 32,
    57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122,
    60, 211, 133, 230, 220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54,
    65, 25, 63, 161, 1, 216, 80, 73, 209, 76, 132, 187, 208, 89, 18, 169,
    200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173, 186, 3, 64,
    52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213,
    119, 248, 152, 2, 44, 154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9,
    129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232, 178, 185, 112, 104,
    218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162, 241,
    81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157,
    184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93,
    222, 114, 67, 29, 24, 72, 243, 141, 128, 195, 78, 66, 215, 61, 156, 180,
];

/// The reference permutation repeated twice so lookups never wrap.
static PERMUTATION: [u8; 512] = {
    let mut table = [0u8; 512];
    let mut i = 0;
    while i < 512 {
        table[i] = REFERENCE_PERMUTATION[i & 255];
        i += 1;
    }
    table
};

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

#[inline]
fn lattice(coordinate: f64) -> usize {
    (coordinate.floor() as i64 & 255) as usize
}

/// Improved Perlin noise at `(x, y, z)`, roughly in `[-1, 1]`.
///
/// Zero at every integer lattice point.
pub fn noise3(x: f64, y: f64, z: f64) -> f64 {
    let p = &PERMUTATION;
    let (xi, yi, zi) = (lattice(x), lattice(y), lattice(z));
    let (x, y, z) = (x - x.floor(), y - y.floor(), z - z.floor());
    let (u, v, w) = (fade(x), fade(y), fade(z));

    let a = p[xi] as usize + yi;
    let aa = p[a] as usize + zi;
    let ab = p[a + 1] as usize + zi;
    let b = p[xi + 1] as usize + yi;
    let ba = p[b] as usize + zi;
    let bb = p[b + 1] as usize + zi;

    lerp(
        w,
        lerp(
            v,
            lerp(u, grad(p[aa], x, y, z), grad(p[ba], x - 1.0, y, z)),
            lerp(u, grad(p[ab], x, y - 1.0, z), grad(p[bb], x - 1.0, y - 1.0, z)),
        ),
        lerp(
            v,
            lerp(
                u,
                grad(p[aa + 1], x, y, z - 1.0),
                grad(p[ba + 1], x - 1.0, y, z - 1.0),
            ),
            lerp(
                u,
                grad(p[ab + 1], x, y - 1.0, z - 1.0),
                grad(p[bb + 1], x - 1.0, y - 1.0, z - 1.0),
            ),
        ),
    )
}

/// [`noise3`] as a `noise` crate source.
#[derive(Copy, Clone, Debug, Default)]
pub struct ImprovedNoise;

impl NoiseFn<f64, 3> for ImprovedNoise {
    fn get(&self, point: [f64; 3]) -> f64 {
        noise3(point[0], point[1], point[2])
    }
}

/// A 2D noise over world columns, parameterised by the world seed.
pub trait ColumnNoise: Send + Sync {
    fn compute(&self, seed: i32, x: f64, z: f64) -> f64;
}

/// Sum of `octaves` samples of a 3D source at doubling strides.
///
/// Octave `i` samples `(x / u, z / u, seed + i + seed_offset * 32)` and is
/// weighted by `u`, where `u` starts at 1 and doubles every octave. The third
/// coordinate picks a different slice of the source per seed and per octave.
#[derive(Clone, Debug)]
pub struct OctaveNoise<S = ImprovedNoise> {
    source: S,
    octaves: u32,
    seed_offset: i32,
}

impl OctaveNoise {
    pub fn new(octaves: u32, seed_offset: i32) -> Self {
        OctaveNoise::with_source(ImprovedNoise, octaves, seed_offset)
    }
}

impl<S> OctaveNoise<S> {
    pub fn with_source(source: S, octaves: u32, seed_offset: i32) -> Self {
        OctaveNoise {
            source,
            octaves,
            seed_offset,
        }
    }
}

impl<S: NoiseFn<f64, 3> + Send + Sync> ColumnNoise for OctaveNoise<S> {
    fn compute(&self, seed: i32, x: f64, z: f64) -> f64 {
        let slice = seed as f64 + self.seed_offset as f64 * 32.0;
        let mut sum = 0.0;
        let mut stride = 1.0;
        for octave in 0..self.octaves {
            sum += self.source.get([x / stride, z / stride, slice + octave as f64]) * stride;
            stride *= 2.0;
        }
        sum
    }
}

/// Domain warp: `first` sampled at `x` shifted by `second`.
#[derive(Clone, Debug)]
pub struct CombinedNoise<A, B> {
    first: A,
    second: B,
}

impl<A, B> CombinedNoise<A, B> {
    pub fn new(first: A, second: B) -> Self {
        CombinedNoise { first, second }
    }
}

impl<A: ColumnNoise, B: ColumnNoise> ColumnNoise for CombinedNoise<A, B> {
    fn compute(&self, seed: i32, x: f64, z: f64) -> f64 {
        let warp = self.second.compute(seed, x, z);
        self.first.compute(seed, x + warp, z)
    }
}

#[cfg(test)]
mod tests {
    use noise::Constant;

    use super::*;

    #[test]
    fn test_permutation_is_complete() {
        let mut seen = [false; 256];
        for value in REFERENCE_PERMUTATION {
            assert!(!seen[value as usize], "{value} repeats");
            seen[value as usize] = true;
        }
        assert_eq!(PERMUTATION[256..], PERMUTATION[..256]);
    }

    #[test]
    fn test_lattice_points_are_zero() {
        for (x, y, z) in [(0.0, 0.0, 0.0), (3.0, -7.0, 12.0), (-200.0, 1.0, 300.0)] {
            assert_eq!(noise3(x, y, z), 0.0);
        }
    }

    #[test]
    fn test_noise_is_bounded_and_varies() {
        let mut distinct = 0;
        let mut last = f64::NAN;
        for i in 0..1000 {
            let t = i as f64 * 0.173;
            let value = noise3(t, t * 0.37 - 5.0, 20134.0 + t * 0.11);
            assert!((-1.1..=1.1).contains(&value), "{value} out of range");
            if value != last {
                distinct += 1;
            }
            last = value;
        }
        assert!(distinct > 900);
    }

    #[test]
    fn test_wraps_every_256() {
        let a = noise3(1.25, 2.5, 3.75);
        let b = noise3(1.25 + 256.0, 2.5 - 256.0, 3.75 + 512.0);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_octave_weights_double() {
        let octave = OctaveNoise::with_source(Constant::new(1.0), 4, 0);
        assert_eq!(octave.compute(0, 12.0, -3.0), 1.0 + 2.0 + 4.0 + 8.0);
    }

    #[test]
    fn test_octave_noise_matches_manual_sum() {
        let octave = OctaveNoise::new(3, 2);
        let (seed, x, z) = (20134, 10.4, -7.9);
        let slice = seed as f64 + 64.0;
        let expected = noise3(x, z, slice)
            + noise3(x / 2.0, z / 2.0, slice + 1.0) * 2.0
            + noise3(x / 4.0, z / 4.0, slice + 2.0) * 4.0;
        assert_eq!(octave.compute(seed, x, z), expected);
    }

    #[test]
    fn test_combined_noise_warps_x() {
        let first = OctaveNoise::new(4, 1);
        let warp = OctaveNoise::with_source(Constant::new(0.5), 1, 0);
        let combined = CombinedNoise::new(first.clone(), warp);
        assert_eq!(combined.compute(7, 3.3, 4.4), first.compute(7, 3.8, 4.4));
    }

    #[test]
    fn test_same_inputs_same_output() {
        let noise = CombinedNoise::new(OctaveNoise::new(8, 1), OctaveNoise::new(8, 2));
        assert_eq!(noise.compute(20134, 13.0, -9.1), noise.compute(20134, 13.0, -9.1));
        assert_ne!(noise.compute(20134, 13.0, -9.1), noise.compute(20135, 13.0, -9.1));
    }
}
