//! Deterministic synthetic NIR kits for tests and the demo binary.

use crate::data::model::{MeasurementRecord, Spectrum, SpectrumTable};
use crate::error::Result;

/// Gaussian absorption band centred on `centre`.
fn band(x: f64, centre: f64, width: f64, depth: f64) -> f64 {
    let z = (x - centre) / width;
    depth * (-0.5 * z * z).exp()
}

/// Seeded xoshiro256** stream; kits are reproducible from `KitBuilder::seed`.
struct KitRng {
    s: [u64; 4],
}

impl KitRng {
    /// Expand the seed with splitmix64 so nearby seeds give unrelated streams.
    fn seeded(seed: u64) -> Self {
        let mut z = seed;
        let mut s = [0u64; 4];
        for word in &mut s {
            z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut x = z;
            x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            *word = x ^ (x >> 31);
        }
        KitRng { s }
    }

    fn next_u64(&mut self) -> u64 {
        let [a, b, c, d] = &mut self.s;
        let out = b.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *b << 17;
        *c ^= *a;
        *d ^= *b;
        *b ^= *c;
        *a ^= *d;
        *c ^= t;
        *d = d.rotate_left(45);
        out
    }

    /// Uniform in `(0, 1]`.
    fn unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean normal deviate with standard deviation `sigma`.
    fn noise(&mut self, sigma: f64) -> f64 {
        let radius = (-2.0 * self.unit().ln()).sqrt();
        let angle = std::f64::consts::TAU * self.unit();
        sigma * radius * angle.cos()
    }
}

// ---------------------------------------------------------------------------
// Standard profiles
// ---------------------------------------------------------------------------

/// Absorption bands `(centre_channel, width, amplitude)` over a flat level.
#[derive(Debug, Clone)]
pub struct StandardProfile {
    pub id: String,
    pub level: f64,
    pub bands: Vec<(f64, f64, f64)>,
}

impl StandardProfile {
    /// Noise-free spectrum over `channels` channels.
    pub fn render(&self, channels: usize) -> Vec<f64> {
        (0..channels)
            .map(|i| {
                let x = i as f64;
                self.level
                    + self
                        .bands
                        .iter()
                        .map(|&(centre, width, depth)| band(x, centre, width, depth))
                        .sum::<f64>()
            })
            .collect()
    }
}

/// Shift a spectrum by `k` channels (`out[i] = s[i - k]`), repeating the
/// edge value where data runs out.
pub fn shift_channels(s: &[f64], k: i64) -> Vec<f64> {
    let n = s.len() as i64;
    (0..n)
        .map(|i| s[(i - k).clamp(0, n - 1) as usize])
        .collect()
}

/// `count` standards with distinct band layouts, ids `STD-01`, `STD-02`, …
pub fn standard_profiles(count: usize, channels: usize) -> Vec<StandardProfile> {
    let c = channels as f64;
    (0..count)
        .map(|k| {
            let kf = k as f64;
            StandardProfile {
                id: format!("STD-{:02}", k + 1),
                level: 0.1 + 0.05 * kf,
                bands: vec![
                    (c * (0.2 + 0.03 * kf), c * 0.04, 0.3 + 0.1 * kf),
                    (c * 0.55, c * (0.03 + 0.005 * kf), 0.5),
                    (c * (0.8 - 0.02 * kf), c * 0.02, 0.2 + 0.05 * kf),
                ],
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// KitBuilder
// ---------------------------------------------------------------------------

/// Builds reference-lamp and new-lamp tables for a synthetic kit.
///
/// The new lamp adds `lamp_offset + lamp_slope * channel` to every
/// standard, plus per-replicate Gaussian noise.
#[derive(Debug, Clone)]
pub struct KitBuilder {
    pub channels: usize,
    pub standards: usize,
    pub replicates: usize,
    pub noise: f64,
    pub lamp_offset: f64,
    pub lamp_slope: f64,
    /// Standards whose new-lamp spectra are shifted by the given channels.
    pub shifted: Vec<(String, i64)>,
    pub seed: u64,
}

impl Default for KitBuilder {
    fn default() -> Self {
        KitBuilder {
            channels: 256,
            standards: 6,
            replicates: 3,
            noise: 0.0005,
            lamp_offset: 0.01,
            lamp_slope: 0.00002,
            shifted: Vec::new(),
            seed: 42,
        }
    }
}

/// Synthetic kit: the two lamp tables plus the noise-free profiles.
pub struct SyntheticKit {
    pub reference: SpectrumTable,
    pub new: SpectrumTable,
    pub profiles: Vec<StandardProfile>,
}

pub const REFERENCE_LAMP: &str = "lamp-ref";
pub const NEW_LAMP: &str = "lamp-new";

impl KitBuilder {
    pub fn build(&self) -> Result<SyntheticKit> {
        let mut rng = KitRng::seeded(self.seed);
        let profiles = standard_profiles(self.standards, self.channels);

        let mut reference = Vec::new();
        let mut new = Vec::new();
        for profile in &profiles {
            let clean = profile.render(self.channels);
            let shift = self
                .shifted
                .iter()
                .find(|(id, _)| *id == profile.id)
                .map_or(0, |&(_, k)| k);
            let moved = shift_channels(&clean, shift);

            for _ in 0..self.replicates {
                let r: Vec<f64> = clean
                    .iter()
                    .map(|&v| v + rng.noise(self.noise))
                    .collect();
                reference.push(
                    MeasurementRecord::new(profile.id.clone(), Spectrum::new(r))
                        .with_note(REFERENCE_LAMP),
                );

                let n: Vec<f64> = moved
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        v + self.lamp_offset
                            + self.lamp_slope * i as f64
                            + rng.noise(self.noise)
                    })
                    .collect();
                new.push(
                    MeasurementRecord::new(profile.id.clone(), Spectrum::new(n))
                        .with_note(NEW_LAMP),
                );
            }
        }

        Ok(SyntheticKit {
            reference: SpectrumTable::build(reference)?,
            new: SpectrumTable::build(new)?,
            profiles,
        })
    }
}
