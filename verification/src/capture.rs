//! Simulated biometric capture.
//!
//! A capture is reduced to a 32-byte `0x`-prefixed hex digest (66 chars).
//! The digest identifies the capture; it carries no biometric features.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{RandomSource, VerificationError};

pub const DIGEST_BYTES: usize = 32;

/// Face digest returned when camera capture is disabled.
pub const DEMO_FACE_DATA: &str =
    "0xfacefacefacefacefacefacefacefacefacefacefacefacefacefacefaceface";

pub const FINGERPRINT_SIZE: u32 = 300;
const RIDGES: u32 = 35;
const MINUTIAE: u32 = 30;
const RIDGE_SHADE: u8 = 0x11;
const ANGLE_STEP: f64 = 0.05;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Rasterize a seeded ridge pattern and digest it.
    #[default]
    Pattern,
    /// Skip rendering and return random bytes.
    Random,
}

/// Sample `data` at a fixed stride into at most 32 bytes of hex.
///
/// Inputs shorter than 32 bytes produce a correspondingly shorter digest.
pub fn sample_hex(data: &[u8]) -> String {
    let step = (data.len() / DIGEST_BYTES).max(1);
    let sampled: Vec<u8> = data.iter().step_by(step).take(DIGEST_BYTES).copied().collect();
    format!("0x{}", hex::encode(sampled))
}

/// Fold `data` into 32 lanes (FNV-1a per lane) and hex encode the low byte of each.
pub fn digest_hex(data: &[u8]) -> String {
    let mut lanes = [0x811c_9dc5u32; DIGEST_BYTES];
    for (i, b) in data.iter().enumerate() {
        let lane = &mut lanes[i % DIGEST_BYTES];
        *lane ^= u32::from(*b);
        *lane = lane.wrapping_mul(0x0100_0193);
    }
    let bytes: Vec<u8> = lanes.iter().map(|l| (*l ^ (*l >> 16)) as u8).collect();
    format!("0x{}", hex::encode(bytes))
}

/// Digest of a captured camera frame (encoded image bytes).
pub fn face_from_frame(frame: &[u8]) -> Result<String, VerificationError> {
    if frame.is_empty() {
        return Err(VerificationError::EmptyFrame);
    }
    Ok(sample_hex(frame))
}

pub fn capture_fingerprint(mode: FingerprintMode, random: &dyn RandomSource) -> String {
    match mode {
        FingerprintMode::Pattern => {
            let image = render_fingerprint(random.next_u64());
            digest_hex(&image.pixels)
        }
        FingerprintMode::Random => {
            let mut bytes = Vec::with_capacity(DIGEST_BYTES);
            while bytes.len() < DIGEST_BYTES {
                bytes.extend_from_slice(&random.next_u64().to_be_bytes());
            }
            format!("0x{}", hex::encode(bytes))
        }
    }
}

/// An 8-bit grayscale raster, white background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GrayImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0xff; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Set a pixel; out-of-bounds coordinates are ignored.
    pub fn plot(&mut self, x: f64, y: f64, shade: u8) {
        let (xi, yi) = (x.round(), y.round());
        if xi < 0.0 || yi < 0.0 {
            return;
        }
        let (xi, yi) = (xi as u32, yi as u32);
        if xi < self.width && yi < self.height {
            self.pixels[(yi * self.width + xi) as usize] = shade;
        }
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), shade: u8) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        for s in 0..=steps {
            let t = f64::from(s) / f64::from(steps);
            self.plot(from.0 + dx * t, from.1 + dy * t, shade);
        }
    }

    pub fn disc(&mut self, center: (f64, f64), radius: f64, shade: u8) {
        let r = radius.ceil() as i64;
        for oy in -r..=r {
            for ox in -r..=r {
                let (fx, fy) = (ox as f64, oy as f64);
                if fx * fx + fy * fy <= radius * radius {
                    self.plot(center.0 + fx, center.1 + fy, shade);
                }
            }
        }
    }
}

/// Draw a synthetic fingerprint: a dark core, concentric jittered ridge
/// ellipses and scattered minutiae dots. The same seed yields the same image.
pub fn render_fingerprint(seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut image = GrayImage::blank(FINGERPRINT_SIZE, FINGERPRINT_SIZE);
    let center = (
        f64::from(FINGERPRINT_SIZE) / 2.0,
        f64::from(FINGERPRINT_SIZE) / 2.0,
    );

    image.disc(center, 5.0, 0);

    for i in 0..RIDGES {
        let radius_x = 30.0 + f64::from(i) * 5.0 + rng.gen::<f64>() * 10.0;
        let radius_y = 20.0 + f64::from(i) * 5.0 + rng.gen::<f64>() * 10.0;
        let rotation = rng.gen::<f64>() * PI / 4.0;
        let (sin_r, cos_r) = rotation.sin_cos();

        let mut previous: Option<(f64, f64)> = None;
        let mut angle = 0.0;
        while angle < 2.0 * PI {
            let jitter_x = rng.gen::<f64>() * 5.0 - 2.5;
            let jitter_y = rng.gen::<f64>() * 5.0 - 2.5;
            let (sin_a, cos_a) = angle.sin_cos();
            let point = (
                center.0 + cos_a * radius_x * cos_r - sin_a * radius_y * sin_r + jitter_x,
                center.1 + cos_a * radius_x * sin_r + sin_a * radius_y * cos_r + jitter_y,
            );
            if let Some(prev) = previous {
                image.line(prev, point, RIDGE_SHADE);
            }
            previous = Some(point);
            angle += ANGLE_STEP;
        }
    }

    for _ in 0..MINUTIAE {
        let angle = rng.gen::<f64>() * 2.0 * PI;
        let distance = 30.0 + rng.gen::<f64>() * 100.0;
        let point = (
            center.0 + angle.cos() * distance,
            center.1 + angle.sin() * distance,
        );
        image.disc(point, 1.0, 0);
    }

    image
}
