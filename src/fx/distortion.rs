use std::f32::consts::PI;
use std::sync::Arc;

/// Number of points in the transfer curve used by the engine
pub const CURVE_SAMPLES: usize = 44100;

/// Build the waveshaping transfer curve for a drive `amount`.
///
/// Point `i` maps input `x = 2i/n - 1` to
/// `(3 + amount) * x * 20 * (PI / 180) / (PI + amount * |x|)`.
pub fn distortion_curve(amount: f32, samples: usize) -> Vec<f32> {
    let deg = PI / 180.0;
    (0..samples)
        .map(|i| {
            let x = (i as f32 * 2.0) / samples as f32 - 1.0;
            ((3.0 + amount) * x * 20.0 * deg) / (PI + amount * x.abs())
        })
        .collect()
}

/// Waveshaper reading a shared transfer curve with linear interpolation.
///
/// The curve is shared between every voice captured from the same drive
/// setting; a new setting builds a new curve and leaves old voices alone.
#[derive(Clone, Debug)]
pub struct WaveShaper {
    curve: Arc<[f32]>,
}

impl WaveShaper {
    pub fn new(curve: Arc<[f32]>) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    pub fn process(&self, input: f32) -> f32 {
        let n = self.curve.len();
        if n == 0 {
            return input;
        }
        if n == 1 {
            return self.curve[0];
        }
        let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * (n - 1) as f32;
        let i = pos as usize;
        if i >= n - 1 {
            return self.curve[n - 1];
        }
        let frac = pos - i as f32;
        self.curve[i] * (1.0 - frac) + self.curve[i + 1] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curvature(curve: &[f32]) -> f64 {
        curve
            .windows(3)
            .map(|w| (w[0] as f64 + w[2] as f64 - 2.0 * w[1] as f64).abs())
            .sum()
    }

    #[test]
    fn zero_amount_is_linear() {
        let curve = distortion_curve(0.0, 257);
        for (i, y) in curve.iter().enumerate() {
            let x = (i as f32 * 2.0) / 257.0 - 1.0;
            // (3 * 20 deg) / PI = 1/3
            assert!((y - x / 3.0).abs() < 1e-5, "i={} y={} x={}", i, y, x);
        }
        assert!(curvature(&curve) < 1e-4);
    }

    #[test]
    fn curvature_grows_with_amount() {
        let amounts = [0.0, 10.0, 50.0, 200.0];
        let c: Vec<f64> = amounts
            .iter()
            .map(|a| curvature(&distortion_curve(*a, 257)))
            .collect();
        for pair in c.windows(2) {
            assert!(pair[1] > pair[0], "{:?}", c);
        }
    }

    #[test]
    fn curve_is_odd_and_bounded() {
        let curve = distortion_curve(80.0, CURVE_SAMPLES);
        assert_eq!(curve.len(), CURVE_SAMPLES);
        assert!(curve.iter().all(|y| y.abs() <= 1.5));
        assert!(curve[0] < 0.0);
        assert!(curve[CURVE_SAMPLES - 1] > 0.0);
    }

    #[test]
    fn shaper_interpolates() {
        let shaper = WaveShaper::new(vec![-1.0, 0.0, 1.0].into());
        assert_eq!(shaper.process(0.0), 0.0);
        assert!((shaper.process(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(shaper.process(2.0), 1.0);
        assert_eq!(shaper.process(-2.0), -1.0);
    }
}
