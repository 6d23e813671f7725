use rand::Rng;

use super::drum::{DrumPatch, DrumVoice, Percussion};
use super::osc::samples_for;

/// Render `duration` seconds of a percussive sound into a buffer.
///
/// The buffer holds exactly `ceil(sample_rate * duration)` samples in
/// `[-1, 1]`; time past the sound's natural length is silence. Noise layers
/// are seeded from `rng`, so only the envelope and spectral shape repeat.
pub fn generate<R: Rng + ?Sized>(
    kind: Percussion,
    duration: f32,
    sample_rate: f32,
    rng: &mut R,
) -> Vec<f32> {
    render_patch(&kind.patch(), duration, sample_rate, rng.gen())
}

/// Render a patch at its natural length
pub fn render_natural<R: Rng + ?Sized>(kind: Percussion, sample_rate: f32, rng: &mut R) -> Vec<f32> {
    let patch = kind.patch();
    render_patch(&patch, patch.duration(), sample_rate, rng.gen())
}

fn render_patch(patch: &DrumPatch, duration: f32, sample_rate: f32, seed: u32) -> Vec<f32> {
    let len = samples_for(duration, sample_rate);
    if len == 0 {
        return Vec::new();
    }
    let mut voice = DrumVoice::new(patch, sample_rate, seed);
    (0..len).map(|_| voice.next_sample()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::DrumKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rms(buf: &[f32]) -> f32 {
        if buf.is_empty() {
            return 0.0;
        }
        (buf.iter().map(|s| s * s).sum::<f32>() / buf.len() as f32).sqrt()
    }

    #[test]
    fn length_is_ceil_of_duration_times_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        for kind in Percussion::all() {
            for (d, sr) in [(0.1f32, 44100.0f32), (0.25, 48000.0), (0.0333, 22050.0), (1.0, 8000.0)] {
                let buf = generate(kind, d, sr, &mut rng);
                let expected = samples_for(d, sr);
                assert_eq!(buf.len(), expected, "{} d={} sr={}", kind.name(), d, sr);
                assert!(buf.iter().all(|s| (-1.0..=1.0).contains(s)));
            }
        }
    }

    #[test]
    fn cached_and_live_lengths_agree() {
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(generate(Percussion::Drum(DrumKind::HiHat), 0.1, 44100.0, &mut rng).len(), 4410);
        for kind in Percussion::all() {
            let buf = render_natural(kind, 44100.0, &mut rng);
            let live = DrumVoice::new(&kind.patch(), 44100.0, 7);
            assert_eq!(buf.len(), live.duration_samples(), "{}", kind.name());
        }
    }

    #[test]
    fn hats_stay_finite_at_low_rates() {
        let mut rng = StdRng::seed_from_u64(5);
        for (kind, d, sr) in [(DrumKind::HiHat, 0.0333f32, 22050.0f32), (DrumKind::OpenHat, 1.0, 8000.0)] {
            let buf = generate(Percussion::Drum(kind), d, sr, &mut rng);
            assert!(buf.iter().all(|s| s.is_finite()), "{} at {}", kind.name(), sr);
            assert!(rms(&buf[..buf.len() / 10]) > 0.01);
        }
    }

    #[test]
    fn zero_duration_is_empty() {
        let mut rng = StdRng::seed_from_u64(2);
        for kind in Percussion::all() {
            assert!(generate(kind, 0.0, 44100.0, &mut rng).is_empty());
        }
    }

    #[test]
    fn sounds_decay() {
        let mut rng = StdRng::seed_from_u64(3);
        for kind in DrumKind::ALL {
            let buf = render_natural(Percussion::Drum(kind), 44100.0, &mut rng);
            let tenth = buf.len() / 10;
            let head = rms(&buf[..tenth]);
            let tail = rms(&buf[buf.len() - tenth..]);
            assert!(head > tail, "{} head={} tail={}", kind.name(), head, tail);
        }
    }

    #[test]
    fn tonal_kinds_ignore_the_seed() {
        let a = generate(Percussion::Drum(DrumKind::Kick), 0.2, 44100.0, &mut StdRng::seed_from_u64(1));
        let b = generate(Percussion::Drum(DrumKind::Kick), 0.2, 44100.0, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn noise_kinds_share_an_envelope() {
        let a = generate(Percussion::Drum(DrumKind::HiHat), 0.1, 44100.0, &mut StdRng::seed_from_u64(1));
        let b = generate(Percussion::Drum(DrumKind::HiHat), 0.1, 44100.0, &mut StdRng::seed_from_u64(2));
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
        let window = a.len() / 4;
        let (ra, rb) = (rms(&a[..window]), rms(&b[..window]));
        assert!((ra - rb).abs() < ra * 0.5, "{} vs {}", ra, rb);
    }
}
