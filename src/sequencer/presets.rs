use super::pattern::BassGrid;
use crate::error::{EngineError, Result};
use crate::synth::{BassTimbre, BassType};

/// Genre starting point for the bassline
pub struct Preset {
    pub name: &'static str,
    pub bass_type: BassType,
    pub octave: u8,
    pub cutoff_hz: f32,
    pub resonance_q: f32,
    pub distortion: f32,
    pub glide_ms: f32,
    /// Active cells as (row, step)
    pub cells: &'static [(usize, usize)],
}

pub static PRESETS: [Preset; 8] = [
    Preset {
        name: "trap",
        bass_type: BassType::Eight08,
        octave: 2,
        cutoff_hz: 600.0,
        resonance_q: 3.0,
        distortion: 20.0,
        glide_ms: 50.0,
        cells: &[(7, 0), (7, 4), (7, 7), (7, 8), (7, 12), (7, 14)],
    },
    Preset {
        name: "house",
        bass_type: BassType::Pluck,
        octave: 2,
        cutoff_hz: 1200.0,
        resonance_q: 5.0,
        distortion: 0.0,
        glide_ms: 0.0,
        cells: &[(7, 0), (7, 4), (7, 8), (7, 12)],
    },
    Preset {
        name: "dubstep",
        bass_type: BassType::Growl,
        octave: 1,
        cutoff_hz: 800.0,
        resonance_q: 15.0,
        distortion: 40.0,
        glide_ms: 100.0,
        cells: &[(7, 0), (7, 8), (7, 10)],
    },
    Preset {
        name: "funk",
        bass_type: BassType::Pluck,
        octave: 2,
        cutoff_hz: 1500.0,
        resonance_q: 8.0,
        distortion: 10.0,
        glide_ms: 20.0,
        cells: &[
            (5, 0),
            (5, 3),
            (5, 5),
            (5, 8),
            (5, 11),
            (7, 0),
            (7, 2),
            (7, 6),
            (7, 8),
            (7, 12),
        ],
    },
    Preset {
        name: "hiphop",
        bass_type: BassType::Eight08,
        octave: 2,
        cutoff_hz: 700.0,
        resonance_q: 4.0,
        distortion: 15.0,
        glide_ms: 30.0,
        cells: &[(7, 0), (7, 4), (7, 8), (7, 12), (7, 15)],
    },
    Preset {
        name: "techno",
        bass_type: BassType::Acid,
        octave: 2,
        cutoff_hz: 1000.0,
        resonance_q: 18.0,
        distortion: 25.0,
        glide_ms: 0.0,
        cells: &[
            (5, 0),
            (5, 2),
            (5, 4),
            (5, 6),
            (5, 8),
            (5, 10),
            (5, 12),
            (5, 14),
            (7, 0),
            (7, 4),
            (7, 8),
            (7, 12),
        ],
    },
    Preset {
        name: "dnb",
        bass_type: BassType::Reese,
        octave: 1,
        cutoff_hz: 900.0,
        resonance_q: 12.0,
        distortion: 30.0,
        glide_ms: 80.0,
        cells: &[(6, 8), (7, 0), (7, 8), (7, 12)],
    },
    Preset {
        name: "jazz",
        bass_type: BassType::Sub,
        octave: 2,
        cutoff_hz: 1200.0,
        resonance_q: 6.0,
        distortion: 5.0,
        glide_ms: 40.0,
        cells: &[
            (4, 0),
            (4, 6),
            (4, 12),
            (6, 4),
            (7, 0),
            (7, 4),
            (7, 8),
            (7, 12),
        ],
    },
];

impl Preset {
    pub fn find(name: &str) -> Result<&'static Preset> {
        PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::not_found("preset", name))
    }

    pub fn timbre(&self) -> BassTimbre {
        BassTimbre {
            bass_type: self.bass_type,
            octave: self.octave,
            cutoff_hz: self.cutoff_hz,
            resonance_q: self.resonance_q,
            distortion: self.distortion,
            glide_ms: self.glide_ms,
        }
    }

    /// Fresh grid holding only this preset's cells
    pub fn grid(&self) -> BassGrid {
        let mut grid = BassGrid::new();
        for (row, step) in self.cells {
            if let Err(err) = grid.set(*row, *step, true) {
                tracing::warn!(%err, preset = self.name, "preset cell skipped");
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_builds() {
        for preset in &PRESETS {
            let grid = preset.grid();
            assert_eq!(grid.active_cells().count(), preset.cells.len(), "{}", preset.name);
            assert_eq!(preset.timbre().octave, preset.octave);
        }
    }

    #[test]
    fn lookup_by_name() {
        let trap = Preset::find("Trap").unwrap();
        assert_eq!(trap.bass_type, BassType::Eight08);
        assert!(trap.grid().get(7, 14));
        assert!(Preset::find("polka").is_err());
        assert_eq!(PRESETS.len(), 8);
    }

    #[test]
    fn every_preset_cell_lands_in_the_grid() {
        for preset in PRESETS.iter() {
            let grid = preset.grid();
            assert_eq!(grid.active_cells().count(), preset.cells.len(), "{}", preset.name);
            assert!(preset.cells.iter().all(|(row, step)| grid.get(*row, *step)));
        }
    }
}
