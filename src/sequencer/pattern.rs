use crate::error::{EngineError, Result};

pub const STEPS: usize = 16;
pub const DRUM_TRACKS: usize = 8;
pub const BASS_ROWS: usize = 16;
pub const NUM_SLOTS: usize = 4;

/// Fixed-size boolean step grid; `cells[track][step]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid<const TRACKS: usize> {
    cells: [[bool; STEPS]; TRACKS],
}

pub type DrumGrid = Grid<DRUM_TRACKS>;
pub type BassGrid = Grid<BASS_ROWS>;

impl<const TRACKS: usize> Grid<TRACKS> {
    pub fn new() -> Self {
        Self {
            cells: [[false; STEPS]; TRACKS],
        }
    }

    fn check(track: usize, step: usize) -> Result<()> {
        if track < TRACKS && step < STEPS {
            Ok(())
        } else {
            Err(EngineError::not_found("cell", format!("{}:{}", track, step)))
        }
    }

    /// Toggle a cell, returning its new state
    pub fn toggle(&mut self, track: usize, step: usize) -> Result<bool> {
        Self::check(track, step)?;
        let cell = &mut self.cells[track][step];
        *cell = !*cell;
        Ok(*cell)
    }

    pub fn set(&mut self, track: usize, step: usize, value: bool) -> Result<()> {
        Self::check(track, step)?;
        self.cells[track][step] = value;
        Ok(())
    }

    pub fn get(&self, track: usize, step: usize) -> bool {
        track < TRACKS && step < STEPS && self.cells[track][step]
    }

    /// Tracks with an active cell at `step`, in track order
    pub fn active_at(&self, step: usize) -> impl Iterator<Item = usize> + '_ {
        (0..TRACKS).filter(move |t| self.get(*t, step))
    }

    /// All active cells as (track, step), track-major
    pub fn active_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..TRACKS).flat_map(move |t| (0..STEPS).filter(move |s| self.cells[t][*s]).map(move |s| (t, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.active_cells().next().is_none()
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEPS]; TRACKS];
    }
}

impl<const TRACKS: usize> Default for Grid<TRACKS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved bassline patterns in slots 1..=4, plus a copy/paste clipboard
#[derive(Clone, Debug, Default)]
pub struct PatternBank {
    slots: [Option<BassGrid>; NUM_SLOTS],
    clipboard: Option<BassGrid>,
    current: usize,
}

impl PatternBank {
    pub fn new() -> Self {
        Self {
            current: 1,
            ..Default::default()
        }
    }

    fn index(slot: usize) -> Result<usize> {
        if (1..=NUM_SLOTS).contains(&slot) {
            Ok(slot - 1)
        } else {
            Err(EngineError::not_found("pattern slot", slot))
        }
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Make `slot` current; returns its saved pattern if it holds one
    pub fn select(&mut self, slot: usize) -> Result<Option<BassGrid>> {
        let i = Self::index(slot)?;
        self.current = slot;
        Ok(self.slots[i].clone())
    }

    /// Store a deep copy of `grid` into the current slot
    pub fn save(&mut self, grid: &BassGrid) {
        if let Ok(i) = Self::index(self.current) {
            self.slots[i] = Some(grid.clone());
        }
    }

    /// Saved pattern of the current slot
    pub fn load(&self) -> Result<BassGrid> {
        let i = Self::index(self.current)?;
        self.slots[i]
            .clone()
            .ok_or_else(|| EngineError::not_found("pattern", self.current))
    }

    pub fn copy(&mut self, grid: &BassGrid) {
        self.clipboard = Some(grid.clone());
    }

    pub fn paste(&self) -> Result<BassGrid> {
        self.clipboard
            .clone()
            .ok_or_else(|| EngineError::not_found("clipboard", "empty"))
    }
}
