//! Stimulus generation and the session history buffer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridShape;
use crate::prng::Prng;
use crate::settings::Settings;
use crate::validator;

/// Where the engine gets its cell draws from.
///
/// The default is [`Prng`]; tests substitute a scripted source to pin the
/// history down exactly.
pub trait CellSource {
    /// Draw one cell index in `[0, cells_per_box)`.
    fn draw_cell(&mut self, cells_per_box: usize) -> usize;
}

/// The cells lit on one turn, one entry per box.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StimulusFrame {
    pub turn: u64,
    pub cells: Vec<usize>,
}

impl StimulusFrame {
    pub fn cell(&self, box_index: usize) -> Option<usize> {
        self.cells.get(box_index).copied()
    }

    pub fn box_count(&self) -> usize {
        self.cells.len()
    }
}

/// Append-only record of every frame since the session started.
///
/// `frames[t].turn == t` for every stored frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    frames: Vec<StimulusFrame>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from per-turn cell vectors, turn 0 first.
    pub fn from_cells<I>(turns: I) -> Self
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let mut h = Self::new();
        for cells in turns {
            h.push(cells);
        }
        h
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, turn: u64) -> Option<&StimulusFrame> {
        usize::try_from(turn).ok().and_then(|t| self.frames.get(t))
    }

    pub fn cell(&self, turn: u64, box_index: usize) -> Option<usize> {
        self.get(turn).and_then(|f| f.cell(box_index))
    }

    pub fn last(&self) -> Option<&StimulusFrame> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StimulusFrame> {
        self.frames.iter()
    }

    /// Cells shown in one box across all turns.
    pub fn box_track(&self, box_index: usize) -> Vec<Option<usize>> {
        self.frames.iter().map(|f| f.cell(box_index)).collect()
    }

    fn push(&mut self, cells: Vec<usize>) -> &StimulusFrame {
        let turn = self.frames.len() as u64;
        self.frames.push(StimulusFrame { turn, cells });
        &self.frames[self.frames.len() - 1]
    }

    fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Owns the turn counter and history of one session.
///
/// The settings are copied at [`start`](Self::start); later edits to the
/// caller's settings never reach a running session.
#[derive(Debug, Clone)]
pub struct SequenceEngine<R = Prng> {
    source: R,
    settings: Settings,
    shape: Option<GridShape>,
    history: History,
    current: Option<u64>,
    running: bool,
}

impl SequenceEngine<Prng> {
    pub fn new() -> Self {
        Self::with_source(Prng::from_time())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(Prng::new(seed))
    }
}

impl Default for SequenceEngine<Prng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CellSource> SequenceEngine<R> {
    pub fn with_source(source: R) -> Self {
        Self {
            source,
            settings: Settings::default(),
            shape: None,
            history: History::new(),
            current: None,
            running: false,
        }
    }

    /// Reset and immediately produce turn 0.
    ///
    /// Turn 0 is drawn before anything is reset, so on failure the previous
    /// session, if any, is left as it was.
    pub fn start(&mut self, settings: &Settings) -> Result<&StimulusFrame> {
        settings.validate()?;
        let shape = settings.shape()?;
        let cells = self.draw(shape);

        self.settings = *settings;
        self.shape = Some(shape);
        self.history.clear();
        self.current = Some(0);
        self.running = true;
        Ok(self.history.push(cells))
    }

    /// Advance one turn, drawing an independent cell for every box.
    pub fn next_turn(&mut self) -> Result<&StimulusFrame> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        let shape = self.shape.ok_or(Error::NotRunning)?;
        let cells = self.draw(shape);

        let turn = self.current.map_or(0, |t| t + 1);
        self.current = Some(turn);
        let frame = self.history.push(cells);
        debug_assert_eq!(frame.turn, turn);
        Ok(frame)
    }

    fn draw(&mut self, shape: GridShape) -> Vec<usize> {
        let per_box = shape.cells_per_box();
        (0..shape.box_count())
            // Keep the range invariant even for a misbehaving source.
            .map(|_| self.source.draw_cell(per_box).min(per_box - 1))
            .collect()
    }

    /// Halt the session. History stays readable until the next start.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Index of the newest turn; `None` before the first turn.
    pub fn current_turn(&self) -> Option<u64> {
        self.current
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_frame(&self) -> Option<&StimulusFrame> {
        self.history.last()
    }

    /// Settings the current (or last) session was started with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn shape(&self) -> Option<GridShape> {
        self.shape
    }

    /// Does the newest turn in `box_index` repeat the cell from `n` turns back?
    pub fn check(&self, box_index: usize) -> Result<bool> {
        validator::check(box_index, self.current, self.settings.n, &self.history)
    }
}
