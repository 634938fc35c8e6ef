use std::{io, path::Path};

use rand::{seq::SliceRandom, thread_rng, Rng};
use strum::{FromRepr, VariantArray};
use thiserror::Error;

use crate::{
    assert_interval,
    env::{Environment, Outcome, Transition},
    error::Error as IndexError,
};

/// Errors produced while loading a grid map
#[derive(Error, Debug)]
pub enum MapError {
    #[error("failed to read map")]
    Csv(#[from] csv::Error),
    #[error("map has no cells")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("unrecognized cell `{cell}` at row {row}, column {col}")]
    BadCell {
        cell: String,
        row: usize,
        col: usize,
    },
}

/// One cell of a grid map
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Free = 0,
    Obstacle = 1,
    Lose = 2,
    Win = 3,
}

impl Cell {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Free),
            1 => Some(Self::Obstacle),
            2 => Some(Self::Lose),
            3 => Some(Self::Win),
            _ => None,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Free),
            '#' => Some(Self::Obstacle),
            'L' => Some(Self::Lose),
            'W' => Some(Self::Win),
            _ => None,
        }
    }
}

/// Actions for the [`GridWorld`] environment
#[derive(FromRepr, VariantArray, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GwAction {
    Left = 0,
    Down = 1,
    Right = 2,
    Up = 3,
}

impl GwAction {
    fn delta(self) -> (isize, isize) {
        match self {
            Self::Left => (0, -1),
            Self::Down => (1, 0),
            Self::Right => (0, 1),
            Self::Up => (-1, 0),
        }
    }

    /// The two actions perpendicular to this one, used for slip noise
    fn perpendicular(self) -> [Self; 2] {
        match self {
            Self::Left | Self::Right => [Self::Down, Self::Up],
            Self::Down | Self::Up => [Self::Left, Self::Right],
        }
    }
}

/// Scalar rewards for each step outcome category
#[derive(Clone, Copy, Debug)]
pub struct RewardTable {
    pub step: f32,
    pub win: f32,
    pub lose: f32,
    pub blocked: f32,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            step: -0.04,
            win: 1.0,
            lose: -1.0,
            blocked: -0.04,
        }
    }
}

/// A rectangular grid-world environment
///
/// Cells are free, obstacles, or terminal win/lose cells. States are cell
/// indices in row-major order, so `num_states = rows * cols`. Each step moves
/// one cell in the chosen direction; with probability `slip` the move is
/// replaced by one of its two perpendicular neighbours. Moves into obstacles
/// or off the grid leave the agent in place with [`Outcome::Blocked`].
#[derive(Debug, Clone)]
pub struct GridWorld {
    cells: Vec<Cell>,
    rows: usize,
    cols: usize,
    rewards: RewardTable,
    slip: f32,
}

impl GridWorld {
    fn new(
        cells: Vec<Cell>,
        rows: usize,
        cols: usize,
        rewards: RewardTable,
        slip: f32,
    ) -> Self {
        assert_interval!(slip, 0.0, 1.0);
        Self {
            cells,
            rows,
            cols,
            rewards,
            slip,
        }
    }

    /// Build a grid world from string rows of `.` (free), `#` (obstacle),
    /// `W` (win), and `L` (lose) cells
    pub fn from_rows(rows: &[&str], rewards: RewardTable, slip: f32) -> Result<Self, MapError> {
        let first = rows.first().ok_or(MapError::Empty)?;
        let cols = first.chars().count();
        if cols == 0 {
            return Err(MapError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != cols {
                return Err(MapError::Ragged {
                    row: r,
                    len,
                    expected: cols,
                });
            }
            for (c, ch) in row.chars().enumerate() {
                let cell = Cell::from_char(ch).ok_or_else(|| MapError::BadCell {
                    cell: ch.to_string(),
                    row: r,
                    col: c,
                })?;
                cells.push(cell);
            }
        }

        Ok(Self::new(cells, rows.len(), cols, rewards, slip))
    }

    /// Load a grid world from a headerless CSV map of numeric cell codes
    /// (0 free, 1 obstacle, 2 lose, 3 win)
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        rewards: RewardTable,
        slip: f32,
    ) -> Result<Self, MapError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        Self::parse_csv(reader, rewards, slip)
    }

    /// [`from_csv`](Self::from_csv) over any reader, e.g. an embedded map
    pub fn from_csv_reader<R: io::Read>(
        reader: R,
        rewards: RewardTable,
        slip: f32,
    ) -> Result<Self, MapError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self::parse_csv(reader, rewards, slip)
    }

    fn parse_csv<R: io::Read>(
        mut reader: csv::Reader<R>,
        rewards: RewardTable,
        slip: f32,
    ) -> Result<Self, MapError> {
        let mut cells = Vec::new();
        let mut rows = 0;
        let mut cols = 0;

        for (r, record) in reader.records().enumerate() {
            let record = record?;
            if r == 0 {
                cols = record.len();
            } else if record.len() != cols {
                return Err(MapError::Ragged {
                    row: r,
                    len: record.len(),
                    expected: cols,
                });
            }
            for (c, field) in record.iter().enumerate() {
                let cell = field
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(Cell::from_code)
                    .ok_or_else(|| MapError::BadCell {
                        cell: field.to_string(),
                        row: r,
                        col: c,
                    })?;
                cells.push(cell);
            }
            rows += 1;
        }

        if cells.is_empty() {
            return Err(MapError::Empty);
        }

        Ok(Self::new(cells, rows, cols, rewards, slip))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The state index of a `(row, col)` position
    pub fn state_from_pos(&self, pos: (usize, usize)) -> usize {
        let (row, col) = pos;
        assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    /// The `(row, col)` position of a state index
    pub fn pos_from_state(&self, state: usize) -> (usize, usize) {
        assert!(state < self.cells.len());
        (state / self.cols, state % self.cols)
    }

    /// The cell occupying `state`
    pub fn cell(&self, state: usize) -> Cell {
        self.cells[state]
    }

    /// [`Environment::step`] with a caller-supplied rng
    pub fn step_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        state: usize,
        action: usize,
    ) -> Result<Transition, IndexError> {
        if state >= self.cells.len() {
            return Err(IndexError::InvalidState {
                index: state,
                num_states: self.cells.len(),
            });
        }
        let intended = GwAction::from_repr(action).ok_or(IndexError::InvalidAction {
            index: action,
            num_actions: GwAction::VARIANTS.len(),
        })?;

        let executed = if self.slip > 0.0 && rng.gen::<f32>() < self.slip {
            *intended.perpendicular().choose(rng).unwrap()
        } else {
            intended
        };

        let (row, col) = self.pos_from_state(state);
        let (dr, dc) = executed.delta();
        let target_row = row as isize + dr;
        let target_col = col as isize + dc;

        let in_bounds = (0..self.rows as isize).contains(&target_row)
            && (0..self.cols as isize).contains(&target_col);
        if !in_bounds {
            return Ok(self.observe(state, action, state, self.rewards.blocked, Outcome::Blocked));
        }

        let target = self.state_from_pos((target_row as usize, target_col as usize));
        let (next_state, reward, outcome) = match self.cells[target] {
            Cell::Obstacle => (state, self.rewards.blocked, Outcome::Blocked),
            Cell::Win => (target, self.rewards.win, Outcome::Win),
            Cell::Lose => (target, self.rewards.lose, Outcome::Lose),
            Cell::Free => (target, self.rewards.step, Outcome::Step),
        };
        Ok(self.observe(state, action, next_state, reward, outcome))
    }

    fn observe(
        &self,
        state: usize,
        action: usize,
        next_state: usize,
        reward: f32,
        outcome: Outcome,
    ) -> Transition {
        Transition {
            state,
            action,
            next_state,
            reward,
            outcome,
        }
    }
}

impl Environment for GridWorld {
    fn num_states(&self) -> usize {
        self.cells.len()
    }

    fn num_actions(&self) -> usize {
        GwAction::VARIANTS.len()
    }

    fn step(&mut self, state: usize, action: usize) -> Result<Transition, IndexError> {
        self.step_with(&mut thread_rng(), state, action)
    }
}
