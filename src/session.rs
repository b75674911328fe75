//! Client-side session state: revealed tiles, hazards and row progression.
//!
//! Every transition is synchronous and silently ignores calls whose
//! preconditions do not hold; the board simply does not react.

use crate::board::{
    Multiplier,
    Row,
    RowId,
    TileId,
    demo_row_index,
    demo_rows,
    generate_row,
};
use rand::Rng;
use std::collections::BTreeSet;

pub const INITIAL_ROWS: u32 = 3;
pub const ROWS_PER_LEVEL_UP: u32 = 2;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GameState {
    #[default]
    Playing,
    Lost,
    CashedOut,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RevealOutcome {
    Ignored,
    Hazard,
    Advanced { current_row_index: usize },
    LevelUp { level: u32, total_rows: u32 },
}

#[derive(Clone, Debug)]
pub struct Session {
    state: GameState,
    level: u32,
    total_rows: u32,
    current_row_index: usize,
    revealed: BTreeSet<TileId>,
    hazards: BTreeSet<TileId>,
    completed_rows: BTreeSet<RowId>,
}

impl Session {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut session = Self {
            state: GameState::Playing,
            level: 1,
            total_rows: INITIAL_ROWS,
            current_row_index: 0,
            revealed: BTreeSet::new(),
            hazards: BTreeSet::new(),
            completed_rows: BTreeSet::new(),
        };
        session.initialize(rng);
        session
    }

    /// Fresh three-row board with the bottom row active.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.state = GameState::Playing;
        self.revealed.clear();
        self.completed_rows.clear();
        self.hazards.clear();
        self.total_rows = INITIAL_ROWS;
        self.level = 1;
        self.current_row_index = (INITIAL_ROWS - 1) as usize;
        for level in 1..=INITIAL_ROWS {
            self.place_hazard(level, rng);
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn total_rows(&self) -> u32 {
        self.total_rows
    }

    pub fn current_row_index(&self) -> usize {
        self.current_row_index
    }

    pub fn revealed(&self) -> &BTreeSet<TileId> {
        &self.revealed
    }

    pub fn hazards(&self) -> &BTreeSet<TileId> {
        &self.hazards
    }

    pub fn completed_rows(&self) -> &BTreeSet<RowId> {
        &self.completed_rows
    }

    pub fn rows(&self) -> Vec<Row> {
        demo_rows(self.total_rows)
    }

    pub fn current_row(&self) -> Row {
        let level = self.total_rows - self.current_row_index as u32;
        generate_row(level)
    }

    pub fn current_multiplier(&self) -> Multiplier {
        self.current_row().multiplier
    }

    pub fn row_index(&self, row: RowId) -> Option<usize> {
        demo_row_index(self.total_rows, row.0)
    }

    pub fn is_row_unlocked(&self, row: RowId) -> bool {
        self.row_index(row)
            .is_some_and(|index| index >= self.current_row_index)
    }

    pub fn row_has_revealed_tile(&self, row: RowId) -> bool {
        self.revealed.iter().any(|tile| tile.row == row)
    }

    pub fn is_hazard(&self, tile: TileId) -> bool {
        self.hazards.contains(&tile)
    }

    pub fn is_revealed(&self, tile: TileId) -> bool {
        self.revealed.contains(&tile)
    }

    /// Whether clicking `tile` could change anything right now.
    pub fn is_tile_playable(&self, tile: TileId) -> bool {
        if self.state != GameState::Playing || self.revealed.contains(&tile) {
            return false;
        }
        if !self.is_row_unlocked(tile.row) || self.row_has_revealed_tile(tile.row) {
            return false;
        }
        tile.index < generate_row(tile.row.0).tiles
    }

    pub fn reveal_tile<R: Rng + ?Sized>(
        &mut self,
        tile: TileId,
        rng: &mut R,
    ) -> RevealOutcome {
        if !self.is_tile_playable(tile) {
            return RevealOutcome::Ignored;
        }
        self.revealed.insert(tile);

        if self.hazards.contains(&tile) {
            self.state = GameState::Lost;
            return RevealOutcome::Hazard;
        }

        self.completed_rows.insert(tile.row);
        if self.current_row_index > 0 {
            self.current_row_index -= 1;
            return RevealOutcome::Advanced {
                current_row_index: self.current_row_index,
            };
        }

        let previous_rows = self.total_rows;
        self.level += 1;
        self.total_rows += ROWS_PER_LEVEL_UP;
        for level in previous_rows + 1..=self.total_rows {
            self.place_hazard(level, rng);
        }
        self.current_row_index = 1;
        RevealOutcome::LevelUp {
            level: self.level,
            total_rows: self.total_rows,
        }
    }

    pub fn has_winnings(&self) -> bool {
        !self.completed_rows.is_empty()
    }

    pub fn cash_out(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.state = GameState::CashedOut;
        true
    }

    pub fn dismiss_cash_out(&mut self) -> bool {
        if self.state != GameState::CashedOut {
            return false;
        }
        self.state = GameState::Playing;
        true
    }

    /// Live games learn about losses from the contract's `ChoiceMade` event.
    pub fn mark_lost(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.state = GameState::Lost;
        true
    }

    fn place_hazard<R: Rng + ?Sized>(&mut self, level: u32, rng: &mut R) {
        let row = generate_row(level);
        let index = rng.random_range(0..row.tiles);
        self.hazards.insert(TileId::new(row.id, index));
    }
}
