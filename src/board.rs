//! Row and tile geometry shared by the demo simulation and live games.

use std::fmt;

/// Payout factor in basis points (`11_000` is `1.1x`), the contract's own scaling.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Multiplier(u32);

impl Multiplier {
    pub const SCALE: u32 = 10_000;

    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    pub const fn bps(self) -> u32 {
        self.0
    }

    /// `⌊multiplier × 100⌋`, the demo score shown in the sidebar.
    pub const fn points(self) -> u32 {
        self.0 / 100
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let fraction = self.0 % Self::SCALE;
        if fraction == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{:04}", fraction);
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RowId(pub u32);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row{}", self.0)
    }
}

/// `{rowId}-{tileIndex}`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TileId {
    pub row: RowId,
    pub index: u8,
}

impl TileId {
    pub const fn new(row: RowId, index: u8) -> Self {
        Self { row, index }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.index)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub level: u32,
    pub multiplier: Multiplier,
    pub tiles: u8,
}

pub const MAX_TILES: u8 = 10;

const DEMO_BASE_BPS: u32 = 11_000;
const DEMO_STEP_BPS: u32 = 2_200;

fn tier_tiles(level: u32) -> u8 {
    let base: u32 = if level <= 2 { 7 } else { 5 };
    let grown = base + (level.saturating_sub(1)) / 3;
    grown.min(u32::from(MAX_TILES)) as u8
}

/// Demo row for `level` (1-based): `1.1 + 0.22 × (level − 1)`.
///
/// The tier table dips from 7 to 5 tiles at level 3; the count is held at the
/// best tier reached so far so rows never shrink as the player climbs.
pub fn generate_row(level: u32) -> Row {
    let level = level.max(1);
    let multiplier =
        Multiplier(DEMO_BASE_BPS.saturating_add(DEMO_STEP_BPS.saturating_mul(level - 1)));
    let tiles = tier_tiles(level).max(tier_tiles(1));
    Row {
        id: RowId(level),
        level,
        multiplier,
        tiles,
    }
}

/// Board for a demo session with `total_rows` rows, highest level first.
pub fn demo_rows(total_rows: u32) -> Vec<Row> {
    (1..=total_rows).rev().map(generate_row).collect()
}

/// Display index of the demo row at `level` on a board of `total_rows`.
pub fn demo_row_index(total_rows: u32, level: u32) -> Option<usize> {
    if level == 0 || level > total_rows {
        return None;
    }
    Some((total_rows - level) as usize)
}

/// Fixed multiplier/tile table mirrored from the game contract, by choice index.
pub const CONTRACT_CHOICES: [(Multiplier, u8); 7] = [
    (Multiplier(11_000), 7),
    (Multiplier(12_500), 7),
    (Multiplier(15_000), 7),
    (Multiplier(20_000), 6),
    (Multiplier(30_000), 5),
    (Multiplier(50_000), 4),
    (Multiplier(100_000), 3),
];

pub const LIVE_WINDOW: usize = 3;

/// The next three contract rows starting at `games_played`, highest first.
pub fn live_rows(games_played: u64) -> Vec<Row> {
    let start = usize::try_from(games_played)
        .unwrap_or(usize::MAX)
        .min(CONTRACT_CHOICES.len());
    let end = (start + LIVE_WINDOW).min(CONTRACT_CHOICES.len());
    CONTRACT_CHOICES[start..end]
        .iter()
        .enumerate()
        .map(|(offset, (multiplier, tiles))| {
            let index = (start + offset) as u32;
            Row {
                id: RowId(index),
                level: index + 1,
                multiplier: *multiplier,
                tiles: *tiles,
            }
        })
        .rev()
        .collect()
}

/// Contract choice index for a row multiplier; `None` when the table has no entry.
pub fn choice_index_for(multiplier: Multiplier) -> Option<u8> {
    CONTRACT_CHOICES
        .iter()
        .position(|(m, _)| *m == multiplier)
        .map(|idx| idx as u8)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn multiplier__displays_trimmed_decimal() {
        assert_eq!(Multiplier::from_bps(11_000).to_string(), "1.1");
        assert_eq!(Multiplier::from_bps(13_200).to_string(), "1.32");
        assert_eq!(Multiplier::from_bps(12_500).to_string(), "1.25");
        assert_eq!(Multiplier::from_bps(20_000).to_string(), "2");
        assert_eq!(Multiplier::from_bps(100_000).to_string(), "10");
    }

    #[test]
    fn tile_id__formats_as_row_dash_index() {
        let tile = TileId::new(RowId(3), 4);
        assert_eq!(tile.to_string(), "row3-4");
    }

    #[test]
    fn generate_row__follows_linear_multiplier() {
        let first = generate_row(1);
        let third = generate_row(3);
        assert_eq!(first.id, RowId(1));
        assert_eq!(first.multiplier, Multiplier::from_bps(11_000));
        assert_eq!(first.tiles, 7);
        assert_eq!(third.multiplier, Multiplier::from_bps(15_400));
    }

    #[test]
    fn demo_rows__lists_highest_level_first() {
        let rows = demo_rows(3);
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RowId(3), RowId(2), RowId(1)]);
        assert_eq!(demo_row_index(3, 1), Some(2));
        assert_eq!(demo_row_index(3, 3), Some(0));
        assert_eq!(demo_row_index(3, 4), None);
    }

    #[test]
    fn live_rows__windows_next_three_choices_highest_first() {
        // given
        let games_played = 2;

        // when
        let rows = live_rows(games_played);

        // then
        let multipliers: Vec<_> = rows.iter().map(|r| r.multiplier.bps()).collect();
        assert_eq!(multipliers, vec![30_000, 20_000, 15_000]);
        assert_eq!(rows[2].id, RowId(2));
        assert_eq!(rows[2].level, 3);
    }

    #[test]
    fn live_rows__shrinks_near_end_of_table() {
        assert_eq!(live_rows(5).len(), 2);
        assert_eq!(live_rows(6).len(), 1);
        assert!(live_rows(7).is_empty());
        assert!(live_rows(u64::MAX).is_empty());
    }

    #[test]
    fn choice_index_for__maps_contract_table() {
        assert_eq!(choice_index_for(Multiplier::from_bps(11_000)), Some(0));
        assert_eq!(choice_index_for(Multiplier::from_bps(12_500)), Some(1));
        assert_eq!(choice_index_for(Multiplier::from_bps(15_000)), Some(2));
        assert_eq!(choice_index_for(Multiplier::from_bps(20_000)), Some(3));
        assert_eq!(choice_index_for(Multiplier::from_bps(100_000)), Some(6));
        assert_eq!(choice_index_for(Multiplier::from_bps(13_200)), None);
    }

    proptest! {
        #[test]
        fn generate_row__tile_count_is_monotonic_and_capped(level in 1u32..500) {
            let here = generate_row(level).tiles;
            let next = generate_row(level + 1).tiles;
            prop_assert!(here <= next);
            prop_assert!(next <= MAX_TILES);
        }
    }
}
