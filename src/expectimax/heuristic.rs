use std::sync::OnceLock;

use crate::engine as GameEngine;
use crate::engine::Board;

/// Score of a full board: far below anything a playable board can reach.
pub const LOST_PENALTY: f64 = -1e9;

const MONOTONICITY_WEIGHT: f64 = 10.0;
const EMPTY_WEIGHT: f64 = 500_000.0;

// Snake path from the top-left corner: row 0 runs left to right from 4^15,
// row 1 climbs back from 4^8, row 2 runs 4^7.., row 3 climbs from 4^0.
const POSITION_WEIGHTS: [u64; 16] = [
    4u64.pow(15), 4u64.pow(14), 4u64.pow(13), 4u64.pow(12),
    4u64.pow(8),  4u64.pow(9),  4u64.pow(10), 4u64.pow(11),
    4u64.pow(7),  4u64.pow(6),  4u64.pow(5),  4u64.pow(4),
    4u64.pow(0),  4u64.pow(1),  4u64.pow(2),  4u64.pow(3),
];

static ROUGHNESS: OnceLock<Box<[f64]>> = OnceLock::new();

pub(crate) fn warm() {
    let _ = roughness_table();
}

fn roughness_table() -> &'static [f64] {
    ROUGHNESS
        .get_or_init(|| {
            let mut v = vec![0.0f64; 0x1_0000];
            for (i, slot) in v.iter_mut().enumerate() {
                *slot = calc_roughness(i as u64);
            }
            v.into_boxed_slice()
        })
        .as_ref()
}

/// Static score of a board, no lookahead.
///
/// Weighted snake sum, minus ten times the summed differences between
/// neighbouring tiles, plus 500,000 per empty cell. A full board scores
/// [`LOST_PENALTY`] whatever else is on it.
///
/// ```
/// use ai_2048_bot::engine::Board;
/// use ai_2048_bot::expectimax::{evaluate, LOST_PENALTY};
/// let full = Board::from_rows(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
/// assert_eq!(evaluate(full), LOST_PENALTY);
/// assert_eq!(evaluate(Board::EMPTY), 16.0 * 500_000.0);
/// ```
pub fn evaluate(board: Board) -> f64 {
    let empty = board.count_empty();
    if empty == 0 {
        return LOST_PENALTY;
    }
    positional_sum(board) as f64 - MONOTONICITY_WEIGHT * roughness(board) + empty as f64 * EMPTY_WEIGHT
}

fn positional_sum(board: Board) -> u64 {
    POSITION_WEIGHTS.iter().enumerate().map(|(idx, &weight)| board.tile_value(idx) * weight).sum()
}

/// Sum of |a - b| over every horizontally and vertically adjacent pair.
fn roughness(board: Board) -> f64 {
    let transpose_board = GameEngine::transpose(board.raw());
    let table = roughness_table();
    (0..4).fold(0., |acc, line_idx| {
        let row_val = GameEngine::extract_line(board.raw(), line_idx);
        let col_val = GameEngine::extract_line(transpose_board, line_idx);
        acc + table[row_val as usize] + table[col_val as usize]
    })
}

fn calc_roughness(line: u64) -> f64 {
    let values = GameEngine::line_to_tiles(line).map(|e| if e == 0 { 0 } else { 1u64 << e });
    values.windows(2).map(|w| w[0].abs_diff(w[1]) as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(rows: [[u64; 4]; 4]) -> Board { Board::from_rows(&rows).unwrap() }

    #[test]
    fn weights_follow_the_snake() {
        let snake = [0, 1, 2, 3, 7, 6, 5, 4, 8, 9, 10, 11, 15, 14, 13, 12];
        for pair in snake.windows(2) {
            assert!(POSITION_WEIGHTS[pair[0]] > POSITION_WEIGHTS[pair[1]]);
        }
        assert_eq!(POSITION_WEIGHTS[0], 1 << 30);
        assert_eq!(POSITION_WEIGHTS[12], 1);
    }

    #[test]
    fn single_tile_scores() {
        // One 2 in the top-left corner: 2 * 4^15, two neighbours of difference 2.
        let corner = rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let expected = 2.0 * 4f64.powi(15) - 10.0 * 4.0 + 15.0 * 500_000.0;
        assert_eq!(evaluate(corner), expected);

        let far = rows([[0; 4], [0; 4], [0; 4], [2, 0, 0, 0]]);
        assert!(evaluate(corner) > evaluate(far));
    }

    #[test]
    fn roughness_counts_rows_and_columns() {
        let board = rows([[2, 4, 0, 0], [8, 0, 0, 0], [0; 4], [0; 4]]);
        // Rows: |2-4| + |4-0| + |8-0| ; columns: |2-8| + |8-0| + |4-0|
        assert_eq!(roughness(board), (2 + 4 + 8 + 6 + 8 + 4) as f64);
    }

    #[test]
    fn empty_cells_outweigh_low_weight_tiles() {
        let open = rows([[0; 4], [0; 4], [0; 4], [2, 0, 0, 0]]);
        let crowded = rows([[0; 4], [0; 4], [0; 4], [2, 2, 0, 0]]);
        assert!(evaluate(open) > evaluate(crowded));
        assert_eq!(evaluate(rows([[2; 4]; 4])), LOST_PENALTY);
    }
}
