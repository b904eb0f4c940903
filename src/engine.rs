use rand::Rng;
use std::fmt;
use std::sync::OnceLock;

/// Tile value that wins the game under the canonical ruleset.
pub const WIN_TILE: u64 = 2048;

/// Largest exponent a 4-bit cell can hold (2^15 = 32768).
pub const MAX_EXPONENT: u64 = 15;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Enumeration order used for tie-breaks: up, down, left, right.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

struct Stores {
    slide_left: Box<[u64]>,
    slide_right: Box<[u64]>,
    slide_up: Box<[u64]>,
    slide_down: Box<[u64]>,
    // Merge score of a line slid toward its first cell (left/up) or its last (right/down).
    merged_front: Box<[Score]>,
    merged_back: Box<[Score]>,
}

type BoardRaw = u64;
type Line = u64;
type Tile = u64;
type Score = u64;

/// Packed 4x4 2048 board as 16 4-bit exponents in a `u64`.
///
/// Cell 0 (top-left) lives in the high nibble, cells run row-major. A zero
/// nibble is an empty cell, nibble `e` is the tile `2^e`. `Board` is `Copy`,
/// so every transition hands back a new value and never touches the caller's.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

/// Result of applying one direction to a board.
///
/// `valid == false` means nothing moved: `board` is the input board and
/// `score` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    pub valid: bool,
    /// Sum of the tiles created by merges during the move.
    pub score: u64,
}

impl MoveOutcome {
    /// The outcome of a move that changed nothing.
    #[inline]
    pub fn rejected(board: Board) -> Self { MoveOutcome { board, valid: false, score: 0 } }
}

/// A grid handed in from outside that cannot be a 2048 board.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("expected 4 rows, got {0}")]
    RowCount(usize),
    #[error("row {row} has {len} cells, expected 4")]
    RowLength { row: usize, len: usize },
    #[error("expected 16 cells, got {0}")]
    CellCount(usize),
    #[error("cell {index} holds {value}, expected 0 or a power of two between 2 and 32768")]
    TileValue { index: usize, value: u64 },
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board(raw) }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.0 }

    /// Build a board from 16 row-major tile values.
    ///
    /// ```
    /// use ai_2048_bot::engine::{Board, BoardError};
    /// let b = Board::from_cells(&[2, 2, 4, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    /// assert_eq!(b.tile_value(3), 8);
    /// assert_eq!(Board::from_cells(&[2; 9]), Err(BoardError::CellCount(9)));
    /// ```
    pub fn from_cells(cells: &[u64]) -> Result<Self, BoardError> {
        if cells.len() != 16 {
            return Err(BoardError::CellCount(cells.len()));
        }
        cells.iter().enumerate().try_fold(Board::EMPTY, |board, (index, &value)| {
            let exponent = exponent_of(value).ok_or(BoardError::TileValue { index, value })?;
            Ok(board.with_exponent(index, exponent))
        })
    }

    /// Build a board from a 4x4 matrix of tile values.
    pub fn from_rows(rows: &[[u64; 4]; 4]) -> Result<Self, BoardError> {
        Self::from_cells(&rows.concat())
    }

    /// Build a board from an arbitrarily shaped grid, rejecting anything but 4x4.
    ///
    /// ```
    /// use ai_2048_bot::engine::{Board, BoardError};
    /// let ragged = vec![vec![0u64; 4], vec![0; 4], vec![0; 3], vec![0; 4]];
    /// assert_eq!(Board::from_grid(&ragged), Err(BoardError::RowLength { row: 2, len: 3 }));
    /// ```
    pub fn from_grid<R: AsRef<[u64]>>(grid: &[R]) -> Result<Self, BoardError> {
        if grid.len() != 4 {
            return Err(BoardError::RowCount(grid.len()));
        }
        let mut cells = [0u64; 16];
        for (row, line) in grid.iter().enumerate() {
            let line = line.as_ref();
            if line.len() != 4 {
                return Err(BoardError::RowLength { row, len: line.len() });
            }
            cells[row * 4..row * 4 + 4].copy_from_slice(line);
        }
        Self::from_cells(&cells)
    }

    /// Row-major tile values, the serialization handed to loggers and reports.
    pub fn to_cells(self) -> [u64; 16] { std::array::from_fn(|idx| self.tile_value(idx)) }

    /// Tile values as a 4x4 matrix.
    pub fn to_rows(self) -> [[u64; 4]; 4] {
        std::array::from_fn(|row| std::array::from_fn(|col| self.tile_value(row * 4 + col)))
    }

    /// Slide/merge tiles in `dir` and report whether anything changed and the merge score.
    ///
    /// ```
    /// use ai_2048_bot::engine::{Board, Move};
    /// let b = Board::from_rows(&[[2, 2, 4, 8], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let out = b.apply(Move::Left);
    /// assert!(out.valid);
    /// assert_eq!(out.score, 4);
    /// assert_eq!(out.board.to_rows()[0], [4, 4, 8, 0]);
    /// ```
    #[inline]
    pub fn apply(self, dir: Move) -> MoveOutcome {
        let (board, score) = slide(self, dir);
        if board == self { MoveOutcome::rejected(self) } else { MoveOutcome { board, valid: true, score } }
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    #[inline]
    pub fn shift(self, dir: Move) -> Self { slide(self, dir).0 }

    /// Insert a 2 (90%) or 4 (10%) into a uniformly chosen empty cell.
    ///
    /// Cells are drawn by row and column until an empty one turns up. On a full
    /// board there is nowhere to spawn and the board comes back unchanged.
    ///
    /// ```
    /// use ai_2048_bot::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        if self.count_empty() == 0 {
            return self;
        }
        let idx = loop {
            let idx = rng.gen_range(0..4) * 4 + rng.gen_range(0..4);
            if self.exponent(idx) == 0 {
                break idx;
            }
        };
        self.with_exponent(idx, generate_random_tile(rng))
    }

    /// Perform a move, then spawn a tile if the move was valid.
    pub fn make_move<R: Rng + ?Sized>(self, direction: Move, rng: &mut R) -> MoveOutcome {
        let outcome = self.apply(direction);
        if outcome.valid {
            MoveOutcome { board: outcome.board.with_random_tile(rng), ..outcome }
        } else {
            outcome
        }
    }

    /// Pick uniformly among the valid directions by redrawing until one moves.
    ///
    /// Returns a rejected outcome when no direction is valid.
    pub fn random_valid_move<R: Rng + ?Sized>(self, rng: &mut R) -> MoveOutcome {
        let outcomes = Move::ALL.map(|dir| self.apply(dir));
        if !outcomes.iter().any(|o| o.valid) {
            return MoveOutcome::rejected(self);
        }
        loop {
            let outcome = outcomes[rng.gen_range(0..4)];
            if outcome.valid {
                return outcome;
            }
        }
    }

    /// True if any cell holds exactly `tile`.
    #[inline]
    pub fn has_tile(self, tile: u64) -> bool { (0..16).any(|idx| self.tile_value(idx) == tile) }

    /// True once the canonical [`WIN_TILE`] is on the board.
    #[inline]
    pub fn is_win(self) -> bool { self.has_tile(WIN_TILE) }

    /// True if the board is full and no row or column holds two equal neighbours.
    ///
    /// A pair of 32768 tiles does not count, since they cannot merge.
    ///
    /// ```
    /// use ai_2048_bot::engine::Board;
    /// assert!(!Board::EMPTY.is_terminal());
    /// ```
    #[inline]
    pub fn is_terminal(self) -> bool { is_terminal(self) }

    /// Return the highest tile value (e.g., 2048) present on the board.
    #[inline]
    pub fn highest_tile(self) -> Tile { get_highest_tile_val(self) }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u64 { count_empty(self) }

    /// Indices (row-major, 0..16) of the empty cells.
    pub fn empty_cells(self) -> impl Iterator<Item = usize> {
        (0..16).filter(move |&idx| self.exponent(idx) == 0)
    }

    /// Raw exponent at index (0 for an empty cell).
    #[inline]
    pub fn exponent(self, idx: usize) -> u64 { (self.0 >> (60 - 4 * idx)) & 0xf }

    /// Tile value at index: 0 for an empty cell, else 2^exponent.
    #[inline]
    pub fn tile_value(self, idx: usize) -> u64 {
        match self.exponent(idx) {
            0 => 0,
            e => 1 << e,
        }
    }

    /// Copy of this board with the cell at `idx` set to exponent `exponent`.
    #[inline]
    pub fn with_exponent(self, idx: usize, exponent: u64) -> Self {
        let shift = 60 - 4 * idx;
        Board((self.0 & !(0xf << shift)) | ((exponent & 0xf) << shift))
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row_idx, row) in self.to_rows().iter().enumerate() {
            if row_idx > 0 {
                writeln!(f, "-------------------------------")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl From<BoardRaw> for Board { fn from(v: BoardRaw) -> Self { Board::from_raw(v) } }

impl TryFrom<[[u64; 4]; 4]> for Board {
    type Error = BoardError;
    fn try_from(rows: [[u64; 4]; 4]) -> Result<Self, Self::Error> { Board::from_rows(&rows) }
}

/// Initialize internal tables on first use. Safe to call multiple times.
pub fn new() {
    let _ = stores();
}

/// A fresh game: an empty board with two spawned tiles.
pub fn initialize<R: Rng + ?Sized>(rng: &mut R) -> Board {
    Board::EMPTY.with_random_tile(rng).with_random_tile(rng)
}

pub fn move_up(board: Board) -> MoveOutcome { board.apply(Move::Up) }

pub fn move_down(board: Board) -> MoveOutcome { board.apply(Move::Down) }

pub fn move_left(board: Board) -> MoveOutcome { board.apply(Move::Left) }

pub fn move_right(board: Board) -> MoveOutcome { board.apply(Move::Right) }

/// Spawn a tile using thread-local RNG.
///
/// For reproducible behavior, prefer `Board::with_random_tile(&mut impl Rng)`.
pub fn spawn(board: Board) -> Board { board.with_random_tile(&mut rand::thread_rng()) }

/// Random valid move using thread-local RNG.
pub fn random_valid_move(board: Board) -> MoveOutcome { board.random_valid_move(&mut rand::thread_rng()) }

/// True iff any cell equals [`WIN_TILE`].
pub fn is_win(board: Board) -> bool { board.is_win() }

/// Zero empty cells AND no mergeable horizontal pair AND no mergeable vertical pair.
pub fn is_terminal(board: Board) -> bool {
    count_empty(board) == 0 && !has_equal_neighbours(board.0) && !has_equal_neighbours(transpose(board.0))
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

/// Line `line_idx` (0 = top row, or left column on a transposed board) as 16 bits.
pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

pub(crate) fn line_to_tiles(line: Line) -> [Tile; 4] {
    std::array::from_fn(|tile_idx| (line >> ((3 - tile_idx) * 4)) & 0xf)
}

// https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
/// Count the number of zero tiles.
pub fn count_empty(board: Board) -> u64 {
    16 - count_non_empty(board)
}

pub fn get_highest_tile_val(board: Board) -> Tile {
    (0..16).map(|idx| board.tile_value(idx)).max().unwrap_or(0)
}

static STORES: OnceLock<Stores> = OnceLock::new();

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut slide_left = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_right = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_up = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_down = vec![0u64; LINE_TABLE_SIZE];
    let mut merged_front = vec![0u64; LINE_TABLE_SIZE];
    let mut merged_back = vec![0u64; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let tiles = line_to_tiles(val as Line);
        let (front, front_score) = slide_toward_front(tiles);
        let (back, back_score) = slide_toward_back(tiles);
        slide_left[val] = tiles_to_row(front);
        slide_up[val] = tiles_to_col(front);
        slide_right[val] = tiles_to_row(back);
        slide_down[val] = tiles_to_col(back);
        merged_front[val] = front_score;
        merged_back[val] = back_score;
    }

    Stores {
        slide_left: slide_left.into_boxed_slice(),
        slide_right: slide_right.into_boxed_slice(),
        slide_up: slide_up.into_boxed_slice(),
        slide_down: slide_down.into_boxed_slice(),
        merged_front: merged_front.into_boxed_slice(),
        merged_back: merged_back.into_boxed_slice(),
    }
}

#[inline(always)]
fn stores() -> &'static Stores { STORES.get_or_init(create_stores) }

#[inline(always)]
fn get_line_entry(table: &[u64], line: Line) -> u64 {
    debug_assert!((line as usize) < LINE_TABLE_SIZE);
    table[line as usize]
}

fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile { if rng.gen_range(0..10) < 9 { 1 } else { 2 } }

fn slide(board: Board, direction: Move) -> (Board, Score) {
    let s = stores();
    match direction {
        Move::Left => slide_rows(board.0, &s.slide_left, &s.merged_front),
        Move::Right => slide_rows(board.0, &s.slide_right, &s.merged_back),
        Move::Up => slide_cols(board.0, &s.slide_up, &s.merged_front),
        Move::Down => slide_cols(board.0, &s.slide_down, &s.merged_back),
    }
}

fn slide_rows(board: BoardRaw, table: &[u64], scores: &[Score]) -> (Board, Score) {
    let (res, score) = (0..4).fold((0, 0), |(new_board, score), row_idx| {
        let row_val = extract_line(board, row_idx);
        let new_row_val = get_line_entry(table, row_val);
        (new_board | (new_row_val << (48 - (16 * row_idx))), score + get_line_entry(scores, row_val))
    });
    (Board(res), score)
}

fn slide_cols(board: BoardRaw, table: &[u64], scores: &[Score]) -> (Board, Score) {
    let transpose_board = transpose(board);
    let (res, score) = (0..4).fold((0, 0), |(new_board, score), col_idx| {
        let col_val = extract_line(transpose_board, col_idx);
        let new_col_val = get_line_entry(table, col_val);
        (new_board | (new_col_val << (12 - (4 * col_idx))), score + get_line_entry(scores, col_val))
    });
    (Board(res), score)
}

fn tiles_to_row(tiles: [Tile; 4]) -> Line {
    tiles[0] << 12 | tiles[1] << 8 | tiles[2] << 4 | tiles[3]
}

fn tiles_to_col(tiles: [Tile; 4]) -> Line {
    tiles[0] << 48 | tiles[1] << 32 | tiles[2] << 16 | tiles[3]
}

/// Compact, merge, compact again, all toward index 0.
fn slide_toward_front(mut tiles: [Tile; 4]) -> ([Tile; 4], Score) {
    stack(&mut tiles);
    let score = combine(&mut tiles);
    stack(&mut tiles);
    (tiles, score)
}

fn slide_toward_back(mut tiles: [Tile; 4]) -> ([Tile; 4], Score) {
    tiles.reverse();
    let (mut tiles, score) = slide_toward_front(tiles);
    tiles.reverse();
    (tiles, score)
}

/// Shift non-empty tiles toward index 0, keeping their order.
fn stack(tiles: &mut [Tile; 4]) {
    let mut fill = 0;
    for idx in 0..tiles.len() {
        let val = tiles[idx];
        if val != 0 {
            tiles[idx] = 0;
            tiles[fill] = val;
            fill += 1;
        }
    }
}

/// Merge equal neighbours scanning from index 0; the trailing cell is zeroed
/// so no tile takes part in two merges. Two 32768 tiles stay apart.
fn combine(tiles: &mut [Tile; 4]) -> Score {
    let mut score = 0;
    for idx in 0..tiles.len() - 1 {
        let val = tiles[idx];
        if val != 0 && val < MAX_EXPONENT && val == tiles[idx + 1] {
            tiles[idx] = val + 1;
            tiles[idx + 1] = 0;
            score += 1 << (val + 1);
        }
    }
    score
}

fn has_equal_neighbours(board: BoardRaw) -> bool {
    (0..4).any(|line_idx| {
        line_to_tiles(extract_line(board, line_idx)).windows(2).any(|w| w[0] == w[1] && w[0] < MAX_EXPONENT)
    })
}

fn count_non_empty(board: Board) -> u64 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones() as u64
}

fn exponent_of(value: u64) -> Option<u64> {
    match value {
        0 => Some(0),
        v if v >= 2 && v.is_power_of_two() && (v.trailing_zeros() as u64) <= MAX_EXPONENT => Some(v.trailing_zeros() as u64),
        _ => None,
    }
}

fn format_val(val: u64) -> String {
    match val {
        0 => " ".repeat(7),
        v => format!("{:^7}", v),
    }
}
