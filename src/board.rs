//! Board: pieces, cells, generation without matches, match scan, gravity, refill.

use rand::Rng;
use std::collections::BTreeSet;

/// Fixed side length of the square board.
pub const BOARD_SIZE: usize = 12;

/// Which side of the ocean a piece belongs to; decides its cleanliness weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    OceanLife,
    Pollution,
}

/// Piece kinds: six kinds of ocean life and three kinds of pollution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Piece {
    Fish,
    Crab,
    Turtle,
    Octopus,
    Starfish,
    Dolphin,
    Bottle,
    Can,
    Cup,
}

impl Piece {
    /// The full alphabet drawn from by generation and refill.
    pub const ALL: [Self; 9] = [
        Self::Fish,
        Self::Crab,
        Self::Turtle,
        Self::Octopus,
        Self::Starfish,
        Self::Dolphin,
        Self::Bottle,
        Self::Can,
        Self::Cup,
    ];

    pub const OCEAN_LIFE: [Self; 6] = [
        Self::Fish,
        Self::Crab,
        Self::Turtle,
        Self::Octopus,
        Self::Starfish,
        Self::Dolphin,
    ];

    pub const POLLUTION: [Self; 3] = [Self::Bottle, Self::Can, Self::Cup];

    pub fn category(&self) -> Category {
        match self {
            Self::Bottle | Self::Can | Self::Cup => Category::Pollution,
            _ => Category::OceanLife,
        }
    }

    #[inline]
    pub fn is_pollution(&self) -> bool {
        self.category() == Category::Pollution
    }

    /// Uniform draw from [`Piece::ALL`].
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Two-column emoji used by the default renderer.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Fish => "🐠",
            Self::Crab => "🦀",
            Self::Turtle => "🐢",
            Self::Octopus => "🐙",
            Self::Starfish => "⭐",
            Self::Dolphin => "🐬",
            Self::Bottle => "🧴",
            Self::Can => "🥫",
            Self::Cup => "🥤",
        }
    }

    /// Single-column fallback glyph (`--glyphs`). Pollution is lowercase.
    pub fn glyph(&self) -> char {
        match self {
            Self::Fish => 'F',
            Self::Crab => 'C',
            Self::Turtle => 'T',
            Self::Octopus => 'O',
            Self::Starfish => 'S',
            Self::Dolphin => 'D',
            Self::Bottle => 'b',
            Self::Can => 'c',
            Self::Cup => 'u',
        }
    }

    /// Colour index 0..9 for theme.piece_color().
    pub fn color_index(&self) -> u8 {
        match self {
            Self::Fish => 0,
            Self::Crab => 1,
            Self::Turtle => 2,
            Self::Octopus => 3,
            Self::Starfish => 4,
            Self::Dolphin => 5,
            Self::Bottle => 6,
            Self::Can => 7,
            Self::Cup => 8,
        }
    }
}

/// Single cell: either empty (only while a cascade runs) or a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Piece(Piece),
}

impl Cell {
    #[inline]
    pub fn piece(&self) -> Option<Piece> {
        match self {
            Self::Piece(p) => Some(*p),
            Self::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// (row, col) on the board. Row 0 is the top. Ordered row-major.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    /// None when outside the board.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }

    /// Manhattan distance of exactly 1.
    pub fn is_adjacent(&self, other: Coord) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Neighbour one step in (drow, dcol), None if it would leave the board.
    pub fn offset(&self, drow: isize, dcol: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(drow)?;
        let col = self.col.checked_add_signed(dcol)?;
        Self::new(row, col)
    }
}

/// 12×12 grid. `cells[row][col]`; row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Fresh board with no run of three anywhere.
    ///
    /// Cells are filled row-major; a candidate is redrawn when it would complete a run
    /// with the two cells to its left or the two cells above it. Those are the only
    /// already-placed runs that can end at the new cell, and at most two symbols are ever
    /// forbidden at once, so the redraw loop always finishes.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let mut board = Self::empty();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let piece = loop {
                    let candidate = Piece::random(rng);
                    let left_run = col >= 2
                        && board.cells[row][col - 1] == Cell::Piece(candidate)
                        && board.cells[row][col - 2] == Cell::Piece(candidate);
                    let up_run = row >= 2
                        && board.cells[row - 1][col] == Cell::Piece(candidate)
                        && board.cells[row - 2][col] == Cell::Piece(candidate);
                    if !left_run && !up_run {
                        break candidate;
                    }
                };
                board.cells[row][col] = Cell::Piece(piece);
            }
        }
        board
    }

    #[cfg(test)]
    pub fn from_rows(rows: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells: rows }
    }

    #[inline]
    pub fn get(&self, at: Coord) -> Cell {
        self.cells[at.row][at.col]
    }

    #[inline]
    pub fn set(&mut self, at: Coord, cell: Cell) {
        self.cells[at.row][at.col] = cell;
    }

    pub fn swap(&mut self, a: Coord, b: Coord) {
        let tmp = self.get(a);
        self.set(a, self.get(b));
        self.set(b, tmp);
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    #[cfg(test)]
    pub fn empty_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_empty()).count()
    }

    /// Coordinates of every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<Coord> {
        let mut out = Vec::new();
        for (row, line) in self.cells.iter().enumerate() {
            for (col, cell) in line.iter().enumerate() {
                if cell.is_empty() {
                    out.push(Coord { row, col });
                }
            }
        }
        out
    }

    /// Column-wise gravity: non-empty cells sink, keeping their order; empties end on top.
    pub fn apply_gravity(&mut self) {
        for col in 0..BOARD_SIZE {
            // Write cursor: lowest row not yet filled by a settled piece.
            let mut write = BOARD_SIZE;
            for row in (0..BOARD_SIZE).rev() {
                if !self.cells[row][col].is_empty() {
                    write -= 1;
                    if row != write {
                        self.cells[write][col] = self.cells[row][col];
                        self.cells[row][col] = Cell::Empty;
                    }
                }
            }
        }
    }

    /// Fill every empty cell uniformly. Refills may form new matches (chain reactions).
    /// Returns how many cells were filled.
    pub fn refill(&mut self, rng: &mut impl Rng) -> usize {
        let mut filled = 0;
        for cell in self.cells.iter_mut().flatten() {
            if cell.is_empty() {
                *cell = Cell::Piece(Piece::random(rng));
                filled += 1;
            }
        }
        filled
    }
}

/// Every cell covered by a horizontal or vertical window of three identical pieces.
/// Empty cells never match.
pub fn find_matches(board: &Board) -> BTreeSet<Coord> {
    let cells = board.rows();
    let mut matches = BTreeSet::new();

    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE - 2 {
            if let Cell::Piece(p) = cells[row][col] {
                if cells[row][col + 1] == Cell::Piece(p) && cells[row][col + 2] == Cell::Piece(p) {
                    for i in 0..3 {
                        matches.insert(Coord { row, col: col + i });
                    }
                }
            }
        }
    }

    for row in 0..BOARD_SIZE - 2 {
        for col in 0..BOARD_SIZE {
            if let Cell::Piece(p) = cells[row][col] {
                if cells[row + 1][col] == Cell::Piece(p) && cells[row + 2][col] == Cell::Piece(p) {
                    for i in 0..3 {
                        matches.insert(Coord { row: row + i, col });
                    }
                }
            }
        }
    }

    matches
}

#[inline]
pub fn has_matches(board: &Board) -> bool {
    !find_matches(board).is_empty()
}
