//! Circuit board (`memory_puzzle`)
//!
//! 3×3 grid of pipe tiles. Rotating a tile steps through its orientations.
//! The board is solved once power flows from the source cell (0,1) to the
//! sink cell (2,1) through connectors that face each other.

use std::collections::{HashSet, VecDeque};

use rand::Rng;

use super::{MinigameInput, MinigameTask, TaskStatus};

pub const SIZE: usize = 3;
pub const SOURCE: (usize, usize) = (0, 1);
pub const SINK: (usize, usize) = (2, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    N,
    E,
    S,
    W,
}

impl Dir {
    fn opposite(self) -> Dir {
        match self {
            Dir::N => Dir::S,
            Dir::E => Dir::W,
            Dir::S => Dir::N,
            Dir::W => Dir::E,
        }
    }

    fn step(self, (x, y): (usize, usize)) -> Option<(usize, usize)> {
        let (nx, ny) = match self {
            Dir::N => (x, y.checked_sub(1)?),
            Dir::E => (x + 1, y),
            Dir::S => (x, y + 1),
            Dir::W => (x.checked_sub(1)?, y),
        };
        (nx < SIZE && ny < SIZE).then_some((nx, ny))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Straight,
    Elbow,
    Tee,
    Cross,
}

impl TileKind {
    /// Connector sets, one per orientation
    fn variants(self) -> &'static [&'static [Dir]] {
        use Dir::*;
        match self {
            TileKind::Straight => &[&[N, S], &[E, W]],
            TileKind::Elbow => &[&[N, E], &[E, S], &[S, W], &[W, N]],
            TileKind::Tee => &[&[N, E, S], &[E, S, W], &[S, W, N], &[W, N, E]],
            TileKind::Cross => &[&[N, E, S, W]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub rotation: usize,
}

impl Tile {
    pub fn connectors(&self) -> &'static [Dir] {
        let variants = self.kind.variants();
        variants[self.rotation % variants.len()]
    }

    fn rotate(&mut self) {
        self.rotation = (self.rotation + 1) % self.kind.variants().len();
    }

    fn glyph(&self) -> char {
        let c = self.connectors();
        let has = |d| c.contains(&d);
        match (has(Dir::N), has(Dir::E), has(Dir::S), has(Dir::W)) {
            (true, false, true, false) => '│',
            (false, true, false, true) => '─',
            (true, true, false, false) => '└',
            (false, true, true, false) => '┌',
            (false, false, true, true) => '┐',
            (true, false, false, true) => '┘',
            (true, true, true, false) => '├',
            (false, true, true, true) => '┬',
            (true, false, true, true) => '┤',
            (true, true, false, true) => '┴',
            _ => '┼',
        }
    }
}

/// Tile kinds by row; power enters on the left of the middle row
const LAYOUT: [[TileKind; SIZE]; SIZE] = [
    [TileKind::Elbow, TileKind::Straight, TileKind::Elbow],
    [TileKind::Tee, TileKind::Straight, TileKind::Tee],
    [TileKind::Elbow, TileKind::Straight, TileKind::Elbow],
];

#[derive(Debug, Clone)]
pub struct CircuitBoard {
    /// Indexed `[y][x]`
    tiles: [[Tile; SIZE]; SIZE],
    solved: bool,
}

impl CircuitBoard {
    /// Random orientations, never already solved
    pub fn new() -> Self {
        let mut board = Self::with_rotations([[0; SIZE]; SIZE]);
        board.scramble();
        board
    }

    /// Fixed orientations, indexed `[y][x]`
    pub fn with_rotations(rotations: [[usize; SIZE]; SIZE]) -> Self {
        let mut tiles = [[Tile { kind: TileKind::Cross, rotation: 0 }; SIZE]; SIZE];
        for y in 0..SIZE {
            for x in 0..SIZE {
                let kind = LAYOUT[y][x];
                tiles[y][x] = Tile {
                    kind,
                    rotation: rotations[y][x] % kind.variants().len(),
                };
            }
        }
        let mut board = Self { tiles, solved: false };
        board.solved = board.is_connected();
        board
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.tiles.get(y)?.get(x)
    }

    fn scramble(&mut self) {
        let mut rng = rand::thread_rng();
        loop {
            for row in self.tiles.iter_mut() {
                for tile in row.iter_mut() {
                    tile.rotation = rng.gen_range(0..tile.kind.variants().len());
                }
            }
            if !self.is_connected() {
                break;
            }
        }
    }

    /// Breadth-first search from source to sink over matching connectors
    pub fn is_connected(&self) -> bool {
        let mut queue = VecDeque::from([SOURCE]);
        let mut seen = HashSet::from([SOURCE]);

        while let Some(cell) = queue.pop_front() {
            if cell == SINK {
                return true;
            }
            let (x, y) = cell;
            for &dir in self.tiles[y][x].connectors() {
                let Some(next) = dir.step(cell) else { continue };
                let (nx, ny) = next;
                if !self.tiles[ny][nx].connectors().contains(&dir.opposite()) {
                    continue;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

impl Default for CircuitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MinigameTask for CircuitBoard {
    fn kind(&self) -> &str {
        "memory_puzzle"
    }

    fn handle(&mut self, input: &MinigameInput) -> TaskStatus {
        if self.solved {
            return TaskStatus::Completed;
        }
        match *input {
            MinigameInput::Rotate { x, y } if x < SIZE && y < SIZE => {
                self.tiles[y][x].rotate();
                self.solved = self.is_connected();
                if self.solved {
                    tracing::debug!("Circuit restored");
                }
            }
            MinigameInput::Reset => self.scramble(),
            _ => {}
        }
        self.status()
    }

    fn status(&self) -> TaskStatus {
        if self.solved {
            TaskStatus::Completed
        } else {
            TaskStatus::Running
        }
    }

    fn status_line(&self) -> String {
        let mut out = String::new();
        for (y, row) in self.tiles.iter().enumerate() {
            let marker_in = if (0, y) == SOURCE { '>' } else { ' ' };
            let marker_out = if (SIZE - 1, y) == SINK { '>' } else { ' ' };
            out.push(marker_in);
            out.extend(row.iter().map(Tile::glyph));
            out.push(marker_out);
            out.push('\n');
        }
        out.push_str(if self.solved { "Circuit Restored!" } else { "Rotate tiles to route power" });
        out
    }
}
