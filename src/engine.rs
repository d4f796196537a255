use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::fmt;

use crate::config::{EngineConfig, RestartPolicy};
use crate::events::GridEvent;
use crate::serialization::{SaveData, SaveError, SaveStore, TileRecord};

/// Side length of the grid.
pub const SIZE: usize = 4;

const CELLS: usize = SIZE * SIZE;

/// Occupancy mask with every cell filled.
const FULL: u16 = u16::MAX;

// Occupancy is tracked as one bit per cell.
const _: () = assert!(CELLS == 16);

/// Largest exponent whose magnitude still fits in a `u64`. Tiles at this value no longer merge.
pub const MAX_EXPONENT: u8 = 63;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Unit step for this direction. `y` grows downward, so `Up` is `(0, -1)`.
    #[inline]
    pub fn delta(self) -> (i8, i8) {
        match self {
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
        }
    }
}

/// A cell coordinate. `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: i8,
    pub y: i8,
}

impl Coord {
    #[inline]
    pub const fn new(x: i8, y: i8) -> Self {
        Coord { x, y }
    }

    /// The neighbouring coordinate in `dir`. May lie outside the grid.
    #[inline]
    pub fn step(self, dir: Move) -> Self {
        let (dx, dy) = dir.delta();
        Coord::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn is_inside(self) -> bool {
        (0..SIZE as i8).contains(&self.x) && (0..SIZE as i8).contains(&self.y)
    }

    /// Row-major cell index. Only meaningful for coordinates inside the grid.
    #[inline]
    fn index(self) -> usize {
        debug_assert!(self.is_inside());
        self.y as usize * SIZE + self.x as usize
    }

    #[inline]
    fn from_index(idx: usize) -> Self {
        Coord::new((idx % SIZE) as i8, (idx / SIZE) as i8)
    }
}

/// Stable handle for a tile, assigned at creation and never reused by a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A numbered tile. `value` is the exponent: the tile shows `2^value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    id: TileId,
    coord: Coord,
    value: u8,
    /// Set once the tile absorbed another during the current pass.
    merged: bool,
}

impl Tile {
    pub fn new(id: TileId, coord: Coord, value: u8) -> Self {
        Tile { id, coord, value, merged: false }
    }

    #[inline]
    pub fn id(&self) -> TileId { self.id }

    #[inline]
    pub fn coord(&self) -> Coord { self.coord }

    #[inline]
    pub fn value(&self) -> u8 { self.value }

    /// Displayed number, `2^value`.
    #[inline]
    pub fn magnitude(&self) -> u64 {
        magnitude(self.value)
    }

    /// Whether this tile can still absorb an equal neighbour.
    #[inline]
    fn can_grow(&self) -> bool {
        self.value < MAX_EXPONENT
    }

    /// Move the tile. Returns false (and changes nothing) if `coord` is the current one.
    pub fn set_coord(&mut self, coord: Coord) -> bool {
        if self.coord == coord {
            return false;
        }
        self.coord = coord;
        true
    }

    /// Change the exponent. Returns false (and changes nothing) if it is unchanged.
    pub fn set_value(&mut self, value: u8) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}

/// Summary of one move-resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    /// At least one tile slid or merged (and a new tile was dealt).
    pub moved: bool,
    /// Number of pairwise merges performed.
    pub merges: u32,
    /// The grid reached a state with no legal move.
    pub game_over: bool,
}

/// The grid engine: live tiles, score and best score.
///
/// All mutation goes through the methods below and is reported on the
/// change-event stream (see [`Grid::drain_events`]). Persistence is
/// best-effort: store failures are logged and never surface here.
///
/// ```
/// use tile_merge::config::EngineConfig;
/// use tile_merge::engine::{Coord, Grid, Move};
/// use tile_merge::serialization::NullStore;
///
/// let tiles = [(Coord::new(0, 0), 1), (Coord::new(1, 0), 1)];
/// let mut grid = Grid::from_tiles(EngineConfig::seeded(1), Box::new(NullStore), tiles);
/// let outcome = grid.process_move(Move::Right);
/// assert_eq!(outcome.merges, 1);
/// assert_eq!(grid.tile_at(Coord::new(3, 0)).map(|t| t.value()), Some(2));
/// ```
pub struct Grid {
    tiles: Vec<Tile>,
    score: u64,
    best_score: u64,
    next_id: u32,
    rng: StdRng,
    config: EngineConfig,
    store: Box<dyn SaveStore>,
    events: Vec<GridEvent>,
}

impl Grid {
    fn blank(config: EngineConfig, store: Box<dyn SaveStore>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Grid {
            tiles: Vec::with_capacity(CELLS),
            score: 0,
            best_score: 0,
            next_id: 0,
            rng,
            config,
            store,
            events: Vec::new(),
        }
    }

    /// Start a session: rehydrate from `store` if it holds a valid save,
    /// otherwise deal two fresh tiles with a zero best score.
    pub fn open(config: EngineConfig, store: Box<dyn SaveStore>) -> Self {
        let mut grid = Grid::blank(config, store);
        match grid.store.load() {
            Ok(Some(data)) => match grid.restore(&data) {
                Ok(()) => {
                    info!(
                        "loaded saved game: {} tiles, score {}, best {}",
                        grid.tiles.len(),
                        grid.score,
                        grid.best_score
                    );
                    return grid;
                }
                Err(e) => warn!("discarding saved game: {e}"),
            },
            Ok(None) => info!("no saved game found, starting fresh"),
            Err(e) => warn!("failed to load saved game: {e}"),
        }
        grid.best_score = 0;
        grid.spawn_tile();
        grid.spawn_tile();
        grid.recompute_score();
        grid
    }

    /// Build a grid from explicit `(coord, value)` tiles without dealing or saving.
    ///
    /// The caller is responsible for the tiles being in bounds and on distinct cells.
    pub fn from_tiles<I>(config: EngineConfig, store: Box<dyn SaveStore>, tiles: I) -> Self
    where
        I: IntoIterator<Item = (Coord, u8)>,
    {
        let mut grid = Grid::blank(config, store);
        for (coord, value) in tiles {
            grid.insert_tile(coord, value);
        }
        grid.score = grid.tile_sum();
        grid.best_score = grid.score;
        grid.check_invariants();
        grid
    }

    fn restore(&mut self, data: &SaveData) -> Result<(), SaveError> {
        data.validate()?;
        for rec in &data.tiles {
            self.insert_tile(Coord::new(rec.x, rec.y), rec.num);
        }
        self.score = self.tile_sum();
        if self.score != data.score {
            debug!("saved score {} differs from tile sum {}; using tile sum", data.score, self.score);
        }
        self.best_score = data.best_score.max(self.score);
        self.events.push(GridEvent::ScoreChanged { score: self.score, best_score: self.best_score });
        self.check_invariants();
        Ok(())
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] { &self.tiles }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_at(&self, coord: Coord) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.coord == coord)
    }

    #[inline]
    pub fn score(&self) -> u64 { self.score }

    #[inline]
    pub fn best_score(&self) -> u64 { self.best_score }

    #[inline]
    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Take all change events emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current state in its persisted shape.
    pub fn snapshot(&self) -> SaveData {
        SaveData {
            score: self.score,
            best_score: self.best_score,
            tiles: self
                .tiles
                .iter()
                .map(|t| TileRecord { x: t.coord.x, y: t.coord.y, num: t.value })
                .collect(),
        }
    }

    fn occupancy(&self) -> u16 {
        self.tiles.iter().fold(0u16, |mask, t| mask | (1 << t.coord.index()))
    }

    /// Pick an empty cell uniformly at random, or `None` if the grid is full.
    pub fn find_empty_position(&mut self) -> Option<Coord> {
        let mut empty = !self.occupancy();
        let count = empty.count_ones();
        if count == 0 {
            return None;
        }
        let mut index = self.rng.gen_range(0..count);
        while index > 0 {
            empty &= empty - 1;
            index -= 1;
        }
        Some(Coord::from_index(empty.trailing_zeros() as usize))
    }

    /// Deal a tile (value 2 with `spawn_high_probability`, else 1) onto a random
    /// empty cell. No-op on a full grid.
    pub fn spawn_tile(&mut self) -> Option<TileId> {
        let coord = self.find_empty_position()?;
        let value = if self.rng.gen::<f64>() < self.config.spawn_high_probability { 2 } else { 1 };
        let id = self.insert_tile(coord, value);
        debug!("spawned tile {id} at ({}, {}) with value {}", coord.x, coord.y, value);
        Some(id)
    }

    fn insert_tile(&mut self, coord: Coord, value: u8) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        self.tiles.push(Tile::new(id, coord, value));
        self.events.push(GridEvent::Created { id, coord, value });
        id
    }

    /// Entry point for input sources: resolve one discrete direction event.
    pub fn submit_direction(&mut self, dir: Move) -> MoveOutcome {
        debug!("direction submitted: {dir:?}");
        self.process_move(dir)
    }

    /// Slide and merge every tile in `dir`.
    ///
    /// Tiles are walked from the far edge back, each sliding as far as it can.
    /// A tile merges into an equal neighbour unless either already merged in
    /// this pass. If anything changed, a new tile is dealt, the score is
    /// recomputed and the terminal state is checked.
    pub fn process_move(&mut self, dir: Move) -> MoveOutcome {
        for tile in &mut self.tiles {
            tile.merged = false;
        }
        match dir {
            Move::Right => self.tiles.sort_by_key(|t| Reverse(t.coord.x)),
            Move::Left => self.tiles.sort_by_key(|t| t.coord.x),
            Move::Down => self.tiles.sort_by_key(|t| Reverse(t.coord.y)),
            Move::Up => self.tiles.sort_by_key(|t| t.coord.y),
        }

        let mut removed = vec![false; self.tiles.len()];
        let mut moved = false;
        let mut merges = 0;

        for i in 0..self.tiles.len() {
            if removed[i] {
                continue;
            }
            let from = self.tiles[i].coord;
            let mut pos = from;
            loop {
                let next = pos.step(dir);
                if !next.is_inside() {
                    break;
                }
                match self.live_index_at(next, &removed) {
                    None => {
                        pos = next;
                        moved = true;
                    }
                    Some(j) => {
                        let (mover, target) = (&self.tiles[i], &self.tiles[j]);
                        if mover.value == target.value && target.can_grow() && !mover.merged && !target.merged {
                            let value = target.value + 1;
                            let target = &mut self.tiles[j];
                            target.merged = true;
                            if target.set_value(value) {
                                self.events.push(GridEvent::ValueChanged { id: target.id, value });
                            }
                            removed[i] = true;
                            moved = true;
                            merges += 1;
                        }
                        break;
                    }
                }
            }
            let tile = &mut self.tiles[i];
            if tile.set_coord(pos) {
                self.events.push(GridEvent::Moved { id: tile.id, from, to: pos });
            }
        }

        if merges > 0 {
            let tiles = std::mem::take(&mut self.tiles);
            for (tile, gone) in tiles.into_iter().zip(removed) {
                if gone {
                    self.events.push(GridEvent::Removed { id: tile.id });
                } else {
                    self.tiles.push(tile);
                }
            }
        }
        self.check_invariants();

        if !moved {
            debug!("move {dir:?} changed nothing");
            return MoveOutcome::default();
        }
        debug!("move {dir:?}: {merges} merges");

        self.spawn_tile();
        self.recompute_score();
        let game_over = !self.can_make_move();
        if game_over {
            self.finish_game();
        }
        MoveOutcome { moved, merges, game_over }
    }

    /// Index of the tile at `coord`, skipping tiles consumed earlier in this pass.
    fn live_index_at(&self, coord: Coord, removed: &[bool]) -> Option<usize> {
        self.tiles
            .iter()
            .enumerate()
            .find(|&(i, t)| !removed[i] && t.coord == coord)
            .map(|(i, _)| i)
    }

    fn tile_sum(&self) -> u64 {
        self.tiles.iter().fold(0u64, |acc, t| acc.saturating_add(t.magnitude()))
    }

    /// Recompute the score from the live tiles, raise the best score if
    /// exceeded, and persist the current state.
    pub fn recompute_score(&mut self) {
        let score = self.tile_sum();
        let best_score = self.best_score.max(score);
        if score != self.score || best_score != self.best_score {
            self.events.push(GridEvent::ScoreChanged { score, best_score });
        }
        self.score = score;
        self.best_score = best_score;
        self.persist();
    }

    fn persist(&mut self) {
        let data = self.snapshot();
        if let Err(e) = self.store.save(&data) {
            warn!("failed to save game state: {e}");
        }
    }

    /// True if an empty cell exists or two orthogonal neighbours share a value.
    pub fn can_make_move(&self) -> bool {
        if self.occupancy() != FULL {
            return true;
        }
        let mut values = [0u8; CELLS];
        for t in &self.tiles {
            values[t.coord.index()] = t.value;
        }
        self.tiles.iter().any(|t| {
            Move::ALL.iter().any(|&dir| {
                let n = t.coord.step(dir);
                t.can_grow() && n.is_inside() && values[n.index()] == t.value
            })
        })
    }

    fn finish_game(&mut self) {
        info!("game over: score {}, best {}", self.score, self.best_score);
        self.events.push(GridEvent::GameOver { score: self.score, best_score: self.best_score });
        self.persist();
        if self.config.restart_on_game_over {
            self.restart();
        }
    }

    /// Clear the grid, discard the saved game, and deal two fresh tiles.
    ///
    /// Whether the best score survives is decided by the configured [`RestartPolicy`].
    pub fn restart(&mut self) {
        info!("restarting game (best score {})", self.best_score);
        let events = &mut self.events;
        events.extend(self.tiles.drain(..).map(|t| GridEvent::Removed { id: t.id }));
        self.score = 0;
        if let Err(e) = self.store.delete() {
            warn!("failed to delete saved game: {e}");
        }
        if self.config.restart_policy == RestartPolicy::ResetBest {
            self.best_score = 0;
        }
        self.spawn_tile();
        self.spawn_tile();
        self.recompute_score();
    }

    /// Panics in debug builds if two tiles share a cell or a tile is out of bounds.
    fn check_invariants(&self) {
        if cfg!(debug_assertions) {
            let mut seen = 0u16;
            for t in &self.tiles {
                assert!(t.coord.is_inside(), "tile {} out of bounds at {:?}", t.id, t.coord);
                let bit = 1u16 << t.coord.index();
                assert!(seen & bit == 0, "two tiles share cell {:?}", t.coord);
                seen |= bit;
            }
        }
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("tiles", &self.tiles)
            .field("score", &self.score)
            .field("best_score", &self.best_score)
            .finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells = [0u8; CELLS];
        for t in &self.tiles {
            cells[t.coord.index()] = t.value;
        }
        writeln!(f)?;
        for (row_idx, row) in cells.chunks(SIZE).enumerate() {
            if row_idx > 0 {
                writeln!(f, "{}", "-".repeat(8 * SIZE))?;
            }
            let row: Vec<String> = row.iter().map(format_val).collect();
            writeln!(f, "{}", row.join("|"))?;
        }
        Ok(())
    }
}

fn format_val(val: &u8) -> String {
    match val {
        0 => " ".repeat(7),
        &x => format!("{:^7}", magnitude(x)),
    }
}

/// `2^value`, saturating at `u64::MAX`.
#[inline]
fn magnitude(value: u8) -> u64 {
    1u64.checked_shl(u32::from(value)).unwrap_or(u64::MAX)
}
