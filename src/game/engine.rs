use rand::Rng;
use thiserror::Error;

use crate::game::spawner::{SpawnPolicy, TileSpawner};
use crate::models::{Direction, GameStatus, Grid, Tile};

/// Fixed rules for one game. Everything the engine does flows from these;
/// nothing is hard-coded in the move resolution itself.
#[derive(Debug, Clone)]
pub struct GameRules {
    pub rows: usize,
    pub cols: usize,
    /// A number tile at or above this value wins the game.
    pub target_value: i64,
    /// Merge results below the floor are stored as the floor.
    /// `None` keeps raw (possibly negative) results.
    pub merge_floor: Option<i64>,
    pub spawn: SpawnPolicy,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            rows: 6,
            cols: 7,
            target_value: 67,
            merge_floor: Some(0),
            spawn: SpawnPolicy::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("grid dimensions must be non-zero, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
}

/// Result of resolving one move against a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub grid: Grid,
    pub score_delta: u64,
    pub moved: bool,
}

pub struct GameEngine {
    rules: GameRules,
    spawner: TileSpawner,
}

impl GameEngine {
    pub fn new(rules: GameRules) -> Self {
        let spawner = TileSpawner::new(rules.spawn.clone());
        GameEngine { rules, spawner }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Build a fresh board: all empty except the initial number seeds.
    pub fn spawn_initial(&self, rng: &mut impl Rng) -> Result<Grid, EngineError> {
        if self.rules.rows == 0 || self.rules.cols == 0 {
            return Err(EngineError::InvalidDimensions {
                rows: self.rules.rows,
                cols: self.rules.cols,
            });
        }

        let mut grid = vec![vec![Tile::Empty; self.rules.cols]; self.rules.rows];
        self.spawner
            .spawn_numbers(&mut grid, self.rules.spawn.initial_tiles, rng);
        Ok(grid)
    }

    /// Pure slide-and-merge in one direction. Never spawns.
    ///
    /// Every line is resolved toward the target edge: empties compact out,
    /// then a single scan merges each `Number Operator Number` triple into
    /// one number tile. A tile produced by a merge is never reconsidered in
    /// the same move.
    pub fn shift(&self, grid: &Grid, direction: Direction) -> MoveOutcome {
        let mut next = grid.clone();
        let mut score_delta = 0u64;
        let cols = next.first().map_or(0, Vec::len);

        match direction {
            Direction::Left => {
                for row in next.iter_mut() {
                    score_delta += self.resolve_line(row);
                }
            }
            Direction::Right => {
                for row in next.iter_mut() {
                    row.reverse();
                    score_delta += self.resolve_line(row);
                    row.reverse();
                }
            }
            Direction::Up => {
                for col in 0..cols {
                    let mut line: Vec<Tile> = next.iter().map(|row| row[col]).collect();
                    score_delta += self.resolve_line(&mut line);
                    for (row, tile) in next.iter_mut().zip(line) {
                        row[col] = tile;
                    }
                }
            }
            Direction::Down => {
                for col in 0..cols {
                    let mut line: Vec<Tile> = next.iter().rev().map(|row| row[col]).collect();
                    score_delta += self.resolve_line(&mut line);
                    for (row, tile) in next.iter_mut().rev().zip(line) {
                        row[col] = tile;
                    }
                }
            }
        }

        let moved = next != *grid;
        MoveOutcome {
            grid: next,
            score_delta,
            moved,
        }
    }

    /// Shift, then spawn new tiles unless the board did not change or the
    /// shift itself already reached the win target.
    pub fn apply_move(&self, grid: &Grid, direction: Direction, rng: &mut impl Rng) -> MoveOutcome {
        let mut outcome = self.shift(grid, direction);
        if outcome.moved && !self.has_reached_target(&outcome.grid) {
            self.spawner
                .spawn_tiles(&mut outcome.grid, self.rules.spawn.tiles_per_move, rng);
        }
        outcome
    }

    /// Terminal detection. A win takes priority over a loss, so a full,
    /// unmovable board that holds a target tile still counts as won.
    pub fn status(&self, grid: &Grid) -> GameStatus {
        if self.has_reached_target(grid) {
            GameStatus::Won
        } else if self.has_moves(grid) {
            GameStatus::InProgress
        } else {
            GameStatus::Lost
        }
    }

    /// True when at least one direction would change the board.
    pub fn has_moves(&self, grid: &Grid) -> bool {
        Direction::ALL
            .iter()
            .any(|dir| self.shift(grid, *dir).moved)
    }

    fn has_reached_target(&self, grid: &Grid) -> bool {
        grid.iter()
            .flatten()
            .any(|tile| matches!(tile, Tile::Number(n) if *n >= self.rules.target_value))
    }

    // Compact one line toward index 0 and merge triples in a single scan.
    // Returns the score gained: the absolute value of each raw merge result,
    // counted before the merge floor clamps what gets stored.
    fn resolve_line(&self, line: &mut Vec<Tile>) -> u64 {
        let len = line.len();
        let compact: Vec<Tile> = line.iter().copied().filter(|t| !t.is_empty()).collect();

        let mut resolved: Vec<Tile> = Vec::with_capacity(len);
        let mut score = 0u64;
        let mut i = 0;
        while i < compact.len() {
            let first = compact[i];
            let second = compact.get(i + 1).copied();
            let third = compact.get(i + 2).copied();

            match (first, second, third) {
                (Tile::Number(a), Some(Tile::Operator(op)), Some(Tile::Number(b))) => {
                    let raw = op.apply(a, b);
                    let stored = match self.rules.merge_floor {
                        Some(floor) => raw.max(floor),
                        None => raw,
                    };
                    score += raw.unsigned_abs();
                    resolved.push(Tile::Number(stored));
                    i += 3;
                }
                _ => {
                    resolved.push(first);
                    i += 1;
                }
            }
        }

        resolved.resize(len, Tile::Empty);
        *line = resolved;
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Op;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const E: Tile = Tile::Empty;

    fn n(value: i64) -> Tile {
        Tile::Number(value)
    }

    fn o(op: Op) -> Tile {
        Tile::Operator(op)
    }

    fn engine() -> GameEngine {
        GameEngine::new(GameRules::default())
    }

    fn engine_with(rules: GameRules) -> GameEngine {
        GameEngine::new(rules)
    }

    fn row(line: &[Tile]) -> Grid {
        vec![line.to_vec()]
    }

    fn count_filled(grid: &Grid) -> usize {
        grid.iter().flatten().filter(|t| !t.is_empty()).count()
    }

    #[test]
    fn test_merge_addition() {
        let outcome = engine().shift(&row(&[n(2), o(Op::Add), n(3), E, E]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(5), E, E, E, E]));
        assert_eq!(outcome.score_delta, 5);
        assert!(outcome.moved);
    }

    #[test]
    fn test_merge_subtraction() {
        let outcome = engine().shift(&row(&[n(6), o(Op::Sub), n(1)]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(5), E, E]));
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_merge_multiplication() {
        let outcome = engine().shift(&row(&[n(2), o(Op::Mul), n(4)]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(8), E, E]));
        assert_eq!(outcome.score_delta, 8);
    }

    #[test]
    fn test_negative_result_clamps_to_floor() {
        let outcome = engine().shift(&row(&[n(1), o(Op::Sub), n(6)]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(0), E, E]));
        // Score still reflects the raw result's magnitude.
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_lifted_floor_keeps_negative_results() {
        let rules = GameRules {
            merge_floor: None,
            ..GameRules::default()
        };
        let outcome = engine_with(rules).shift(&row(&[n(1), o(Op::Sub), n(6)]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(-5), E, E]));
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_merged_tile_does_not_chain_in_same_move() {
        let outcome = engine().shift(
            &row(&[n(2), o(Op::Add), n(3), o(Op::Add), n(5)]),
            Direction::Left,
        );
        // The produced 5 must not immediately consume the next "+ 5".
        assert_eq!(outcome.grid, row(&[n(5), o(Op::Add), n(5), E, E]));
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_slide_without_merge() {
        let outcome = engine().shift(&row(&[E, n(7), E, o(Op::Add)]), Direction::Left);
        assert_eq!(outcome.grid, row(&[n(7), o(Op::Add), E, E]));
        assert_eq!(outcome.score_delta, 0);
        assert!(outcome.moved);
    }

    #[test]
    fn test_adjacent_numbers_do_not_merge() {
        let outcome = engine().shift(&row(&[n(2), n(3), E]), Direction::Left);
        assert!(!outcome.moved);
        assert_eq!(outcome.score_delta, 0);
    }

    #[test]
    fn test_leading_operator_blocks_nothing_but_merges_nothing() {
        let outcome = engine().shift(&row(&[o(Op::Add), n(2), n(3)]), Direction::Left);
        assert!(!outcome.moved);
        assert_eq!(outcome.grid, row(&[o(Op::Add), n(2), n(3)]));
    }

    #[test]
    fn test_shift_right_packs_toward_right_edge() {
        let outcome = engine().shift(&row(&[n(2), o(Op::Add), n(3), E]), Direction::Right);
        assert_eq!(outcome.grid, row(&[E, E, E, n(5)]));
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_shift_up_resolves_columns_top_down() {
        let grid = vec![vec![E], vec![n(6)], vec![o(Op::Sub)], vec![n(1)]];
        let outcome = engine().shift(&grid, Direction::Up);
        assert_eq!(outcome.grid, vec![vec![n(5)], vec![E], vec![E], vec![E]]);
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_shift_down_resolves_columns_bottom_up() {
        let grid = vec![vec![E], vec![n(6)], vec![o(Op::Sub)], vec![n(1)]];
        let outcome = engine().shift(&grid, Direction::Down);
        // Reading from the bottom the line is 1 - 6, clamped at the floor.
        assert_eq!(outcome.grid, vec![vec![E], vec![E], vec![E], vec![n(0)]]);
        assert_eq!(outcome.score_delta, 5);
    }

    #[test]
    fn test_noop_shift_returns_unchanged_grid() {
        let grid = row(&[n(5), E, E]);
        let outcome = engine().shift(&grid, Direction::Left);
        assert!(!outcome.moved);
        assert_eq!(outcome.grid, grid);
        assert_eq!(outcome.score_delta, 0);
    }

    #[test]
    fn test_apply_move_spawns_after_a_change() {
        let mut rng = StdRng::seed_from_u64(9);
        let outcome = engine().apply_move(&row(&[n(2), o(Op::Add), n(3), E, E]), Direction::Left, &mut rng);
        assert!(outcome.moved);
        // One merged tile plus one freshly spawned tile.
        assert_eq!(count_filled(&outcome.grid), 2);
        assert_eq!(outcome.grid[0][0], n(5));
    }

    #[test]
    fn test_apply_move_does_not_spawn_on_noop() {
        let mut rng = StdRng::seed_from_u64(9);
        let grid = row(&[n(5), E, E]);
        let outcome = engine().apply_move(&grid, Direction::Left, &mut rng);
        assert!(!outcome.moved);
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_winning_merge_suppresses_spawn() {
        let rules = GameRules {
            rows: 1,
            cols: 5,
            target_value: 10,
            ..GameRules::default()
        };
        let eng = engine_with(rules);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = eng.apply_move(&row(&[n(6), o(Op::Add), n(4), E, E]), Direction::Left, &mut rng);
        assert!(outcome.moved);
        assert_eq!(outcome.grid, row(&[n(10), E, E, E, E]));
        assert_eq!(eng.status(&outcome.grid), GameStatus::Won);
    }

    #[test]
    fn test_status_in_progress_while_moves_remain() {
        let status = engine().status(&row(&[n(2), n(3), E]));
        assert_eq!(status, GameStatus::InProgress);
    }

    #[test]
    fn test_status_lost_when_no_direction_changes_the_board() {
        // Full single row, no operator between numbers: nothing can move.
        let status = engine().status(&row(&[n(2), n(3), n(4)]));
        assert_eq!(status, GameStatus::Lost);
    }

    #[test]
    fn test_status_win_takes_priority_over_stuck_board() {
        let rules = GameRules {
            target_value: 4,
            ..GameRules::default()
        };
        let status = engine_with(rules).status(&row(&[n(4), n(3), n(2)]));
        assert_eq!(status, GameStatus::Won);
    }

    #[test]
    fn test_all_empty_grid_is_lost() {
        let grid = vec![vec![E; 2]; 2];
        assert_eq!(engine().status(&grid), GameStatus::Lost);
        assert!(!engine().has_moves(&grid));
    }

    #[test]
    fn test_spawn_initial_dimensions_and_seeds() {
        let eng = engine();
        let mut rng = StdRng::seed_from_u64(99);
        let grid = eng.spawn_initial(&mut rng).unwrap();

        assert_eq!(grid.len(), 6);
        assert!(grid.iter().all(|row| row.len() == 7));
        assert_eq!(count_filled(&grid), 4);
        assert!(grid.iter().flatten().all(|t| t.is_empty() || t.is_number()));
    }

    #[test]
    fn test_spawn_initial_rejects_zero_dimensions() {
        let rules = GameRules {
            rows: 0,
            cols: 7,
            ..GameRules::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let err = engine_with(rules).spawn_initial(&mut rng).unwrap_err();
        assert_eq!(err, EngineError::InvalidDimensions { rows: 0, cols: 7 });
    }

    #[test]
    fn test_shift_conserves_or_reduces_tiles_in_pairs() {
        // Each merge consumes three tiles and produces one; anything else
        // slides. So the filled count drops by exactly two per merge.
        let eng = engine();
        let mut rng = StdRng::seed_from_u64(1234);
        for round in 0..50 {
            let mut grid = vec![vec![E; 7]; 6];
            eng.spawner.spawn_tiles(&mut grid, 14 + round % 10, &mut rng);
            let before = count_filled(&grid);
            for dir in Direction::ALL {
                let outcome = eng.shift(&grid, dir);
                let after = count_filled(&outcome.grid);
                assert!(after <= before);
                assert_eq!((before - after) % 2, 0);
            }
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let eng = engine();
        let grid = row(&[n(2), o(Op::Add), n(3), E, E, E, E]);

        let mut rng_a = StdRng::seed_from_u64(77);
        let mut rng_b = StdRng::seed_from_u64(77);
        let a = eng.apply_move(&grid, Direction::Left, &mut rng_a);
        let b = eng.apply_move(&grid, Direction::Left, &mut rng_b);

        assert_eq!(a, b);
    }
}
