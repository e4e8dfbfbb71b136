use once_cell::sync::Lazy;
use rand::Rng;

use crate::models::{Grid, Op, Tile};

/// Default digit distribution: uniform weight over 0..=9.
static DEFAULT_DIGIT_WEIGHTS: Lazy<Vec<(i64, f32)>> =
    Lazy::new(|| (0..=9).map(|digit| (digit, 1.0)).collect());

/// Tile-generation knobs for one game.
#[derive(Debug, Clone)]
pub struct SpawnPolicy {
    /// Number seeds placed on a fresh board.
    pub initial_tiles: usize,
    /// Tiles added after each board-changing move.
    pub tiles_per_move: usize,
    /// Probability that a spawned tile is an operator instead of a number.
    pub operator_rate: f32,
    /// Weighted digit distribution for number tiles.
    pub digit_weights: Vec<(i64, f32)>,
    /// Operator pool drawn from when an operator spawns.
    pub operators: Vec<Op>,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        SpawnPolicy {
            initial_tiles: 4,
            tiles_per_move: 1,
            operator_rate: 0.2,
            digit_weights: DEFAULT_DIGIT_WEIGHTS.clone(),
            operators: Op::ALL.to_vec(),
        }
    }
}

/// Weighted tile generator with uniform placement into empty cells.
pub struct TileSpawner {
    policy: SpawnPolicy,
    cumulative_dist: Vec<(i64, f32)>,
    total: f32,
}

impl TileSpawner {
    pub fn new(policy: SpawnPolicy) -> Self {
        let mut cumulative = 0.0;
        let cumulative_dist: Vec<(i64, f32)> = policy
            .digit_weights
            .iter()
            .map(|(digit, weight)| {
                cumulative += weight;
                (*digit, cumulative)
            })
            .collect();

        TileSpawner {
            policy,
            cumulative_dist,
            total: cumulative,
        }
    }

    pub fn policy(&self) -> &SpawnPolicy {
        &self.policy
    }

    /// Draw a tile according to the policy mix of operators and numbers.
    pub fn random_tile(&self, rng: &mut impl Rng) -> Tile {
        if !self.policy.operators.is_empty() && rng.random::<f32>() < self.policy.operator_rate {
            let index = rng.random_range(0..self.policy.operators.len());
            Tile::Operator(self.policy.operators[index])
        } else {
            Tile::Number(self.random_digit(rng))
        }
    }

    /// Draw a number tile with the weighted digit distribution.
    pub fn random_number(&self, rng: &mut impl Rng) -> Tile {
        Tile::Number(self.random_digit(rng))
    }

    fn random_digit(&self, rng: &mut impl Rng) -> i64 {
        let random_value = rng.random::<f32>() * self.total;

        for (digit, cumulative) in &self.cumulative_dist {
            if random_value <= *cumulative {
                return *digit;
            }
        }

        self.cumulative_dist.last().map(|(d, _)| *d).unwrap_or(0)
    }

    /// Seed `count` number tiles into uniformly chosen empty cells.
    /// Returns how many were actually placed.
    pub fn spawn_numbers(&self, grid: &mut Grid, count: usize, rng: &mut impl Rng) -> usize {
        self.spawn_with(grid, count, rng, Self::random_number)
    }

    /// Spawn `count` policy-mixed tiles into uniformly chosen empty cells.
    /// Stops early (silently) once the board is full.
    pub fn spawn_tiles(&self, grid: &mut Grid, count: usize, rng: &mut impl Rng) -> usize {
        self.spawn_with(grid, count, rng, Self::random_tile)
    }

    fn spawn_with<R: Rng>(
        &self,
        grid: &mut Grid,
        count: usize,
        rng: &mut R,
        mut draw: impl FnMut(&Self, &mut R) -> Tile,
    ) -> usize {
        let mut empties: Vec<(usize, usize)> = Vec::new();
        for (row_index, row) in grid.iter().enumerate() {
            for (col_index, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    empties.push((row_index, col_index));
                }
            }
        }

        let placed = count.min(empties.len());
        for _ in 0..placed {
            let index = rng.random_range(0..empties.len());
            let (row, col) = empties.swap_remove(index);
            grid[row][col] = draw(self, rng);
        }

        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_grid(rows: usize, cols: usize) -> Grid {
        vec![vec![Tile::Empty; cols]; rows]
    }

    fn count_filled(grid: &Grid) -> usize {
        grid.iter().flatten().filter(|t| !t.is_empty()).count()
    }

    #[test]
    fn test_default_policy() {
        let policy = SpawnPolicy::default();
        assert_eq!(policy.initial_tiles, 4);
        assert_eq!(policy.tiles_per_move, 1);
        assert_eq!(policy.digit_weights.len(), 10);
        assert_eq!(policy.operators.len(), 3);
    }

    #[test]
    fn test_spawn_numbers_places_exact_count() {
        let spawner = TileSpawner::new(SpawnPolicy::default());
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = empty_grid(6, 7);

        let placed = spawner.spawn_numbers(&mut grid, 4, &mut rng);

        assert_eq!(placed, 4);
        assert_eq!(count_filled(&grid), 4);
        assert!(grid
            .iter()
            .flatten()
            .all(|t| t.is_empty() || t.is_number()));
    }

    #[test]
    fn test_spawned_digits_stay_in_range() {
        let spawner = TileSpawner::new(SpawnPolicy::default());
        let mut rng = StdRng::seed_from_u64(11);
        let mut grid = empty_grid(10, 10);

        spawner.spawn_numbers(&mut grid, 100, &mut rng);

        for tile in grid.iter().flatten() {
            let value = tile.number().unwrap();
            assert!((0..=9).contains(&value), "digit out of range: {}", value);
        }
    }

    #[test]
    fn test_spawn_stops_on_full_board() {
        let spawner = TileSpawner::new(SpawnPolicy::default());
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = vec![vec![Tile::Number(1); 3]; 2];

        let placed = spawner.spawn_tiles(&mut grid, 5, &mut rng);

        assert_eq!(placed, 0);
        assert!(grid.iter().flatten().all(|t| *t == Tile::Number(1)));
    }

    #[test]
    fn test_spawn_caps_at_remaining_space() {
        let spawner = TileSpawner::new(SpawnPolicy::default());
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = empty_grid(2, 2);

        let placed = spawner.spawn_tiles(&mut grid, 10, &mut rng);

        assert_eq!(placed, 4);
        assert_eq!(count_filled(&grid), 4);
    }

    #[test]
    fn test_operator_rate_zero_spawns_numbers_only() {
        let policy = SpawnPolicy {
            operator_rate: 0.0,
            ..SpawnPolicy::default()
        };
        let spawner = TileSpawner::new(policy);
        let mut rng = StdRng::seed_from_u64(5);
        let mut grid = empty_grid(10, 10);

        spawner.spawn_tiles(&mut grid, 100, &mut rng);

        assert!(grid.iter().flatten().all(|t| t.is_number()));
    }

    #[test]
    fn test_operator_rate_one_spawns_operators_only() {
        let policy = SpawnPolicy {
            operator_rate: 1.0,
            ..SpawnPolicy::default()
        };
        let spawner = TileSpawner::new(policy);
        let mut rng = StdRng::seed_from_u64(5);
        let mut grid = empty_grid(10, 10);

        spawner.spawn_tiles(&mut grid, 100, &mut rng);

        assert!(grid.iter().flatten().all(|t| t.is_operator()));
    }

    #[test]
    fn test_same_seed_spawns_same_tiles() {
        let spawner = TileSpawner::new(SpawnPolicy::default());

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut grid_a = empty_grid(6, 7);
        spawner.spawn_tiles(&mut grid_a, 10, &mut rng_a);

        let mut rng_b = StdRng::seed_from_u64(42);
        let mut grid_b = empty_grid(6, 7);
        spawner.spawn_tiles(&mut grid_b, 10, &mut rng_b);

        assert_eq!(grid_a, grid_b);
    }
}
