//! Cascade resolution: clear matches, let pieces fall, refill, rescan until stable.

use crate::board::{Board, Cell, find_matches};
use log::{debug, trace};
use rand::Rng;
use std::time::Duration;

/// Cleanliness gained per cleared pollution piece.
pub const POLLUTION_WEIGHT: f64 = 2.0;
/// Cleanliness gained per cleared ocean-life piece.
pub const LIFE_WEIGHT: f64 = 0.5;
/// Cleanliness is clamped here; reaching it wins the session.
pub const MAX_CLEANLINESS: f64 = 100.0;

/// Presentation delay after each stage when a live renderer is pacing the cascade.
const CLEAR_DELAY_MS: u64 = 300;
const FALL_DELAY_MS: u64 = 200;
const REFILL_DELAY_MS: u64 = 200;

/// Visible stage of one cascade round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cleared,
    Fallen,
    Refilled,
}

impl Stage {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(match self {
            Self::Cleared => CLEAR_DELAY_MS,
            Self::Fallen => FALL_DELAY_MS,
            Self::Refilled => REFILL_DELAY_MS,
        })
    }
}

/// What one call to [`Cascade::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub stage: Stage,
    /// Cells emptied (Cleared), or refilled (Refilled); 0 for Fallen.
    pub cells: usize,
    /// Cleanliness actually added this step, after clamping.
    pub delta: f64,
}

/// Board captured right after a stage, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub stage: Stage,
    pub board: Board,
}

/// Outcome of running a cascade to its fixed point.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub board: Board,
    pub cleanliness: f64,
    pub delta: f64,
    /// Number of clear/fall/refill rounds.
    pub rounds: u32,
    pub snapshots: Vec<Snapshot>,
}

/// Raw weight of one clear, before clamping.
pub fn cleanliness_delta(pollution: usize, life: usize) -> f64 {
    pollution as f64 * POLLUTION_WEIGHT + life as f64 * LIFE_WEIGHT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Scan,
    Fall,
    Refill,
}

/// Resumable cascade: each [`step`](Cascade::step) advances exactly one stage so a
/// renderer can show the board in between. Returns `None` once a scan finds no match.
///
/// There is no round cap; chains continue for as long as refills keep producing matches.
#[derive(Debug, Clone)]
pub struct Cascade {
    next: Next,
    rounds: u32,
    total_delta: f64,
}

impl Default for Cascade {
    fn default() -> Self {
        Self::new()
    }
}

impl Cascade {
    pub fn new() -> Self {
        Self {
            next: Next::Scan,
            rounds: 0,
            total_delta: 0.0,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Sum of clamped cleanliness added so far.
    pub fn total_delta(&self) -> f64 {
        self.total_delta
    }

    pub fn step(
        &mut self,
        board: &mut Board,
        cleanliness: &mut f64,
        rng: &mut impl Rng,
    ) -> Option<StepReport> {
        match self.next {
            Next::Scan => {
                let matches = find_matches(board);
                if matches.is_empty() {
                    debug!(
                        "cascade settled after {} round(s), +{:.1} cleanliness",
                        self.rounds, self.total_delta
                    );
                    return None;
                }
                let pollution = matches
                    .iter()
                    .filter(|&&at| board.get(at).piece().is_some_and(|p| p.is_pollution()))
                    .count();
                let life = matches.len() - pollution;

                let before = *cleanliness;
                *cleanliness = (before + cleanliness_delta(pollution, life)).min(MAX_CLEANLINESS);
                let delta = *cleanliness - before;
                self.total_delta += delta;

                for &at in &matches {
                    board.set(at, Cell::Empty);
                }
                self.rounds += 1;
                self.next = Next::Fall;
                trace!(
                    "round {}: cleared {} pollution + {} life, cleanliness {:.1}",
                    self.rounds, pollution, life, cleanliness
                );
                Some(StepReport {
                    stage: Stage::Cleared,
                    cells: matches.len(),
                    delta,
                })
            }
            Next::Fall => {
                board.apply_gravity();
                self.next = Next::Refill;
                Some(StepReport {
                    stage: Stage::Fallen,
                    cells: 0,
                    delta: 0.0,
                })
            }
            Next::Refill => {
                let filled = board.refill(rng);
                self.next = Next::Scan;
                Some(StepReport {
                    stage: Stage::Refilled,
                    cells: filled,
                    delta: 0.0,
                })
            }
        }
    }
}

/// Run a cascade to completion without pacing, collecting every stage snapshot.
pub fn resolve(board: &Board, starting_cleanliness: f64, rng: &mut impl Rng) -> Resolution {
    let mut board = *board;
    let mut cleanliness = starting_cleanliness;
    let mut cascade = Cascade::new();
    let mut snapshots = Vec::new();
    while let Some(report) = cascade.step(&mut board, &mut cleanliness, rng) {
        snapshots.push(Snapshot {
            stage: report.stage,
            board,
        });
    }
    Resolution {
        board,
        cleanliness,
        delta: cascade.total_delta(),
        rounds: cascade.rounds(),
        snapshots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::striped_board;
    use crate::board::{Coord, Piece};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn planted_pollution() -> Board {
        let mut board = striped_board();
        for col in 4..=6 {
            board.set(Coord::new(5, col).unwrap(), Cell::Piece(Piece::Bottle));
        }
        board
    }

    /// First seed whose refills do not chain, so the planted run is the only clear.
    fn single_round(board: &Board, start: f64) -> Resolution {
        (0..500)
            .map(|seed| resolve(board, start, &mut StdRng::seed_from_u64(seed)))
            .find(|r| r.rounds == 1)
            .expect("some seed resolves without a chain reaction")
    }

    #[test]
    fn pollution_run_adds_six() {
        let resolution = single_round(&planted_pollution(), 10.0);
        assert_eq!(resolution.delta, 6.0);
        assert_eq!(resolution.cleanliness, 16.0);
        assert_eq!(resolution.board.empty_count(), 0);
        assert!(find_matches(&resolution.board).is_empty());
    }

    #[test]
    fn snapshots_follow_clear_fall_refill() {
        let resolution = single_round(&planted_pollution(), 0.0);
        let stages: Vec<Stage> = resolution.snapshots.iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![Stage::Cleared, Stage::Fallen, Stage::Refilled]);

        let cleared = &resolution.snapshots[0].board;
        assert_eq!(cleared.empty_count(), 3);
        // After the fall the three holes sit in the top row of their columns.
        let fallen = &resolution.snapshots[1].board;
        for col in 4..=6 {
            assert!(fallen.get(Coord::new(0, col).unwrap()).is_empty());
        }
        assert_eq!(resolution.snapshots[2].board.empty_count(), 0);
    }

    #[test]
    fn life_run_adds_half_per_cell() {
        let mut board = striped_board();
        for col in 4..=6 {
            board.set(Coord::new(5, col).unwrap(), Cell::Piece(Piece::Turtle));
        }
        // Neighbours of the run must not extend it.
        assert_eq!(find_matches(&board).len(), 3);
        let resolution = single_round(&board, 0.0);
        assert_eq!(resolution.delta, 1.5);
    }

    #[test]
    fn gravity_lines_up_a_second_round() {
        let mut board = planted_pollution();
        for (row, col) in [(4, 4), (4, 5), (5, 3)] {
            board.set(Coord::new(row, col).unwrap(), Cell::Piece(Piece::Can));
        }
        // Only the bottles match now; the cans line up on row 5 once the bottles fall away.
        assert_eq!(find_matches(&board).len(), 3);

        for seed in 0..20 {
            let resolution = resolve(&board, 10.0, &mut StdRng::seed_from_u64(seed));
            assert!(resolution.rounds >= 2);
            assert!(resolution.delta >= 12.0);
            assert_eq!(resolution.cleanliness, 10.0 + resolution.delta);
            assert_eq!(resolution.snapshots.len(), 3 * resolution.rounds as usize);
            for round in resolution.snapshots.chunks(3) {
                let stages: Vec<Stage> = round.iter().map(|s| s.stage).collect();
                assert_eq!(stages, vec![Stage::Cleared, Stage::Fallen, Stage::Refilled]);
            }
            assert_eq!(resolution.board.empty_count(), 0);
            assert!(find_matches(&resolution.board).is_empty());
        }
    }

    #[test]
    fn cleanliness_is_clamped_at_max() {
        let resolution = resolve(&planted_pollution(), 99.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(resolution.cleanliness, MAX_CLEANLINESS);
        assert_eq!(resolution.delta, 1.0);
    }

    #[test]
    fn stable_board_is_a_fixed_point() {
        let board = striped_board();
        let resolution = resolve(&board, 42.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(resolution.rounds, 0);
        assert!(resolution.snapshots.is_empty());
        assert_eq!(resolution.board, board);
        assert_eq!(resolution.delta, 0.0);
    }

    #[test]
    fn step_reports_clamped_delta() {
        let mut board = planted_pollution();
        let mut cleanliness = 97.0;
        let mut cascade = Cascade::new();
        let report = cascade
            .step(&mut board, &mut cleanliness, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(report.stage, Stage::Cleared);
        assert_eq!(report.cells, 3);
        assert_eq!(report.delta, 3.0);
        assert_eq!(cleanliness, MAX_CLEANLINESS);
    }

    #[test]
    fn stage_delays() {
        assert_eq!(Stage::Cleared.delay(), Duration::from_millis(300));
        assert_eq!(Stage::Fallen.delay(), Duration::from_millis(200));
        assert_eq!(Stage::Refilled.delay(), Duration::from_millis(200));
    }

    #[test]
    fn weights() {
        assert_eq!(cleanliness_delta(3, 0), 6.0);
        assert_eq!(cleanliness_delta(0, 3), 1.5);
        assert_eq!(cleanliness_delta(3, 2), 7.0);
    }
}
