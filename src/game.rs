//! Game state: session counters, phase machine, swap turn protocol, reshuffle.

use crate::board::{Board, Coord, has_matches};
use crate::cascade::{Cascade, MAX_CLEANLINESS, Stage, resolve};
use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

/// Delay before a swap that made no match is swapped back.
const REVERT_DELAY_MS: u64 = 300;

/// Session phase. Start is only left through start/restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Playing,
    Win,
    Lose,
}

/// Per-session counters. Reset only by start/restart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub moves_remaining: u32,
    pub reshuffles_remaining: u32,
    /// 0..=100, never decreases within a session.
    pub cleanliness: f64,
    pub phase: Phase,
}

impl Session {
    fn fresh(config: &crate::GameConfig, phase: Phase) -> Self {
        Self {
            moves_remaining: config.starting_moves,
            reshuffles_remaining: config.starting_reshuffles,
            cleanliness: 0.0,
            phase,
        }
    }
}

/// Why the board was redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardChange {
    Initial,
    Swap,
    Cleared,
    Fallen,
    Refilled,
    Revert,
    Reshuffle,
    Restart,
}

impl From<Stage> for BoardChange {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Cleared => Self::Cleared,
            Stage::Fallen => Self::Fallen,
            Stage::Refilled => Self::Refilled,
        }
    }
}

/// Presentation collaborator. Called after every visible board phase and every
/// counter/phase change.
pub trait Renderer {
    fn board_changed(&mut self, board: &Board, change: BoardChange);
    fn session_changed(&mut self, session: &Session);
}

/// Headless: ignore all notifications.
impl Renderer for () {
    fn board_changed(&mut self, _board: &Board, _change: BoardChange) {}
    fn session_changed(&mut self, _session: &Session) {}
}

/// Work that spans several scheduling turns.
#[derive(Debug, Clone)]
enum Work {
    Cascade(Cascade),
    Revert(Coord, Coord),
}

#[derive(Debug, Clone)]
struct Pending {
    work: Work,
    /// Wait before the next [`GameState::advance`].
    delay: Duration,
}

/// Owns the board, the session and the selection. All input funnels through here.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub session: Session,
    pub selection: Option<Coord>,
    config: crate::GameConfig,
    rng: StdRng,
    pending: Option<Pending>,
}

impl GameState {
    /// New state in the Start phase with a first board already drawn.
    pub fn new(config: &crate::GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let board = Board::generate(&mut rng);
        Self {
            board,
            session: Session::fresh(config, Phase::Start),
            selection: None,
            config: config.clone(),
            rng,
            pending: None,
        }
    }

    /// True while a cascade or a revert is in flight; all input is ignored meanwhile.
    #[inline]
    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    /// How long to wait before calling [`advance`](Self::advance), if anything is pending.
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.delay)
    }

    /// Whether a reshuffle would currently be accepted.
    pub fn can_reshuffle(&self) -> bool {
        self.session.phase == Phase::Playing
            && !self.is_processing()
            && self.session.reshuffles_remaining > 0
    }

    /// Start → Playing. No-op in any other phase.
    pub fn request_start(&mut self, renderer: &mut impl Renderer) {
        if self.session.phase != Phase::Start || self.is_processing() {
            return;
        }
        self.reset(renderer, BoardChange::Initial);
    }

    /// Start/Win/Lose → Playing with a fresh session and board.
    pub fn request_restart(&mut self, renderer: &mut impl Renderer) {
        if self.session.phase == Phase::Playing || self.is_processing() {
            return;
        }
        self.reset(renderer, BoardChange::Restart);
    }

    fn reset(&mut self, renderer: &mut impl Renderer, change: BoardChange) {
        self.session = Session::fresh(&self.config, Phase::Playing);
        self.selection = None;
        self.pending = None;
        self.board = Board::generate(&mut self.rng);
        info!(
            "session started: {} moves, {} reshuffles",
            self.session.moves_remaining, self.session.reshuffles_remaining
        );
        renderer.board_changed(&self.board, change);
        renderer.session_changed(&self.session);
    }

    /// Cell pick from the player. The first pick selects; the second always clears the
    /// selection and swaps only when the two cells are orthogonal neighbours.
    pub fn select_cell(&mut self, row: usize, col: usize, renderer: &mut impl Renderer) {
        if self.session.phase != Phase::Playing || self.is_processing() {
            return;
        }
        let at = match Coord::new(row, col) {
            Some(at) => at,
            None => return,
        };
        if self.board.get(at).is_empty() {
            return;
        }

        let first = match self.selection.take() {
            Some(first) => first,
            None => {
                self.selection = Some(at);
                return;
            }
        };
        if !first.is_adjacent(at) {
            debug!("discarded non-adjacent pick {:?} -> {:?}", first, at);
            return;
        }

        self.board.swap(first, at);
        self.session.moves_remaining = self.session.moves_remaining.saturating_sub(1);
        renderer.board_changed(&self.board, BoardChange::Swap);
        renderer.session_changed(&self.session);

        if has_matches(&self.board) {
            debug!("swap {:?} <-> {:?} matched, cascading", first, at);
            self.pending = Some(Pending {
                work: Work::Cascade(Cascade::new()),
                delay: Duration::ZERO,
            });
        } else {
            debug!("swap {:?} <-> {:?} made no match, reverting", first, at);
            self.pending = Some(Pending {
                work: Work::Revert(first, at),
                delay: Duration::from_millis(REVERT_DELAY_MS),
            });
        }
    }

    /// Pay one move and one reshuffle for a brand-new board. No cascade follows.
    pub fn request_reshuffle(&mut self, renderer: &mut impl Renderer) {
        if !self.can_reshuffle() {
            return;
        }
        self.session.reshuffles_remaining -= 1;
        self.session.moves_remaining = self.session.moves_remaining.saturating_sub(1);
        self.selection = None;
        self.board = Board::generate(&mut self.rng);
        info!(
            "reshuffled: {} reshuffles and {} moves left",
            self.session.reshuffles_remaining, self.session.moves_remaining
        );
        renderer.board_changed(&self.board, BoardChange::Reshuffle);
        renderer.session_changed(&self.session);
        self.check_game_state(renderer);
    }

    /// Perform the next pending stage. Returns the wait before the following call, or
    /// None once nothing is pending.
    pub fn advance(&mut self, renderer: &mut impl Renderer) -> Option<Duration> {
        let mut pending = self.pending.take()?;
        let report = match &mut pending.work {
            Work::Revert(a, b) => {
                self.board.swap(*a, *b);
                renderer.board_changed(&self.board, BoardChange::Revert);
                self.check_game_state(renderer);
                return None;
            }
            Work::Cascade(cascade) => {
                cascade.step(&mut self.board, &mut self.session.cleanliness, &mut self.rng)
            }
        };

        let Some(report) = report else {
            info!(
                "turn resolved: cleanliness {:.1}, {} moves left",
                self.session.cleanliness, self.session.moves_remaining
            );
            self.check_game_state(renderer);
            return None;
        };
        trace!("{:?}: {} cells", report.stage, report.cells);
        renderer.board_changed(&self.board, report.stage.into());
        if report.delta > 0.0 {
            renderer.session_changed(&self.session);
        }
        pending.delay = report.stage.delay();
        self.pending = Some(pending);
        self.pending_delay()
    }

    /// Run all pending work immediately (headless / no animation). A cascade that has not
    /// taken its first step is resolved in one go and its snapshots replayed.
    pub fn settle(&mut self, renderer: &mut impl Renderer) {
        let fresh_cascade = matches!(
            &self.pending,
            Some(Pending { work: Work::Cascade(cascade), .. }) if cascade.rounds() == 0
        );
        if fresh_cascade {
            self.pending = None;
            let resolution = resolve(&self.board, self.session.cleanliness, &mut self.rng);
            for snapshot in &resolution.snapshots {
                renderer.board_changed(&snapshot.board, snapshot.stage.into());
            }
            self.board = resolution.board;
            self.session.cleanliness = resolution.cleanliness;
            if resolution.delta > 0.0 {
                renderer.session_changed(&self.session);
            }
            info!(
                "turn resolved in {} round(s): cleanliness +{:.1}, {} moves left",
                resolution.rounds, resolution.delta, self.session.moves_remaining
            );
            self.check_game_state(renderer);
            return;
        }
        while self.pending.is_some() {
            self.advance(renderer);
        }
    }

    /// Playing → Win/Lose. Win is checked first; nothing fires while work is pending.
    fn check_game_state(&mut self, renderer: &mut impl Renderer) {
        if self.session.phase != Phase::Playing || self.is_processing() {
            return;
        }
        let next = if self.session.cleanliness >= MAX_CLEANLINESS {
            Phase::Win
        } else if self.session.moves_remaining == 0 {
            Phase::Lose
        } else {
            return;
        };
        info!("session ended: {:?}", next);
        self.session.phase = next;
        self.selection = None;
        renderer.session_changed(&self.session);
    }

    #[cfg(test)]
    pub(crate) fn with_board(config: &crate::GameConfig, board: Board) -> Self {
        let mut state = Self::new(config);
        state.request_start(&mut ());
        state.board = board;
        state
    }
}
