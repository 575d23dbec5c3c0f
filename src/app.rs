//! App: terminal init, main loop, cascade pacing, key and mouse handling.

use crate::board::{Board, Coord};
use crate::game::{BoardChange, GameState, Phase, Renderer, Session};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, ClearFlash, Scene};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{debug, info, trace};
use ratatui::DefaultTerminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io::Write;
use std::time::{Duration, Instant};

/// Modal layer drawn over the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Info,
    Quit(QuitOption),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Exit,
}

impl QuitOption {
    fn toggled(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }
}

/// Terminal side of [`Renderer`]: starts the clear flash and logs what changed.
/// The frame itself is redrawn every loop iteration from [`GameState`].
#[derive(Default)]
struct TuiRenderer {
    flash: ClearFlash,
    no_animation: bool,
}

impl Renderer for TuiRenderer {
    fn board_changed(&mut self, board: &Board, change: BoardChange) {
        trace!("board changed: {:?}", change);
        match change {
            BoardChange::Cleared if !self.no_animation => self.flash.start(board.empty_cells()),
            _ => self.flash.stop(),
        }
    }

    fn session_changed(&mut self, session: &Session) {
        debug!(
            "session: {:?}, {} moves, {} reshuffles, cleanliness {:.1}",
            session.phase,
            session.moves_remaining,
            session.reshuffles_remaining,
            session.cleanliness
        );
    }
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    renderer: TuiRenderer,
    overlay: Overlay,
    /// Keyboard cursor on the board.
    cursor: Coord,
    /// When the next cascade / revert stage is due.
    next_step_at: Option<Instant>,
    /// Area of the last drawn frame, for mouse hit-testing.
    last_area: Rect,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        let mut renderer = TuiRenderer {
            no_animation: config.no_animation,
            ..TuiRenderer::default()
        };
        let mut state = GameState::new(&config);
        if args.no_menu {
            state.request_start(&mut renderer);
        }
        Self {
            args,
            config,
            theme,
            state,
            renderer,
            overlay: Overlay::None,
            cursor: Coord::default(),
            next_step_at: None,
            last_area: Rect::default(),
        }
    }

    fn frame_interval(&self) -> Duration {
        let rate = if self.args.frame_rate > 0.0 {
            self.args.frame_rate
        } else {
            30.0
        };
        Duration::from_secs_f64(1.0 / rate)
    }

    /// Run due cascade stages. Without animation everything resolves at once.
    fn step_pending(&mut self, now: Instant) {
        if self.config.no_animation {
            self.state.settle(&mut self.renderer);
            self.next_step_at = None;
            return;
        }
        if self.next_step_at.is_none() {
            self.next_step_at = self.state.pending_delay().map(|d| now + d);
        }
        while let Some(at) = self.next_step_at {
            if now < at {
                break;
            }
            self.next_step_at = self.state.advance(&mut self.renderer).map(|d| now + d);
        }
    }

    fn move_cursor(&mut self, drow: isize, dcol: isize) {
        if let Some(next) = self.cursor.offset(drow, dcol) {
            self.cursor = next;
        }
    }

    fn pick(&mut self, at: Coord) {
        self.cursor = at;
        self.state.select_cell(at.row, at.col, &mut self.renderer);
    }

    fn restart(&mut self) {
        self.state.request_restart(&mut self.renderer);
        self.cursor = Coord::default();
    }

    /// Apply one action. Returns true when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match self.overlay {
            Overlay::Quit(selected) => {
                match action {
                    Action::Up | Action::Down | Action::Left | Action::Right => {
                        self.overlay = Overlay::Quit(selected.toggled());
                    }
                    Action::Select => match selected {
                        QuitOption::Resume => self.overlay = Overlay::None,
                        QuitOption::Exit => return true,
                    },
                    Action::Quit => self.overlay = Overlay::None,
                    _ => {}
                }
                return false;
            }
            Overlay::Info => {
                if matches!(action, Action::Info | Action::Select | Action::Quit) {
                    self.overlay = Overlay::None;
                }
                return false;
            }
            Overlay::None => {}
        }

        if action == Action::Info {
            self.overlay = Overlay::Info;
            return false;
        }

        match self.state.session.phase {
            Phase::Start => match action {
                Action::Select | Action::Restart => self.state.request_start(&mut self.renderer),
                Action::Quit => return true,
                _ => {}
            },
            Phase::Playing => match action {
                Action::Up => self.move_cursor(-1, 0),
                Action::Down => self.move_cursor(1, 0),
                Action::Left => self.move_cursor(0, -1),
                Action::Right => self.move_cursor(0, 1),
                Action::Select => self.pick(self.cursor),
                Action::Reshuffle => self.state.request_reshuffle(&mut self.renderer),
                Action::Quit => self.overlay = Overlay::Quit(QuitOption::Resume),
                _ => {}
            },
            Phase::Win | Phase::Lose => match action {
                Action::Restart | Action::Select => self.restart(),
                Action::Quit => return true,
                _ => {}
            },
        }
        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) || self.overlay != Overlay::None {
            return;
        }
        match self.state.session.phase {
            Phase::Start => self.state.request_start(&mut self.renderer),
            Phase::Playing => {
                if let Some(at) = ui::cell_at(self.last_area, mouse.column, mouse.row) {
                    self.pick(at);
                }
            }
            Phase::Win | Phase::Lose => self.restart(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        let result = execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .and_then(|()| DefaultTerminal::new(CrosstermBackend::new(stdout)))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        let restored = restore_terminal(&mut std::io::stdout());
        info!("exiting");
        result?;
        Ok(restored?)
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_interval = self.frame_interval();
        loop {
            let now = Instant::now();
            self.step_pending(now);

            let completed = terminal.draw(|f| {
                let scene = Scene {
                    state: &self.state,
                    theme: &self.theme,
                    overlay: self.overlay,
                    cursor: self.cursor,
                    glyphs: self.config.glyphs,
                };
                ui::draw(f, &scene, &mut self.renderer.flash, now);
            })?;
            self.last_area = completed.area;

            let mut timeout = frame_interval.saturating_sub(now.elapsed());
            if let Some(at) = self.next_step_at {
                timeout = timeout.min(at.saturating_duration_since(Instant::now()));
            }

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_action(key_to_action(key)) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse),
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Leave the alternate screen and raw mode. Every step is attempted; the first error wins.
fn restore_terminal(out: &mut impl Write) -> std::io::Result<()> {
    let mouse = execute!(out, DisableMouseCapture);
    let screen = execute!(out, LeaveAlternateScreen);
    let raw = disable_raw_mode();
    mouse.and(screen).and(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn app(extra: &[&str]) -> App {
        let mut argv = vec!["oceantui", "--seed", "21"];
        argv.extend_from_slice(extra);
        let args = Args::try_parse_from(argv).unwrap();
        let config = GameConfig {
            starting_moves: args.moves,
            starting_reshuffles: args.reshuffles,
            seed: args.seed,
            no_animation: args.no_animation,
            glyphs: args.glyphs,
        };
        App::new(args, config, Theme::default())
    }

    #[test]
    fn no_menu_starts_playing() {
        assert_eq!(app(&[]).state.session.phase, Phase::Start);
        assert_eq!(app(&["--no-menu"]).state.session.phase, Phase::Playing);
    }

    #[test]
    fn enter_leaves_start_screen() {
        let mut app = app(&[]);
        assert!(!app.handle_action(Action::Select));
        assert_eq!(app.state.session.phase, Phase::Playing);
    }

    #[test]
    fn quit_asks_before_exiting() {
        let mut app = app(&["--no-menu"]);
        assert!(!app.handle_action(Action::Quit));
        assert_eq!(app.overlay, Overlay::Quit(QuitOption::Resume));

        assert!(!app.handle_action(Action::Select));
        assert_eq!(app.overlay, Overlay::None);

        app.handle_action(Action::Quit);
        app.handle_action(Action::Down);
        assert_eq!(app.overlay, Overlay::Quit(QuitOption::Exit));
        assert!(app.handle_action(Action::Select));
    }

    #[test]
    fn info_overlay_swallows_input() {
        let mut app = app(&["--no-menu"]);
        app.handle_action(Action::Info);
        assert_eq!(app.overlay, Overlay::Info);

        let moves = app.state.session.moves_remaining;
        app.handle_action(Action::Reshuffle);
        assert_eq!(app.state.session.moves_remaining, moves);

        app.handle_action(Action::Info);
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn cursor_stays_on_board() {
        let mut app = app(&["--no-menu"]);
        app.handle_action(Action::Up);
        app.handle_action(Action::Left);
        assert_eq!(app.cursor, Coord::default());

        for _ in 0..20 {
            app.handle_action(Action::Down);
            app.handle_action(Action::Right);
        }
        assert_eq!(app.cursor, Coord { row: 11, col: 11 });
    }

    #[test]
    fn enter_selects_under_cursor() {
        let mut app = app(&["--no-menu"]);
        app.handle_action(Action::Right);
        app.handle_action(Action::Select);
        assert_eq!(app.state.selection, Some(Coord { row: 0, col: 1 }));
    }

    #[test]
    fn reshuffle_key_spends_budget() {
        let mut app = app(&["--no-menu", "--reshuffles", "1"]);
        app.handle_action(Action::Reshuffle);
        assert_eq!(app.state.session.reshuffles_remaining, 0);
        assert_eq!(app.state.session.moves_remaining, 49);
    }

    #[test]
    fn swap_resolves_over_time() {
        let mut app = app(&["--no-menu"]);
        app.handle_action(Action::Select);
        app.handle_action(Action::Right);
        app.handle_action(Action::Select);
        assert!(app.state.is_processing());

        // Far enough ahead that every stage is due on each call.
        let mut now = Instant::now();
        for _ in 0..200 {
            now += Duration::from_secs(1);
            app.step_pending(now);
            if !app.state.is_processing() {
                break;
            }
        }
        assert!(!app.state.is_processing());
        assert!(app.next_step_at.is_none());
    }

    #[test]
    fn no_animation_settles_immediately() {
        let mut app = app(&["--no-menu", "--no-animation"]);
        app.handle_action(Action::Select);
        app.handle_action(Action::Right);
        app.handle_action(Action::Select);
        app.step_pending(Instant::now());
        assert!(!app.state.is_processing());
        assert!(!app.renderer.flash.is_active());
    }

    #[test]
    fn clear_flash_follows_board_changes() {
        let mut renderer = TuiRenderer::default();
        renderer.board_changed(&Board::empty(), BoardChange::Cleared);
        assert!(renderer.flash.is_active());

        let board = Board::generate(&mut StdRng::seed_from_u64(1));
        renderer.board_changed(&board, BoardChange::Fallen);
        assert!(!renderer.flash.is_active());
    }

    fn left_click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: crossterm::event::KeyModifiers::NONE,
        }
    }

    #[test]
    fn click_on_end_screen_plays_again() {
        let mut app = app(&["--no-menu"]);
        app.cursor = Coord { row: 4, col: 4 };
        app.state.session.phase = Phase::Lose;
        app.state.session.moves_remaining = 0;

        app.handle_mouse(left_click(0, 0));
        assert_eq!(app.state.session.phase, Phase::Playing);
        assert_eq!(app.state.session.moves_remaining, 50);
        assert_eq!(app.cursor, Coord::default());
    }

    #[test]
    fn click_selects_board_cell() {
        let mut app = app(&["--no-menu"]);
        app.last_area = Rect::new(0, 0, 100, 40);
        let board = ui::board_rect(app.last_area);
        app.handle_mouse(left_click(board.x + 4, board.y + 2));
        assert_eq!(app.state.selection, Some(Coord { row: 2, col: 1 }));
    }

    #[test]
    fn restore_leaves_alternate_screen_and_mouse_mode() {
        let mut out = Vec::new();
        let _ = restore_terminal(&mut out);
        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("\x1b[?1000l"));
        assert!(written.contains("\x1b[?1049l"));
    }
}
