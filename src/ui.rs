//! Layout and drawing: start screen, board, sidebar HUD, info / end / quit overlays.

use crate::app::{Overlay, QuitOption};
use crate::board::{BOARD_SIZE, Cell, Coord, Piece};
use crate::cascade::{MAX_CLEANLINESS, Stage};
use crate::game::{GameState, Phase};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is 3 terminal columns: a 2-wide emoji plus a gap.
const CELL_WIDTH: u16 = 3;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 28;

/// Flash on cleared cells lasts as long as the clear pause itself.
fn clear_flash_ms() -> u32 {
    Stage::Cleared.delay().as_millis() as u32
}

/// Everything the renderer reads for one frame.
pub struct Scene<'a> {
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub overlay: Overlay,
    pub cursor: Coord,
    pub glyphs: bool,
}

/// Cells emptied by the latest clear, and the tachyonfx flash running over them.
#[derive(Default)]
pub struct ClearFlash {
    pub cells: Vec<Coord>,
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl ClearFlash {
    pub fn start(&mut self, cells: Vec<Coord>) {
        self.cells = cells;
        self.effect = None;
        self.last_process = None;
    }

    pub fn stop(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.last_process = None;
    }

    pub fn is_active(&self) -> bool {
        !self.cells.is_empty()
    }
}

/// Board + border size in terminal cells.
fn board_outer_size() -> (u16, u16) {
    let n = BOARD_SIZE as u16;
    (n * CELL_WIDTH + 2, n * CELL_HEIGHT + 2)
}

/// (board with border, sidebar), centred in `area`.
fn game_layout(area: Rect) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size();
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Board cells only (no border); matches what [`draw`] paints.
pub fn board_rect(area: Rect) -> Rect {
    let (outer, _) = game_layout(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

/// Board coordinate under a terminal position (mouse hit-testing).
pub fn cell_at(area: Rect, column: u16, row: u16) -> Option<Coord> {
    let board = board_rect(area);
    if !board.contains(Position::new(column, row)) {
        return None;
    }
    Coord::new(
        ((row - board.y) / CELL_HEIGHT) as usize,
        ((column - board.x) / CELL_WIDTH) as usize,
    )
}

fn cell_origin(board: Rect, at: Coord) -> (u16, u16) {
    (
        board.x + at.col as u16 * CELL_WIDTH,
        board.y + at.row as u16 * CELL_HEIGHT,
    )
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Draw the current phase plus any overlay, then run the clear flash.
pub fn draw(frame: &mut Frame, scene: &Scene, flash: &mut ClearFlash, now: Instant) {
    let area = frame.area();
    if scene.state.session.phase == Phase::Start {
        draw_start_screen(frame, scene.theme, area);
    } else {
        draw_game(frame, scene, area);
        if flash.is_active() {
            apply_clear_flash(frame, scene.theme, area, flash, now);
        }
        if matches!(scene.state.session.phase, Phase::Win | Phase::Lose) {
            draw_end_overlay(frame, scene, area);
        }
    }
    match scene.overlay {
        Overlay::None => {}
        Overlay::Info => draw_info_overlay(frame, scene.theme, area),
        Overlay::Quit(selected) => draw_quit_menu(frame, scene.theme, area, selected),
    }
}

fn how_to_play(theme: &Theme) -> Vec<Line<'static>> {
    let fg = Style::default().fg(theme.main_fg);
    let strong = bold(theme.title);
    vec![
        Line::from(Span::styled("How to play?", bold(theme.title))),
        Line::from(""),
        Line::from(Span::styled(
            "• Swap neighbouring pieces to line up 3 or more of the same kind.",
            fg,
        )),
        Line::from(vec![
            Span::styled("• The main goal is matching ", fg),
            Span::styled("pollution", strong),
            Span::styled(
                format!(
                    " ({} {} {}).",
                    Piece::Bottle.emoji(),
                    Piece::Can.emoji(),
                    Piece::Cup.emoji()
                ),
                fg,
            ),
        ]),
        Line::from(vec![
            Span::styled("• Tip: pollution cleans the ocean ", fg),
            Span::styled("much faster", strong),
            Span::styled("!", fg),
        ]),
        Line::from(vec![
            Span::styled("• Stuck? Press ", fg),
            Span::styled("R", strong),
            Span::styled(" to reshuffle the board (costs one move).", fg),
        ]),
        Line::from(vec![
            Span::styled("• Reach ", fg),
            Span::styled("100% cleanliness", strong),
            Span::styled(" before your moves run out!", fg),
        ]),
    ]
}

fn draw_start_screen(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 76, 20);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Ocean Cleanup ", bold(theme.title))),
        Line::from(Span::styled(
            " SDG 14: Life Below Water ",
            Style::default().fg(theme.main_fg).add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];
    lines.extend(how_to_play(theme));
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            " [ ENTER ] Start cleaning! ",
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [I] Info    [Q] Quit ",
            Style::default().fg(theme.inactive_fg),
        )),
    ]);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme))
        .render(popup, frame.buffer_mut());
}

/// Board + sidebar; the board block carries the key hints in its bottom title.
fn draw_game(frame: &mut Frame, scene: &Scene, area: Rect) {
    let (board_outer, sidebar) = game_layout(area);
    let theme = scene.theme;

    let block = bordered(theme)
        .title(Span::styled(" Ocean Cleanup ", bold(theme.title)))
        .title_bottom(Span::styled(
            " ←↑↓→ move  ⏎ pick  R shuffle  I info ",
            Style::default().fg(theme.inactive_fg),
        ));
    let inner = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());
    draw_board(frame.buffer_mut(), scene, inner);
    draw_sidebar(frame, scene, sidebar);
}

fn draw_board(buf: &mut Buffer, scene: &Scene, board: Rect) {
    let theme = scene.theme;
    let state = scene.state;
    let show_cursor = state.session.phase == Phase::Playing;

    for (row, line) in state.board.rows().iter().enumerate() {
        for (col, cell) in line.iter().enumerate() {
            let at = Coord { row, col };
            let (x, y) = cell_origin(board, at);
            if x + CELL_WIDTH > board.x + board.width || y >= board.y + board.height {
                continue;
            }
            let bg = if state.selection == Some(at) {
                theme.selected_bg
            } else if show_cursor && scene.cursor == at {
                theme.cursor_bg
            } else {
                theme.bg
            };
            let base = Style::default().bg(bg);
            buf.set_string(x, y, "   ", base);
            match cell {
                Cell::Empty => {}
                Cell::Piece(piece) if scene.glyphs => {
                    let style = base
                        .fg(theme.piece_color(piece.color_index()))
                        .add_modifier(Modifier::BOLD);
                    buf.set_string(x + 1, y, piece.glyph().to_string(), style);
                }
                Cell::Piece(piece) => {
                    buf.set_string(x, y, piece.emoji(), base);
                }
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, scene: &Scene, area: Rect) {
    let theme = scene.theme;
    let session = &scene.state.session;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Status: moves, reshuffle, cleanliness
            Constraint::Length(1),
            Constraint::Length(3), // Gauge
            Constraint::Length(1),
            Constraint::Length(4), // Legend
        ])
        .split(area);

    let reshuffle_style = if scene.state.can_reshuffle() {
        bold(theme.title)
    } else {
        Style::default().fg(theme.inactive_fg)
    };
    let status = vec![
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(session.moves_remaining.to_string(), fg_style),
        ]),
        Line::from(Span::styled(
            format!("Reshuffle ({})", session.reshuffles_remaining),
            reshuffle_style,
        )),
        Line::from(vec![
            Span::styled("Cleanliness: ", title_style),
            Span::styled(format!("{}%", cleanliness_percent(session.cleanliness)), fg_style),
        ]),
    ];
    Paragraph::new(status)
        .block(bordered(theme))
        .render(chunks[0], frame.buffer_mut());

    let ratio = (session.cleanliness / MAX_CLEANLINESS).clamp(0.0, 1.0);
    Gauge::default()
        .block(bordered(theme))
        .ratio(ratio)
        .label(format!("{}%", cleanliness_percent(session.cleanliness)))
        .gauge_style(Style::default().fg(theme.title).bg(theme.bg))
        .render(chunks[2], frame.buffer_mut());

    let legend_row = |label: &'static str, pieces: &[Piece]| {
        let mut spans = vec![Span::styled(label, title_style)];
        for piece in pieces {
            if scene.glyphs {
                spans.push(Span::styled(
                    format!("{} ", piece.glyph()),
                    bold(theme.piece_color(piece.color_index())),
                ));
            } else {
                spans.push(Span::raw(format!("{} ", piece.emoji())));
            }
        }
        Line::from(spans)
    };
    let legend = vec![
        legend_row("Life  ", &Piece::OCEAN_LIFE),
        legend_row("Trash ", &Piece::POLLUTION),
    ];
    Paragraph::new(legend)
        .block(bordered(theme))
        .render(chunks[4], frame.buffer_mut());
}

/// Percent shown to the player: rounded half up, like the meter's text in a browser.
pub fn cleanliness_percent(cleanliness: f64) -> u32 {
    (cleanliness + 0.5).floor().clamp(0.0, MAX_CLEANLINESS) as u32
}

/// Start (or continue) the white flash over cleared cells; it fades to their real colours.
fn apply_clear_flash(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let board = board_rect(area);
    let delta = flash
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_process = Some(now);

    if flash.effect.is_none() {
        let positions: HashSet<(u16, u16)> = flash
            .cells
            .iter()
            .flat_map(|&at| {
                let (x, y) = cell_origin(board, at);
                (x..x + CELL_WIDTH).map(move |cx| (cx, y))
            })
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            theme.title,
            (clear_flash_ms(), Interpolation::QuadOut),
        )
        .with_filter(filter)
        .with_area(board);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_end_overlay(frame: &mut Frame, scene: &Scene, area: Rect) {
    let theme = scene.theme;
    let won = scene.state.session.phase == Phase::Win;
    let (title, message, badge) = if won {
        (" Congratulations! ", "You cleaned the ocean!", Color::Green)
    } else {
        (" Game over! ", "You almost cleaned it all.", Color::Red)
    };
    let (board_outer, _) = game_layout(area);
    let popup = centered(board_outer, 32, 9);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(badge)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(
            format!(
                "Cleanliness {}%",
                cleanliness_percent(scene.state.session.cleanliness)
            ),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [N] Play again   [Q] Quit ",
            Style::default().fg(theme.title),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_info_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 74, 16);
    let mut lines = vec![
        Line::from(Span::styled(
            "Conserve and sustainably use the oceans, seas and marine resources.",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
    ];
    lines.extend(how_to_play(theme));
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            " [I] Continue ",
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
    ]);
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            bordered(theme).title(Span::styled(" SDG 14: Life Below Water ", bold(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, area: Rect, selected: QuitOption) {
    let quit_rect = centered(area, 24, 6);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    Clear.render(quit_rect, frame.buffer_mut());
    frame
        .buffer_mut()
        .set_style(quit_rect, Style::default().bg(theme.bg));
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [(QuitOption::Resume, " Resume "), (QuitOption::Exit, " Exit ")];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let ry = inner.y + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
