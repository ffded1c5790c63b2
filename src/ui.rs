//! Layout and drawing: menu, board, sidebar, pause, quit menu, game over.

use crate::app::{MenuState, MenuTab, QuitOption, Screen};
use crate::game::{ExplosionEvent, GameOutcome, MatchState, Player};
use crate::theme::Theme;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    fx, ref_count, CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation,
};

/// Each board cell is 3 characters wide and 1 high inside a box-drawing
/// grid, so a cell occupies a 4x2 step and the board closes with one border.
const CELL_STEP_W: u16 = 4;
const CELL_STEP_H: u16 = 2;
const CELL_INNER_W: u16 = 3;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the explosion flash (TachyonFX) in ms.
const EXPLOSION_FLASH_MS: u32 = 300;

/// Board size in terminal cells for an NxN grid, borders included.
pub fn board_char_size(n: u16) -> (u16, u16) {
    (n * CELL_STEP_W + 1, n * CELL_STEP_H + 1)
}

/// Largest N whose board plus sidebar fits the given terminal.
pub fn max_grid_for_terminal(term_cols: u16, term_rows: u16) -> usize {
    let by_width = term_cols.saturating_sub(SIDEBAR_WIDTH + 1) / CELL_STEP_W;
    let by_height = term_rows.saturating_sub(1) / CELL_STEP_H;
    by_width.min(by_height) as usize
}

/// Outer rect of the board (borders included), centred with the sidebar.
fn board_rect(area: Rect, state: &MatchState) -> Rect {
    let (bw, bh) = board_char_size(state.size() as u16);
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    }
}

/// Buffer positions of a cell's 3x1 interior; used to aim the flash effect.
fn cell_buffer_positions(board: Rect, events: &[ExplosionEvent]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for ev in events {
        let x0 = board.x + 1 + ev.col as u16 * CELL_STEP_W;
        let y = board.y + 1 + ev.row as u16 * CELL_STEP_H;
        for x in x0..(x0 + CELL_INNER_W).min(board.x + board.width) {
            if y < board.y + board.height {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Draw current screen (menu, game, quit menu, game over), applying the
/// explosion flash when a replay batch is live.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &MatchState,
    theme: &Theme,
    paused: bool,
    cursor: (usize, usize),
    menu_state: &mut MenuState,
    quit_selected: Option<QuitOption>,
    now: Instant,
    flash_events: &[ExplosionEvent],
    explosion_effect: &mut Option<Effect>,
    explosion_effect_process_time: &mut Option<Instant>,
    area: Rect,
) {
    match screen {
        Screen::Menu => draw_menu(frame, state, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, state, theme, cursor, area);
            if !flash_events.is_empty() {
                apply_explosion_effect(
                    frame,
                    state,
                    theme,
                    area,
                    flash_events,
                    explosion_effect,
                    explosion_effect_process_time,
                    now,
                );
            }
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, cursor, area);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt, area);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, cursor, area);
            draw_game_over(frame, state, theme, area);
        }
    }
}

/// Create or update the explosion flash and process it: freshly exploded
/// cells light up in the exploding player's colour and fade back out.
fn apply_explosion_effect(
    frame: &mut Frame,
    state: &MatchState,
    theme: &Theme,
    area: Rect,
    flash_events: &[ExplosionEvent],
    explosion_effect: &mut Option<Effect>,
    explosion_effect_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = explosion_effect_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *explosion_effect_process_time = Some(now);

    if explosion_effect.is_none() {
        let flash_set = cell_buffer_positions(board, flash_events);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            flash_set.contains(&(pos.x, pos.y))
        }));
        let color = flash_events
            .first()
            .map(|ev| theme.player_color(ev.owner.index()))
            .unwrap_or(theme.title);
        let effect = fx::fade_from(color, color, (EXPLOSION_FLASH_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *explosion_effect = Some(effect);
    }

    if let Some(effect) = explosion_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

/// One cell's 3-character interior: orb pips or a count, owner-coloured.
fn cell_span(state: &MatchState, theme: &Theme, row: usize, col: usize, cursor: Option<(usize, usize)>) -> Span<'static> {
    let (text, fg) = match state.cell_at(row, col) {
        None => ("   ".to_string(), theme.main_fg),
        Some(cell) => {
            let text = match cell.count {
                1 => " ● ".to_string(),
                2 => "● ●".to_string(),
                3 => "●●●".to_string(),
                n => format!("{n:^3}"),
            };
            (text, theme.player_color(cell.owner.index()))
        }
    };
    let mut style = Style::default().fg(fg).bg(theme.bg);
    if cursor == Some((row, col)) {
        style = Style::default().fg(theme.bg).bg(theme.cursor);
    }
    Span::styled(text, style)
}

/// Box-drawing grid with the cells inside.
fn board_lines(state: &MatchState, theme: &Theme, cursor: Option<(usize, usize)>) -> Vec<Line<'static>> {
    let n = state.size();
    let grid_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let edge = |left: &str, mid: &str, right: &str| {
        let mut s = String::from(left);
        for col in 0..n {
            s.push_str("───");
            s.push_str(if col + 1 == n { right } else { mid });
        }
        Line::from(Span::styled(s, grid_style))
    };

    let mut lines = Vec::with_capacity(n * 2 + 1);
    lines.push(edge("┌", "┬", "┐"));
    for row in 0..n {
        let mut spans = Vec::with_capacity(n * 2 + 1);
        spans.push(Span::styled("│", grid_style));
        for col in 0..n {
            spans.push(cell_span(state, theme, row, col, cursor));
            spans.push(Span::styled("│", grid_style));
        }
        lines.push(Line::from(spans));
        if row + 1 < n {
            lines.push(edge("├", "┼", "┤"));
        }
    }
    lines.push(edge("└", "┴", "┘"));
    lines
}

fn player_lines(state: &MatchState, theme: &Theme, player: Player) -> Vec<Line<'static>> {
    let color = theme.player_color(player.index());
    let on_turn = state.current_player() == player && !state.is_game_over();
    let name_style = if on_turn {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };
    let text_style = Style::default().fg(if on_turn { theme.main_fg } else { theme.inactive_fg });
    vec![
        Line::from(vec![
            Span::styled("▌ ", Style::default().fg(color)),
            Span::styled(state.player_name(player).to_string(), name_style),
        ]),
        Line::from(Span::styled(
            format!("  Time:  {:>3}s", state.time_remaining(player)),
            text_style,
        )),
        Line::from(Span::styled(
            format!("  Moves: {:>3}", state.moves_made(player)),
            text_style,
        )),
    ]
}

fn draw_game(frame: &mut Frame, state: &MatchState, theme: &Theme, cursor: (usize, usize), area: Rect) {
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), area);

    let board = board_rect(area, state);
    // Cursor follows the mover; parked while the replay runs or the match
    // is done.
    let cursor = (!state.is_cascading() && !state.is_game_over()).then_some(cursor);
    frame.render_widget(Paragraph::new(board_lines(state, theme, cursor)), board);

    let sidebar = Rect {
        x: (board.x + board.width + 2).min(area.x + area.width),
        y: board.y,
        width: SIDEBAR_WIDTH.min((area.x + area.width).saturating_sub(board.x + board.width + 2)),
        height: board.height.max(16).min(area.height.saturating_sub(board.y.saturating_sub(area.y))),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "ORBTUI",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    lines.extend(player_lines(state, theme, Player::One));
    lines.push(Line::default());
    lines.extend(player_lines(state, theme, Player::Two));
    lines.push(Line::default());

    let turn = state.current_player();
    lines.push(Line::from(vec![
        Span::styled("Turn: ", Style::default().fg(theme.main_fg)),
        Span::styled(
            state.player_name(turn).to_string(),
            Style::default()
                .fg(theme.player_color(turn.index()))
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    if state.is_cascading() {
        lines.push(Line::from(Span::styled(
            "Chain reaction...",
            Style::default().fg(theme.title),
        )));
    } else {
        lines.push(Line::default());
    }
    lines.push(Line::default());
    let hint_style = Style::default().fg(theme.inactive_fg);
    lines.push(Line::from(Span::styled("arrows/hjkl move", hint_style)));
    lines.push(Line::from(Span::styled("enter/space place", hint_style)));
    lines.push(Line::from(Span::styled("p pause  q quit", hint_style)));

    frame.render_widget(Paragraph::new(lines), sidebar);
}

/// Centred popup rect of the given size, clipped to `area`.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let rect = popup_rect(area, 22, 3);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.bg).fg(theme.div_line));
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Paused",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(block),
        rect,
    );
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption, area: Rect) {
    let rect = popup_rect(area, 24, 5);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.bg).fg(theme.div_line));

    let option_line = |label: &str, opt: QuitOption| {
        let style = if opt == selected {
            Style::default().fg(theme.bg).bg(theme.title)
        } else {
            Style::default().fg(theme.main_fg)
        };
        Line::from(Span::styled(format!(" {label} "), style))
    };
    let lines = vec![
        option_line("Resume", QuitOption::Resume),
        option_line("Main menu", QuitOption::MainMenu),
        option_line("Exit", QuitOption::Exit),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        rect,
    );
}

fn draw_game_over(frame: &mut Frame, state: &MatchState, theme: &Theme, area: Rect) {
    let rect = popup_rect(area, 34, 6);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.bg).fg(theme.div_line));

    let verdict = match state.outcome() {
        Some(GameOutcome::Winner(p)) => Line::from(Span::styled(
            format!("{} wins!", state.player_name(p)),
            Style::default()
                .fg(theme.player_color(p.index()))
                .add_modifier(Modifier::BOLD),
        )),
        Some(GameOutcome::Draw) => Line::from(Span::styled(
            "Game ended in a draw!",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        None => Line::default(),
    };
    let lines = vec![
        Line::default(),
        verdict,
        Line::default(),
        Line::from(Span::styled(
            "R play again   Q quit",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        rect,
    );
}

fn draw_menu(
    frame: &mut Frame,
    state: &MatchState,
    theme: &Theme,
    menu_state: &MenuState,
    area: Rect,
    now: Instant,
) {
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), area);
    let rect = popup_rect(area, 40, 14);

    let tab_style = |tab: MenuTab| {
        if menu_state.current_tab == tab {
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.main_fg)
        }
    };
    // slow blink on the start row so the entry point reads at a glance
    let blink_on =
        now.saturating_duration_since(menu_state.animation_start).as_millis() / 500 % 2 == 0;
    let start_marker = if blink_on && menu_state.current_tab == MenuTab::Start {
        "▸ Start ◂"
    } else {
        "  Start  "
    };

    let lines = vec![
        Line::from(Span::styled(
            "O R B T U I",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "a chain reaction duel",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(
                state.player_name(Player::One).to_string(),
                Style::default().fg(theme.player_color(0)),
            ),
            Span::styled(" vs ", Style::default().fg(theme.main_fg)),
            Span::styled(
                state.player_name(Player::Two).to_string(),
                Style::default().fg(theme.player_color(1)),
            ),
        ]),
        Line::default(),
        Line::from(Span::styled(
            format!(
                "Board  ◂ {0} × {0} ▸",
                menu_state.selected_grid
            ),
            tab_style(MenuTab::GridSize),
        )),
        Line::from(Span::styled(
            format!("Clock  ◂ {}s ▸", menu_state.selected_timer),
            tab_style(MenuTab::Timer),
        )),
        Line::default(),
        Line::from(Span::styled(start_marker, tab_style(MenuTab::Start))),
        Line::default(),
        Line::from(Span::styled(
            "←/→ change   ↑/↓ select",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(Span::styled(
            "enter start   q quit",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rect);
}
