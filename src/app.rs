//! App: terminal init, main loop, tick and key handling.

use crate::game::{ExplosionEvent, MatchState};
use crate::input::{key_to_action, Action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::debug;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Delay before cursor movement starts repeating when a key is held.
const REPEAT_DELAY_MS: u64 = 170;
/// Time between repeated cursor moves while a key is held.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Explosion events replayed per cascade tick. Pacing only; the board is
/// final before the first event is shown.
const EXPLOSIONS_PER_TICK: usize = 3;

/// Board sizes offered on the start menu.
const GRID_CHOICES: [u16; 5] = [4, 6, 8, 10, 12];
/// Per-player clock choices (seconds) offered on the start menu.
const TIMER_CHOICES: [u32; 5] = [30, 60, 90, 120, 180];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    GridSize,
    Timer,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_grid: u16,
    pub selected_timer: u32,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::GridSize,
            selected_grid: 8,
            selected_timer: 60,
            animation_start: Instant::now(),
        }
    }
}

fn cycle<T: Copy + PartialEq>(choices: &[T], current: T, forward: bool) -> T {
    let i = choices.iter().position(|&c| c == current).unwrap_or(0);
    let n = choices.len();
    let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
    choices[next]
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: MatchState,
    screen: Screen,
    paused: bool,
    /// Board cell under the keyboard cursor.
    cursor: (usize, usize),
    last_cascade_tick: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Events replayed on the most recent cascade tick; drives the flash.
    flash_events: Vec<ExplosionEvent>,
    /// TachyonFX flash on freshly exploded cells (created when a replay
    /// batch lands).
    explosion_effect: Option<Effect>,
    /// Last time we processed the explosion effect (for delta).
    explosion_effect_process_time: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let state = MatchState::new(&config)?;
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let size = state.size();
        let menu_state = MenuState {
            selected_grid: args.grid_size,
            selected_timer: args.timer,
            ..MenuState::default()
        };
        let now = Instant::now();
        Ok(Self {
            args,
            config,
            theme,
            state,
            screen,
            paused: false,
            cursor: (size / 2, size / 2),
            last_cascade_tick: now,
            repeat_state: None,
            last_repeat_fire: None,
            flash_events: Vec::new(),
            explosion_effect: None,
            explosion_effect_process_time: None,
            menu_state,
            quit_selected: QuitOption::Resume,
        })
    }

    /// Start a fresh match with the current config.
    fn reset_game(&mut self) -> Result<()> {
        if self.config.grid_size == self.state.size() {
            self.state.reset();
        } else {
            self.state = MatchState::new(&self.config)?;
        }
        self.screen = Screen::Playing;
        self.paused = false;
        self.cursor = (self.state.size() / 2, self.state.size() / 2);
        self.last_cascade_tick = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.flash_events.clear();
        self.explosion_effect = None;
        self.explosion_effect_process_time = None;
        Ok(())
    }

    /// Apply the menu selections (board size clamped to the terminal) and
    /// start.
    fn start_from_menu(&mut self) -> Result<()> {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let fit = crate::ui::max_grid_for_terminal(cols, rows);
        self.config.grid_size = (self.menu_state.selected_grid as usize).min(fit).max(2);
        self.config.timer_secs = self.menu_state.selected_timer;
        self.reset_game()
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        let size = self.state.size();
        match action {
            Action::CursorUp => self.cursor.0 = self.cursor.0.saturating_sub(1),
            Action::CursorDown => self.cursor.0 = (self.cursor.0 + 1).min(size - 1),
            Action::CursorLeft => self.cursor.1 = self.cursor.1.saturating_sub(1),
            Action::CursorRight => self.cursor.1 = (self.cursor.1 + 1).min(size - 1),
            Action::Place => {
                if !self.state.submit_move(self.cursor.0, self.cursor.1, now) {
                    debug!("rejected move at {:?}", self.cursor);
                }
            }
            _ => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(
            action,
            Action::CursorUp | Action::CursorDown | Action::CursorLeft | Action::CursorRight
        ) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next =
            self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action, now);
            self.last_repeat_fire = Some(now);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, size, EnterAlternateScreen, LeaveAlternateScreen},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Clamp the requested board to what fits next to the sidebar.
        let (term_cols, term_rows) = size()?;
        let fit = crate::ui::max_grid_for_terminal(term_cols, term_rows);
        let requested = self.args.grid_size as usize;
        let effective = requested.min(fit).max(2);
        if effective != self.state.size() {
            self.config.grid_size = effective;
            self.state = MatchState::new(&self.config)?;
            self.cursor = (effective / 2, effective / 2);
        }

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                let area = f.area();
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    self.cursor,
                    &mut self.menu_state,
                    if self.screen == Screen::QuitMenu {
                        Some(self.quit_selected)
                    } else {
                        None
                    },
                    now,
                    &self.flash_events,
                    &mut self.explosion_effect,
                    &mut self.explosion_effect_process_time,
                    area,
                );
            })?;

            if self.explosion_effect.as_ref().is_some_and(|e| e.done()) {
                self.explosion_effect = None;
                self.explosion_effect_process_time = None;
                self.flash_events.clear();
            }

            let cascade_interval = Duration::from_secs_f64(1.0 / self.args.cascade_rate.max(1.0));

            // Limit event polling to ~60 FPS rendering (16ms)
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats and only process first Press.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        match self.screen {
                            Screen::Menu => match action {
                                Action::Quit => return Ok(()),
                                Action::CursorLeft | Action::CursorRight => {
                                    let forward = action == Action::CursorRight;
                                    match self.menu_state.current_tab {
                                        MenuTab::GridSize => {
                                            self.menu_state.selected_grid = cycle(
                                                &GRID_CHOICES,
                                                self.menu_state.selected_grid,
                                                forward,
                                            );
                                        }
                                        MenuTab::Timer => {
                                            self.menu_state.selected_timer = cycle(
                                                &TIMER_CHOICES,
                                                self.menu_state.selected_timer,
                                                forward,
                                            );
                                        }
                                        MenuTab::Start => {}
                                    }
                                }
                                Action::CursorDown => {
                                    self.menu_state.current_tab = match self.menu_state.current_tab
                                    {
                                        MenuTab::GridSize => MenuTab::Timer,
                                        MenuTab::Timer => MenuTab::Start,
                                        MenuTab::Start => MenuTab::GridSize,
                                    };
                                }
                                Action::CursorUp => {
                                    self.menu_state.current_tab = match self.menu_state.current_tab
                                    {
                                        MenuTab::GridSize => MenuTab::Start,
                                        MenuTab::Timer => MenuTab::GridSize,
                                        MenuTab::Start => MenuTab::Timer,
                                    };
                                }
                                Action::Place => {
                                    if self.menu_state.current_tab == MenuTab::Start {
                                        self.start_from_menu()?;
                                    } else {
                                        self.menu_state.current_tab = MenuTab::Start;
                                    }
                                }
                                _ => {}
                            },
                            Screen::Playing => {
                                if self.paused {
                                    if action == Action::Pause {
                                        self.paused = false;
                                    } else if action == Action::Quit {
                                        self.screen = Screen::QuitMenu;
                                        self.quit_selected = QuitOption::Resume;
                                    }
                                } else if action == Action::Pause {
                                    self.paused = true;
                                } else if action == Action::Quit {
                                    self.screen = Screen::QuitMenu;
                                    self.quit_selected = QuitOption::Resume;
                                } else {
                                    self.apply_action(action, Instant::now());
                                    let repeatable = matches!(
                                        action,
                                        Action::CursorUp
                                            | Action::CursorDown
                                            | Action::CursorLeft
                                            | Action::CursorRight
                                    );
                                    if repeatable {
                                        self.repeat_state = Some((action, Instant::now()));
                                        self.last_repeat_fire = None;
                                    }
                                }
                            }
                            Screen::QuitMenu => match action {
                                Action::CursorDown | Action::CursorRight => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::MainMenu,
                                        QuitOption::MainMenu => QuitOption::Exit,
                                        QuitOption::Exit => QuitOption::Resume,
                                    };
                                }
                                Action::CursorUp | Action::CursorLeft => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Exit,
                                        QuitOption::MainMenu => QuitOption::Resume,
                                        QuitOption::Exit => QuitOption::MainMenu,
                                    };
                                }
                                Action::Place => match self.quit_selected {
                                    QuitOption::Resume => self.screen = Screen::Playing,
                                    QuitOption::MainMenu => self.screen = Screen::Menu,
                                    QuitOption::Exit => return Ok(()),
                                },
                                Action::Pause | Action::Quit => {
                                    self.screen = Screen::Playing;
                                }
                                _ => {}
                            },
                            Screen::GameOver => match action {
                                Action::Quit => return Ok(()),
                                Action::Restart | Action::Place => self.reset_game()?,
                                _ => {}
                            },
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                self.state.tick_time(Instant::now());

                // Replay pending explosions a few at a time; instantly when
                // animation is off.
                if self.state.is_cascading() {
                    if self.args.no_animation {
                        self.state.drain_events(usize::MAX, Instant::now());
                        self.flash_events.clear();
                        self.explosion_effect = None;
                    } else if self.last_cascade_tick.elapsed() >= cascade_interval {
                        self.last_cascade_tick = Instant::now();
                        let batch = self.state.drain_events(EXPLOSIONS_PER_TICK, Instant::now());
                        if !batch.is_empty() {
                            self.flash_events = batch;
                            self.explosion_effect = None;
                            self.explosion_effect_process_time = None;
                        }
                    }
                }

                // The overlay waits for the replay so the last explosion is
                // seen before the verdict.
                if self.state.is_game_over() && !self.state.is_cascading() {
                    self.screen = Screen::GameOver;
                }
            }
        }
    }
}
