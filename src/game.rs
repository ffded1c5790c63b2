//! Game state: board, orb placement, chain reactions, timers, win detection.

use crate::GameConfig;
use log::{debug, info};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Total moves required before elimination can end the match.
pub const MIN_MOVES_TO_WIN: u32 = 2;

/// Smallest playable board.
pub const MIN_GRID_SIZE: usize = 2;

/// A board where captures keep re-arming cells can cascade forever; a single
/// cascade stops after this many explosions per board cell.
const CASCADE_EXPLOSION_FACTOR: usize = 64;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// 0-based index for per-player arrays (timers, move counts, names).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// Occupied cell: owning player and orb count (always >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub owner: Player,
    pub count: u32,
}

/// One explosion in replay order: position, owner at the moment it blew, and
/// the orbs it released. Consumed by the renderer for animation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplosionEvent {
    pub row: usize,
    pub col: usize,
    pub owner: Player,
    pub count: u32,
}

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("grid size must be at least {MIN_GRID_SIZE}, got {0}")]
    GridTooSmall(usize),
}

/// Square grid of cells. `cells[row * size + col]`; `None` is an empty cell.
#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Cell>>,
}

impl Board {
    pub fn new(size: usize) -> Result<Self, GameError> {
        if size < MIN_GRID_SIZE {
            return Err(GameError::GridTooSmall(size));
        }
        Ok(Self::empty(size))
    }

    fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    /// Cell at (row, col); `None` when empty or out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells[self.idx(row, col)]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, cell: Option<Cell>) {
        let i = self.idx(row, col);
        self.cells[i] = cell;
    }

    /// Orb count at which the cell at (row, col) explodes: corner 2,
    /// non-corner border 3, interior 4.
    pub fn critical_mass(&self, row: usize, col: usize) -> u32 {
        let last = self.size - 1;
        let row_edge = row == 0 || row == last;
        let col_edge = col == 0 || col == last;
        match (row_edge, col_edge) {
            (true, true) => 2,
            (true, false) | (false, true) => 3,
            (false, false) => 4,
        }
    }

    /// Add one orb for `player` at (row, col). An empty cell becomes theirs
    /// with count 1; an occupied cell is captured for `player` and
    /// incremented. The same rule covers placement and cascade
    /// redistribution. Returns true when the cell is now at or over its
    /// critical mass.
    pub fn place_orb(&mut self, row: usize, col: usize, player: Player) -> bool {
        let i = self.idx(row, col);
        let cell = match self.cells[i] {
            None => Cell {
                owner: player,
                count: 1,
            },
            Some(cell) => Cell {
                owner: player,
                count: cell.count + 1,
            },
        };
        self.cells[i] = Some(cell);
        cell.count >= self.critical_mass(row, col)
    }

    /// Total orbs on the board.
    pub fn total_orbs(&self) -> u32 {
        self.cells.iter().flatten().map(|c| c.count).sum()
    }

    /// Which players currently own at least one cell.
    fn owners_present(&self) -> (bool, bool) {
        let mut present = (false, false);
        for cell in self.cells.iter().flatten() {
            match cell.owner {
                Player::One => present.0 = true,
                Player::Two => present.1 = true,
            }
        }
        present
    }
}

/// Drain the explosion queue to a fixed point, breadth-first: each dequeued
/// cell releases its orbs, one to each orthogonal neighbour, and any
/// neighbour pushed to its critical mass is appended behind everything
/// already queued. Returns the explosion events in replay order.
///
/// A cell is processed at most once while it stays on the board: the marker
/// arena catches stale duplicate queue entries, and a cell re-created by a
/// neighbouring explosion gets a fresh entry.
fn resolve_cascade(board: &mut Board, seed_row: usize, seed_col: usize) -> VecDeque<ExplosionEvent> {
    let size = board.size();
    let max_explosions = size * size * CASCADE_EXPLOSION_FACTOR;
    let mut exploding = vec![false; size * size];
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut events = VecDeque::new();
    queue.push_back((seed_row, seed_col));

    while let Some((row, col)) = queue.pop_front() {
        let cell = match board.get(row, col) {
            Some(c) => c,
            None => continue,
        };
        if exploding[row * size + col] {
            continue;
        }
        exploding[row * size + col] = true;

        events.push_back(ExplosionEvent {
            row,
            col,
            owner: cell.owner,
            count: cell.count,
        });
        board.set(row, col, None);

        for (dr, dc) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
            let nr = row as i32 + dr;
            let nc = col as i32 + dc;
            if nr < 0 || nc < 0 || nr >= size as i32 || nc >= size as i32 {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            let was_empty = board.get(nr, nc).is_none();
            let now_critical = board.place_orb(nr, nc, cell.owner);
            if was_empty {
                exploding[nr * size + nc] = false;
            }
            if now_critical {
                queue.push_back((nr, nc));
            }
        }

        if events.len() >= max_explosions {
            debug!("cascade stopped at cap after {} explosions", events.len());
            break;
        }
    }
    events
}

/// Live match: board, whose turn it is, countdown timers, move counters, and
/// the outcome once decided. Rendering and input live elsewhere; everything
/// here is driven through [`MatchState::submit_move`],
/// [`MatchState::tick_time`] and [`MatchState::drain_events`].
#[derive(Debug)]
pub struct MatchState {
    board: Board,
    player_names: [String; 2],
    current_player: Player,
    move_count: u32,
    player_moves: [u32; 2],
    player_timers: [u32; 2],
    timer_secs: u32,
    last_time_update: Instant,
    outcome: Option<GameOutcome>,
    /// Explosions from the last cascade not yet consumed by the renderer.
    /// The board is already final; this only paces the animation.
    pending_events: VecDeque<ExplosionEvent>,
}

impl MatchState {
    pub fn new(config: &GameConfig) -> Result<Self, GameError> {
        let board = Board::new(config.grid_size)?;
        info!(
            "match start: {} vs {} on {}x{}, {}s each",
            config.player1, config.player2, config.grid_size, config.grid_size, config.timer_secs
        );
        Ok(Self {
            board,
            player_names: [config.player1.clone(), config.player2.clone()],
            current_player: Player::One,
            move_count: 0,
            player_moves: [0, 0],
            player_timers: [config.timer_secs, config.timer_secs],
            timer_secs: config.timer_secs,
            last_time_update: Instant::now(),
            outcome: None,
            pending_events: VecDeque::new(),
        })
    }

    /// Back to a fresh empty board with the same names, size, and timer.
    pub fn reset(&mut self) {
        self.board = Board::empty(self.board.size);
        self.current_player = Player::One;
        self.move_count = 0;
        self.player_moves = [0, 0];
        self.player_timers = [self.timer_secs, self.timer_secs];
        self.last_time_update = Instant::now();
        self.outcome = None;
        self.pending_events.clear();
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.board.size()
    }

    /// Cell at (row, col); `None` when empty or out of bounds.
    #[inline]
    pub fn cell_at(&self, row: usize, col: usize) -> Option<Cell> {
        self.board.get(row, col)
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn player_name(&self, player: Player) -> &str {
        &self.player_names[player.index()]
    }

    /// Seconds left on `player`'s clock.
    pub fn time_remaining(&self, player: Player) -> u32 {
        self.player_timers[player.index()]
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn moves_made(&self, player: Player) -> u32 {
        self.player_moves[player.index()]
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// True while explosion events are still waiting to be replayed. Moves
    /// and the clock are held until the replay is consumed.
    pub fn is_cascading(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// True when the current player may place an orb at (row, col): in
    /// bounds, no replay pending, match live, and the cell empty or already
    /// theirs.
    pub fn is_valid_move(&self, row: usize, col: usize) -> bool {
        if self.outcome.is_some() || self.is_cascading() {
            return false;
        }
        if row >= self.board.size || col >= self.board.size {
            return false;
        }
        match self.board.get(row, col) {
            None => true,
            Some(cell) => cell.owner == self.current_player,
        }
    }

    /// Place an orb for the current player. Returns false when the move is
    /// rejected (out of bounds, opponent's cell, replay pending, match
    /// over). On acceptance the board, outcome, and turn are final when this
    /// returns; any explosions are queued for paced replay.
    pub fn submit_move(&mut self, row: usize, col: usize, now: Instant) -> bool {
        if !self.is_valid_move(row, col) {
            return false;
        }

        self.move_count += 1;
        self.player_moves[self.current_player.index()] += 1;
        let mover = self.current_player;

        if self.board.place_orb(row, col, mover) {
            self.pending_events = resolve_cascade(&mut self.board, row, col);
            debug!(
                "move {} by {}: cascade of {} explosions",
                self.move_count,
                self.player_names[mover.index()],
                self.pending_events.len()
            );
            self.check_winner();
            if self.outcome.is_none() {
                self.switch_player();
            }
        } else {
            self.switch_player();
        }
        self.last_time_update = now;

        if let Some(outcome) = self.outcome {
            info!("match over after {} moves: {:?}", self.move_count, outcome);
        }
        true
    }

    /// Elimination check, skipped until [`MIN_MOVES_TO_WIN`] total moves:
    /// one owner left wins, an emptied board is a draw.
    fn check_winner(&mut self) {
        if self.move_count < MIN_MOVES_TO_WIN {
            return;
        }
        match self.board.owners_present() {
            (true, false) => self.outcome = Some(GameOutcome::Winner(Player::One)),
            (false, true) => self.outcome = Some(GameOutcome::Winner(Player::Two)),
            (false, false) => self.outcome = Some(GameOutcome::Draw),
            (true, true) => {}
        }
    }

    /// Hand the turn over. A player left without a single playable cell
    /// forfeits on the spot: the switch is undone and the mover wins.
    fn switch_player(&mut self) {
        self.current_player = self.current_player.other();
        if !self.has_any_move(self.current_player) {
            self.current_player = self.current_player.other();
            self.outcome = Some(GameOutcome::Winner(self.current_player));
        }
    }

    /// Whether `player` could place somewhere: any empty cell or any cell
    /// they own. Ownership only; the replay and game-over gates apply at
    /// submit time.
    fn has_any_move(&self, player: Player) -> bool {
        self.board
            .cells
            .iter()
            .any(|cell| cell.map_or(true, |c| c.owner == player))
    }

    /// Advance the current player's countdown: one second deducted per
    /// elapsed wall-clock second while the match is live and no replay is
    /// pending. A clock hitting zero ends the match for the other player.
    pub fn tick_time(&mut self, now: Instant) {
        if self.outcome.is_some() || self.is_cascading() {
            return;
        }
        if now.saturating_duration_since(self.last_time_update) < Duration::from_secs(1) {
            return;
        }
        self.last_time_update = now;
        let i = self.current_player.index();
        self.player_timers[i] = self.player_timers[i].saturating_sub(1);
        if self.player_timers[i] == 0 {
            let winner = self.current_player.other();
            self.outcome = Some(GameOutcome::Winner(winner));
            info!(
                "match over: {} out of time",
                self.player_names[self.current_player.index()]
            );
        }
    }

    /// Take up to `max` replay events. The clock baseline restarts when the
    /// replay empties so animation time is billed to nobody.
    pub fn drain_events(&mut self, max: usize, now: Instant) -> Vec<ExplosionEvent> {
        let n = max.min(self.pending_events.len());
        let events: Vec<ExplosionEvent> = self.pending_events.drain(..n).collect();
        if !events.is_empty() && self.pending_events.is_empty() {
            self.last_time_update = now;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(grid_size: usize) -> GameConfig {
        GameConfig {
            player1: "Player 1".into(),
            player2: "Player 2".into(),
            grid_size,
            timer_secs: 60,
        }
    }

    fn state(grid_size: usize) -> MatchState {
        MatchState::new(&config(grid_size)).unwrap()
    }

    fn fill_board(state: &mut MatchState, owner: Player, count: u32) {
        for slot in &mut state.board.cells {
            *slot = Some(Cell { owner, count });
        }
    }

    #[test]
    fn test_critical_mass_table() {
        for n in [3usize, 4, 8] {
            let board = Board::new(n).unwrap();
            let last = n - 1;
            for row in 0..n {
                for col in 0..n {
                    let corner = (row == 0 || row == last) && (col == 0 || col == last);
                    let border = row == 0 || row == last || col == 0 || col == last;
                    let expected = if corner {
                        2
                    } else if border {
                        3
                    } else {
                        4
                    };
                    assert_eq!(
                        board.critical_mass(row, col),
                        expected,
                        "({row},{col}) on {n}x{n}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_place_orb_adds_exactly_one() {
        let mut board = Board::new(8).unwrap();
        assert_eq!(board.total_orbs(), 0);
        board.place_orb(3, 3, Player::One);
        assert_eq!(board.total_orbs(), 1);
        board.place_orb(3, 3, Player::One);
        assert_eq!(board.total_orbs(), 2);
        assert_eq!(
            board.get(3, 3),
            Some(Cell {
                owner: Player::One,
                count: 2
            })
        );
    }

    #[test]
    fn test_place_orb_captures_opponent_cell() {
        let mut board = Board::new(4).unwrap();
        board.place_orb(1, 1, Player::Two);
        board.place_orb(1, 1, Player::One);
        assert_eq!(
            board.get(1, 1),
            Some(Cell {
                owner: Player::One,
                count: 2
            })
        );
    }

    #[test]
    fn test_invalid_moves() {
        let now = Instant::now();
        let mut s = state(3);
        // out of bounds
        assert!(!s.is_valid_move(3, 0));
        assert!(!s.is_valid_move(0, 3));
        assert!(!s.submit_move(9, 9, now));
        // opponent's cell
        assert!(s.submit_move(1, 1, now));
        assert!(!s.is_valid_move(1, 1));
        assert!(!s.submit_move(1, 1, now));
        // own or empty cell is fine again on the next turn
        assert!(s.submit_move(2, 2, now));
        assert!(s.is_valid_move(1, 1));
    }

    #[test]
    fn test_move_rejected_while_replay_pending() {
        let now = Instant::now();
        let mut s = state(3);
        assert!(s.submit_move(0, 0, now)); // p1
        assert!(s.submit_move(2, 2, now)); // p2
        assert!(s.submit_move(0, 0, now)); // p1, corner pops
        assert!(s.is_cascading());
        assert!(!s.is_valid_move(1, 1));
        assert!(!s.submit_move(1, 1, now));
        s.drain_events(usize::MAX, now);
        assert!(!s.is_cascading());
        assert!(s.is_valid_move(1, 1));
    }

    #[test]
    fn test_corner_explosion_scenario() {
        let now = Instant::now();
        let mut s = state(3);

        assert!(s.submit_move(0, 0, now));
        assert_eq!(
            s.cell_at(0, 0),
            Some(Cell {
                owner: Player::One,
                count: 1
            })
        );

        assert!(s.submit_move(2, 2, now)); // p2 elsewhere
        assert!(s.submit_move(0, 0, now)); // second orb reaches corner mass 2

        let events = s.drain_events(usize::MAX, now);
        assert_eq!(
            events,
            vec![ExplosionEvent {
                row: 0,
                col: 0,
                owner: Player::One,
                count: 2
            }]
        );
        assert_eq!(s.cell_at(0, 0), None);
        assert_eq!(
            s.cell_at(0, 1),
            Some(Cell {
                owner: Player::One,
                count: 1
            })
        );
        assert_eq!(
            s.cell_at(1, 0),
            Some(Cell {
                owner: Player::One,
                count: 1
            })
        );
        assert_eq!(
            s.cell_at(2, 2),
            Some(Cell {
                owner: Player::Two,
                count: 1
            })
        );
        assert_eq!(s.current_player(), Player::Two);
        assert!(!s.is_game_over());
    }

    #[test]
    fn test_chain_cascade_captures_and_wins() {
        let now = Instant::now();
        let mut s = state(3);

        assert!(s.submit_move(0, 0, now)); // p1
        assert!(s.submit_move(0, 1, now)); // p2
        assert!(s.submit_move(1, 0, now)); // p1
        assert!(s.submit_move(0, 1, now)); // p2 reinforces to 2
        assert!(s.submit_move(0, 0, now)); // p1: corner pops, chain through (0,1)

        let events = s.drain_events(usize::MAX, now);
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].row, events[0].col), (0, 0));
        assert_eq!((events[1].row, events[1].col), (0, 1));
        assert_eq!(events[1].owner, Player::One); // captured before it blew

        // every surviving cell flipped to the mover
        for row in 0..3 {
            for col in 0..3 {
                if let Some(cell) = s.cell_at(row, col) {
                    assert_eq!(cell.owner, Player::One, "({row},{col})");
                }
            }
        }
        assert_eq!(s.outcome(), Some(GameOutcome::Winner(Player::One)));
        assert!(s.is_game_over());
        // terminal: nothing else is accepted
        assert!(!s.submit_move(2, 0, now));
    }

    #[test]
    fn test_win_needs_min_moves() {
        let mut s = state(3);
        fill_board(&mut s, Player::One, 1);
        s.move_count = 1;
        s.check_winner();
        assert_eq!(s.outcome(), None);

        s.move_count = MIN_MOVES_TO_WIN;
        s.check_winner();
        assert_eq!(s.outcome(), Some(GameOutcome::Winner(Player::One)));
    }

    #[test]
    fn test_draw_on_emptied_board() {
        let mut s = state(3);
        s.move_count = 3;
        s.check_winner();
        assert_eq!(s.outcome(), Some(GameOutcome::Draw));
    }

    #[test]
    fn test_stalemate_forfeits_to_mover() {
        let now = Instant::now();
        let mut s = state(3);
        fill_board(&mut s, Player::One, 1);
        s.move_count = 4;

        // the interior cell stays below critical mass, so no cascade;
        // player 2 is left with no empty and no owned cell
        assert!(s.submit_move(1, 1, now));
        assert_eq!(s.outcome(), Some(GameOutcome::Winner(Player::One)));
        assert_eq!(s.current_player(), Player::One);
    }

    #[test]
    fn test_timeout_awards_other_player() {
        let start = Instant::now();
        let mut s = state(3);
        s.player_timers = [1, 60];
        s.tick_time(start + Duration::from_secs(2));
        assert_eq!(s.time_remaining(Player::One), 0);
        assert_eq!(s.outcome(), Some(GameOutcome::Winner(Player::Two)));
    }

    #[test]
    fn test_clock_held_during_replay() {
        let now = Instant::now();
        let mut s = state(3);
        assert!(s.submit_move(0, 0, now));
        assert!(s.submit_move(2, 2, now));
        assert!(s.submit_move(0, 0, now));
        assert!(s.is_cascading());

        s.tick_time(now + Duration::from_secs(30));
        assert_eq!(s.time_remaining(Player::One), 60);
        assert_eq!(s.time_remaining(Player::Two), 60);

        // baseline restarts when the replay drains
        let drained_at = now + Duration::from_secs(30);
        s.drain_events(usize::MAX, drained_at);
        s.tick_time(drained_at);
        assert_eq!(s.time_remaining(Player::Two), 60);
        s.tick_time(drained_at + Duration::from_secs(1));
        assert_eq!(s.time_remaining(Player::Two), 59);
    }

    #[test]
    fn test_drain_is_bounded_and_board_already_final() {
        let now = Instant::now();
        let mut s = state(3);
        assert!(s.submit_move(0, 0, now));
        assert!(s.submit_move(0, 1, now));
        assert!(s.submit_move(1, 0, now));
        assert!(s.submit_move(0, 1, now));
        assert!(s.submit_move(0, 0, now)); // two-explosion chain

        let snapshot: Vec<Option<Cell>> = s.board.cells.clone();
        let first = s.drain_events(1, now);
        assert_eq!(first.len(), 1);
        assert!(s.is_cascading());
        assert_eq!(s.board.cells, snapshot);

        let rest = s.drain_events(10, now);
        assert_eq!(rest.len(), 1);
        assert!(!s.is_cascading());
        assert_eq!(s.board.cells, snapshot);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let now = Instant::now();
        let mut s = state(4);
        assert!(s.submit_move(1, 2, now));
        let a = s.cell_at(1, 2);
        let b = s.cell_at(1, 2);
        assert_eq!(a, b);
        assert_eq!(s.current_player(), s.current_player());
    }

    #[test]
    fn test_reset_restores_fresh_match() {
        let now = Instant::now();
        let mut s = state(3);
        assert!(s.submit_move(0, 0, now));
        assert!(s.submit_move(2, 2, now));
        assert!(s.submit_move(0, 0, now));
        s.player_timers = [5, 9];

        s.reset();
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.moves_made(Player::One), 0);
        assert_eq!(s.current_player(), Player::One);
        assert_eq!(s.outcome(), None);
        assert!(!s.is_cascading());
        assert_eq!(s.time_remaining(Player::One), 60);
        assert_eq!(s.time_remaining(Player::Two), 60);
        for row in 0..3 {
            for col in 0..3 {
                assert_eq!(s.cell_at(row, col), None);
            }
        }
        assert!(s.submit_move(1, 1, now));
    }

    #[test]
    fn test_degenerate_grid_is_a_construction_error() {
        assert!(matches!(
            MatchState::new(&config(0)),
            Err(GameError::GridTooSmall(0))
        ));
        assert!(matches!(
            MatchState::new(&config(1)),
            Err(GameError::GridTooSmall(1))
        ));
        assert!(MatchState::new(&config(2)).is_ok());
    }
}

#[cfg(test)]
mod prop_tests {
    //! Property tests for cascade resolution on random legal boards.

    use super::*;
    use proptest::prelude::*;

    /// Board with every cell below critical mass except one seeded at
    /// exactly its critical mass.
    fn seeded_board(size: usize, fills: &[(bool, bool, u8)], seed: usize) -> Board {
        let mut board = Board::new(size).unwrap();
        let cells = size * size;
        for i in 0..cells {
            let (row, col) = (i / size, i % size);
            let (occupied, second, count) = fills[i % fills.len()];
            if !occupied {
                continue;
            }
            let owner = if second { Player::Two } else { Player::One };
            let crit = board.critical_mass(row, col);
            let count = 1 + u32::from(count) % (crit - 1);
            board.cells[i] = Some(Cell { owner, count });
        }
        let seed = seed % cells;
        let (row, col) = (seed / size, seed % size);
        let owner = board.cells[seed].map_or(Player::One, |c| c.owner);
        board.cells[seed] = Some(Cell {
            owner,
            count: board.critical_mass(row, col),
        });
        board
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        /// Cascades terminate within the explosion cap and leave the board
        /// settled: positive counts everywhere, and no resting cell at or
        /// over its critical mass unless the cap fired.
        #[test]
        fn prop_cascade_terminates_and_settles(
            size in 3usize..=12,
            seed in 0usize..144,
            fills in proptest::collection::vec((any::<bool>(), any::<bool>(), any::<u8>()), 144),
        ) {
            let mut board = seeded_board(size, &fills, seed);
            let cells = size * size;
            let (seed_row, seed_col) = ((seed % cells) / size, (seed % cells) % size);

            let events = resolve_cascade(&mut board, seed_row, seed_col);

            prop_assert!(!events.is_empty());
            prop_assert!(events.len() <= cells * CASCADE_EXPLOSION_FACTOR);
            let capped = events.len() == cells * CASCADE_EXPLOSION_FACTOR;
            for row in 0..size {
                for col in 0..size {
                    if let Some(cell) = board.get(row, col) {
                        prop_assert!(cell.count >= 1);
                        if !capped {
                            prop_assert!(
                                cell.count < board.critical_mass(row, col),
                                "unsettled cell at ({}, {})", row, col
                            );
                        }
                    }
                }
            }
        }

        /// A full random match never panics and every accepted move leaves
        /// the board settled once its replay is drained.
        #[test]
        fn prop_random_play_stays_consistent(
            size in 3usize..=8,
            moves in proptest::collection::vec((0usize..8, 0usize..8), 1..200),
        ) {
            let now = Instant::now();
            let mut s = MatchState::new(&GameConfig {
                player1: "a".into(),
                player2: "b".into(),
                grid_size: size,
                timer_secs: 60,
            }).unwrap();

            for (row, col) in moves {
                if s.submit_move(row, col, now) {
                    s.drain_events(usize::MAX, now);
                }
                if s.is_game_over() {
                    prop_assert!(s.outcome().is_some());
                    break;
                }
                for r in 0..size {
                    for c in 0..size {
                        if let Some(cell) = s.cell_at(r, c) {
                            prop_assert!(cell.count >= 1);
                            prop_assert!(cell.count < s.board.critical_mass(r, c));
                        }
                    }
                }
            }
        }
    }
}
