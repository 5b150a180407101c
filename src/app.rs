//! App: terminal init, main loop, click and key handling.

use crate::GameConfig;
use crate::game::{ClickOutcome, Session};
use crate::history::HistoryStore;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, BoardLayout};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;

pub struct App {
    theme: Theme,
    session: Session,
    history: HistoryStore,
    rng: StdRng,
    /// Keyboard cursor (row, col).
    cursor: (usize, usize),
    /// Shown in place of the help line until the next successful action.
    notice: Option<String>,
    /// Layout of the last drawn frame, for mouse hit-testing.
    layout: Option<BoardLayout>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, history: HistoryStore, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let session = Session::new(config, &mut rng);
        let mid = session.grid.size() / 2;
        Self {
            theme,
            session,
            history,
            rng,
            cursor: (mid, mid),
            notice: None,
            layout: None,
        }
    }

    /// Click (row, col): burst if the connected group is big enough, otherwise nothing.
    fn click(&mut self, row: usize, col: usize) {
        let (next, outcome) = self.session.clone().click(row, col, &mut self.rng);
        self.session = next;
        match outcome {
            ClickOutcome::Burst { .. } => self.notice = None,
            ClickOutcome::Ignored(reason) => {
                log::trace!("({}, {}) click ignored: {:?}", row, col, reason);
            }
        }
    }

    /// New game. The finished one goes to the history file.
    fn reset(&mut self) {
        let (next, entry) = self.session.clone().reset(&mut self.rng);
        self.session = next;
        match self.history.append(entry) {
            Ok(()) => self.notice = None,
            Err(err) => {
                log::error!("Could not save game to history: {}", err);
                self.notice = Some(format!("History not saved: {}", err));
            }
        }
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let max = self.session.grid.size() - 1;
        let (r, c) = self.cursor;
        self.cursor = (
            r.saturating_add_signed(d_row).min(max),
            c.saturating_add_signed(d_col).min(max),
        );
    }

    /// Apply one key action. Returns false when the app should quit.
    fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => {
                if !self.session.is_over() && self.session.score > 0 {
                    log::info!("Quit mid-game with score {}; not recorded", self.session.score);
                }
                return false;
            }
            Action::Up => self.move_cursor(-1, 0),
            Action::Down => self.move_cursor(1, 0),
            Action::Left => self.move_cursor(0, -1),
            Action::Right => self.move_cursor(0, 1),
            Action::Burst => {
                let (r, c) = self.cursor;
                self.click(r, c);
            }
            Action::Reset => self.reset(),
            Action::None => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(layout) = self.layout else {
            return;
        };
        if let Some((r, c)) = ui::cell_at(&layout, mouse.column, mouse.row) {
            log::trace!("({}, {}) mouse down -> cell ({}, {})", mouse.column, mouse.row, r, c);
            self.cursor = (r, c);
            self.click(r, c);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        log::info!("Exited");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let snapshot = self.session.snapshot();
            let completed = terminal.draw(|f| {
                ui::draw(
                    f,
                    &snapshot,
                    &self.theme,
                    self.cursor,
                    self.history.entries(),
                    self.notice.as_deref(),
                )
            })?;
            self.layout = Some(ui::board_layout(completed.area, snapshot.candies.len()));

            // Block until the next input; nothing happens between events.
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !self.apply_action(key_to_action(key)) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Status;
    use crossterm::event::KeyModifiers;
    use ratatui::layout::Rect;
    use std::path::PathBuf;

    fn temp_history(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "candyburst-app-test-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("history.json")
    }

    fn app(name: &str) -> App {
        let history = HistoryStore::open(temp_history(name));
        App::new(GameConfig::default(), Theme::default(), history, 42)
    }

    #[test]
    fn test_same_seed_same_board() {
        assert_eq!(app("seed-a").session.grid, app("seed-b").session.grid);
    }

    #[test]
    fn test_cursor_starts_centered_and_clamps() {
        let mut a = app("cursor");
        assert_eq!(a.cursor, (5, 5));
        for _ in 0..20 {
            a.apply_action(Action::Up);
            a.apply_action(Action::Right);
        }
        assert_eq!(a.cursor, (0, 9));
        a.apply_action(Action::Left);
        a.apply_action(Action::Down);
        assert_eq!(a.cursor, (1, 8));
    }

    #[test]
    fn test_quit_stops_loop() {
        let mut a = app("quit");
        assert!(!a.apply_action(Action::Quit));
        assert!(a.apply_action(Action::None));
    }

    #[test]
    fn test_each_reset_appends_one_entry() {
        let mut a = app("reset");
        a.session.score = 51;
        a.session.status = Status::Over;
        a.apply_action(Action::Reset);
        assert_eq!(a.history.entries().len(), 1);
        a.apply_action(Action::Reset);
        assert_eq!(a.history.entries().len(), 2);

        let reopened = HistoryStore::open(a.history.path().to_path_buf());
        assert_eq!(reopened.entries(), a.history.entries());
        assert_eq!(a.session.stats.played, 2);
        assert_eq!(a.session.stats.won, 1);
        assert!(a.notice.is_none());
    }

    #[test]
    fn test_mouse_click_outside_board_is_ignored() {
        let mut a = app("mouse-outside");
        a.layout = Some(ui::board_layout(Rect::new(0, 0, 80, 24), 10));
        let before = a.session.clone();
        a.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(a.session, before);
    }

    #[test]
    fn test_mouse_click_moves_cursor_and_clicks() {
        let mut a = app("mouse-click");
        let layout = ui::board_layout(Rect::new(0, 0, 80, 24), 10);
        a.layout = Some(layout);
        let (row, col) = (2, 7);
        let expected = a.session.clone().click(row, col, &mut a.rng.clone()).0;

        a.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: layout.cells.x + col as u16 * layout.cell_w,
            row: layout.cells.y + row as u16 * layout.cell_h,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(a.cursor, (row, col));
        assert_eq!(a.session, expected);
    }

    #[test]
    fn test_right_button_does_nothing() {
        let mut a = app("mouse-right");
        let layout = ui::board_layout(Rect::new(0, 0, 80, 24), 10);
        a.layout = Some(layout);
        let cursor = a.cursor;
        a.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Right),
            column: layout.cells.x,
            row: layout.cells.y,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(a.cursor, cursor);
    }
}
