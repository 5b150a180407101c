//! Layout and drawing: candy board, stats sidebar, score history.

use crate::game::{Outcome, Snapshot};
use crate::history::HistoryEntry;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};

pub const SIDEBAR_WIDTH: u16 = 32;

/// Candidate cell sizes (columns, rows), largest first. Terminal cells are about twice as tall
/// as wide, so 2:1 keeps candies square.
const CELL_SIZES: [(u16, u16); 3] = [(6, 3), (4, 2), (2, 1)];

/// Brightness factor for the board once the game is over.
const OVER_DIM: f32 = 0.45;

/// Where everything goes for a given terminal area and grid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    /// Board including its border.
    pub board: Rect,
    /// Candy area inside the border.
    pub cells: Rect,
    pub cell_w: u16,
    pub cell_h: u16,
    pub grid_size: usize,
    pub sidebar: Rect,
}

/// Biggest cell size that fits, board centred, sidebar to its right. Used for both drawing and
/// mouse hit-testing, so the two always agree.
pub fn board_layout(area: Rect, grid_size: usize) -> BoardLayout {
    let n = grid_size as u16;
    let (cell_w, cell_h) = CELL_SIZES
        .iter()
        .copied()
        .find(|&(w, h)| n * w + 2 + SIDEBAR_WIDTH <= area.width && n * h + 2 <= area.height)
        .unwrap_or(CELL_SIZES[CELL_SIZES.len() - 1]);
    let board_w = n * cell_w + 2;
    let board_h = n * cell_h + 2;
    let total_w = board_w + SIDEBAR_WIDTH;

    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(board_h) / 2;
    let board = Rect {
        x,
        y,
        width: board_w.min(area.width),
        height: board_h.min(area.height),
    };
    let cells = Rect {
        x: board.x + 1,
        y: board.y + 1,
        width: (n * cell_w).min(board.width.saturating_sub(2)),
        height: (n * cell_h).min(board.height.saturating_sub(2)),
    };
    let sidebar_x = board.x + board.width;
    let sidebar = Rect {
        x: sidebar_x,
        y: area.y,
        width: SIDEBAR_WIDTH.min((area.x + area.width).saturating_sub(sidebar_x)),
        height: area.height,
    };
    BoardLayout {
        board,
        cells,
        cell_w,
        cell_h,
        grid_size,
        sidebar,
    }
}

/// Grid (row, col) under terminal position (column, row), if any.
pub fn cell_at(layout: &BoardLayout, column: u16, row: u16) -> Option<(usize, usize)> {
    let c = layout.cells;
    if column < c.x || row < c.y || column >= c.x + c.width || row >= c.y + c.height {
        return None;
    }
    let r = ((row - c.y) / layout.cell_h) as usize;
    let col = ((column - c.x) / layout.cell_w) as usize;
    (r < layout.grid_size && col < layout.grid_size).then_some((r, col))
}

/// Scale an RGB colour towards black.
fn dim(color: Color, factor: f32) -> Color {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Red => (255, 0, 0),
        Color::Green => (0, 255, 0),
        Color::Yellow => (255, 255, 0),
        Color::Blue => (0, 0, 255),
        Color::Magenta => (255, 0, 255),
        Color::White => (255, 255, 255),
        _ => (128, 128, 128),
    };
    Color::Rgb(
        (r as f32 * factor).min(255.0) as u8,
        (g as f32 * factor).min(255.0) as u8,
        (b as f32 * factor).min(255.0) as u8,
    )
}

/// Draw the whole screen from a snapshot. `notice` is a one-line message (e.g. a failed save).
pub fn draw(
    frame: &mut Frame,
    snapshot: &Snapshot,
    theme: &Theme,
    cursor: (usize, usize),
    history: &[HistoryEntry],
    notice: Option<&str>,
) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let layout = board_layout(area, snapshot.candies.len());
    draw_board(frame, snapshot, theme, cursor, &layout);
    draw_sidebar(frame, snapshot, theme, history, notice, layout.sidebar);
}

fn draw_board(
    frame: &mut Frame,
    snapshot: &Snapshot,
    theme: &Theme,
    cursor: (usize, usize),
    layout: &BoardLayout,
) {
    let border = if snapshot.over {
        theme.inactive_fg
    } else {
        theme.div_line
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border).bg(theme.bg))
        .title(Span::styled(" Candyburst ", Style::default().fg(theme.title)));
    block.render(layout.board, frame.buffer_mut());

    let cells = layout.cells;
    // Leave a one-column gutter between candies when there is room for it.
    let fill_w = if layout.cell_w > 2 {
        layout.cell_w - 1
    } else {
        layout.cell_w
    };
    let buf = frame.buffer_mut();
    for (r, row) in snapshot.candies.iter().enumerate() {
        for (c, &candy) in row.iter().enumerate() {
            let mut color = theme.candy_color(candy);
            if snapshot.over {
                color = dim(color, OVER_DIM);
            }
            let is_cursor = !snapshot.over && (r, c) == cursor;
            let x0 = cells.x + c as u16 * layout.cell_w;
            let y0 = cells.y + r as u16 * layout.cell_h;
            for dy in 0..layout.cell_h {
                for dx in 0..fill_w {
                    let (x, y) = (x0 + dx, y0 + dy);
                    if x >= cells.x + cells.width || y >= cells.y + cells.height {
                        continue;
                    }
                    let style = if is_cursor {
                        Style::default().fg(theme.main_fg).bg(color)
                    } else {
                        Style::default().fg(color).bg(color)
                    };
                    let symbol = if is_cursor { "▒" } else { " " };
                    buf[(x, y)].set_symbol(symbol).set_style(style);
                }
            }
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    snapshot: &Snapshot,
    theme: &Theme,
    history: &[HistoryEntry],
    notice: Option<&str>,
    area: Rect,
) {
    if area.width < 4 {
        return;
    }
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats (border + 8 lines)
            Constraint::Min(3),     // History
            Constraint::Length(3),  // Help / notice
        ])
        .split(area);

    // --- Stats ---
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let mut stats_lines = vec![
        stat(
            "Moves Left:   ",
            format!("{} / {}", snapshot.moves_left, snapshot.max_moves),
        ),
        stat("Target:       ", snapshot.win_score.to_string()),
        stat("Score:        ", snapshot.score.to_string()),
        stat("Games Played: ", snapshot.stats.played.to_string()),
        stat("Games Won:    ", snapshot.stats.won.to_string()),
        stat("Games Lost:   ", snapshot.stats.lost.to_string()),
        Line::from(""),
    ];
    stats_lines.push(match snapshot.outcome {
        Some(Outcome::Won) => Line::from(Span::styled(
            " You won! ",
            Style::default().fg(Color::Black).bg(theme.won).bold(),
        )),
        Some(Outcome::Lost) => Line::from(Span::styled(
            " You lost! ",
            Style::default().fg(Color::White).bg(theme.lost).bold(),
        )),
        None => Line::from(""),
    });
    Paragraph::new(Text::from(stats_lines))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Stats ", title_style)),
        )
        .render(chunks[0], frame.buffer_mut());

    // --- History, most recent first ---
    let history_lines: Vec<Line> = if history.is_empty() {
        vec![Line::from(Span::styled(
            "No score history",
            Style::default().fg(theme.inactive_fg),
        ))]
    } else {
        history
            .iter()
            .rev()
            .map(|e| {
                let color = match e.outcome {
                    Outcome::Won => theme.won,
                    Outcome::Lost => theme.lost,
                };
                Line::from(Span::styled(e.to_string(), Style::default().fg(color)))
            })
            .collect()
    };
    Paragraph::new(Text::from(history_lines))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Score History ", title_style)),
        )
        .render(chunks[1], frame.buffer_mut());

    // --- Help or notice ---
    let footer = match notice {
        Some(msg) => Line::from(Span::styled(msg.to_string(), Style::default().fg(theme.lost))),
        None if snapshot.over => Line::from(Span::styled(" R: new game  Q: quit ", fg_style)),
        None => Line::from(Span::styled(
            " Click: burst  R: new  Q: quit ",
            Style::default().fg(theme.inactive_fg),
        )),
    };
    Paragraph::new(footer)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .render(chunks[2], frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Candy, Stats};
    use chrono::{TimeZone, Utc};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn snapshot(over: bool, outcome: Option<Outcome>) -> Snapshot {
        Snapshot {
            candies: vec![vec![Candy::Red; 10]; 10],
            moves_left: 19,
            max_moves: 20,
            score: 3,
            win_score: 50,
            over,
            outcome,
            stats: Stats::default(),
        }
    }

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf[(x, y)].symbol());
            }
            s.push('\n');
        }
        s
    }

    fn render(snap: &Snapshot, history: &[HistoryEntry], notice: Option<&str>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| draw(f, snap, &Theme::default(), (0, 0), history, notice))
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn test_layout_picks_largest_cell_that_fits() {
        let big = board_layout(Rect::new(0, 0, 120, 40), 10);
        assert_eq!((big.cell_w, big.cell_h), (6, 3));
        let mid = board_layout(Rect::new(0, 0, 80, 24), 10);
        assert_eq!((mid.cell_w, mid.cell_h), (4, 2));
        let small = board_layout(Rect::new(0, 0, 60, 14), 10);
        assert_eq!((small.cell_w, small.cell_h), (2, 1));
    }

    #[test]
    fn test_layout_sidebar_right_of_board() {
        let l = board_layout(Rect::new(0, 0, 80, 24), 10);
        assert_eq!(l.board.width, 42);
        assert_eq!(l.sidebar.x, l.board.x + l.board.width);
        assert!(l.sidebar.x + l.sidebar.width <= 80);
    }

    #[test]
    fn test_cell_at_maps_terminal_positions() {
        let l = board_layout(Rect::new(0, 0, 80, 24), 10);
        let c = l.cells;
        assert_eq!(cell_at(&l, c.x, c.y), Some((0, 0)));
        assert_eq!(cell_at(&l, c.x + 4 * 3 + 1, c.y + 2 * 5 + 1), Some((5, 3)));
        assert_eq!(cell_at(&l, c.x + c.width - 1, c.y + c.height - 1), Some((9, 9)));
        // Border and outside.
        assert_eq!(cell_at(&l, l.board.x, l.board.y), None);
        assert_eq!(cell_at(&l, c.x + c.width, c.y), None);
    }

    #[test]
    fn test_dim_scales_rgb() {
        assert_eq!(dim(Color::Rgb(200, 100, 0), 0.5), Color::Rgb(100, 50, 0));
    }

    #[test]
    fn test_draw_shows_stats_and_empty_history() {
        let text = render(&snapshot(false, None), &[], None);
        assert!(text.contains("Moves Left:   19 / 20"));
        assert!(text.contains("Score:        3"));
        assert!(text.contains("No score history"));
        assert!(!text.contains("You won!"));
    }

    #[test]
    fn test_draw_over_banner_and_history() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let history = [HistoryEntry::new(52, Outcome::Won, ts)];
        let text = render(&snapshot(true, Some(Outcome::Lost)), &history, None);
        assert!(text.contains("You lost!"));
        assert!(text.contains("Won - Score: 52"));
        assert!(text.contains("R: new game"));
    }

    #[test]
    fn test_draw_notice_replaces_help() {
        let text = render(&snapshot(false, None), &[], Some("History not saved"));
        assert!(text.contains("History not saved"));
        assert!(!text.contains("Click: burst"));
    }
}
