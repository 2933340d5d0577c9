//! Layout and drawing: playfield, sidebar, pause and game-over overlays.

use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use sandblast::block::Block as FallingBlock;
use sandblast::turn::TurnFrame;
use sandblast::{Cell, ParticleGrid, Session, Tag};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tachyonfx::{CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count};

const SIDEBAR_WIDTH: u16 = 24;

/// Next preview cell size in terminal cells.
const NEXT_MINI_CELL_W: u16 = 2;
const NEXT_MINI_CELL_H: u16 = 1;

/// What the app wants on screen this frame.
pub struct View<'a> {
    pub session: &'a Session,
    pub theme: &'a Theme,
    /// Turn frame being shown, if a turn is running.
    pub turn_frame: Option<&'a TurnFrame>,
    pub paused: bool,
    pub restored: bool,
    pub game_over: bool,
    pub banner: Option<&'a str>,
}

/// Terminal size (cols, rows) of the bordered playfield: two particle rows per terminal row.
fn playfield_size(grid: &ParticleGrid) -> (u16, u16) {
    (grid.width() as u16 + 2, grid.height().div_ceil(2) as u16 + 2)
}

pub fn draw(frame: &mut Frame, view: &View, flash: &mut Option<Effect>, flash_time: &mut Option<Instant>, now: Instant) {
    let area = frame.area();
    let board = draw_game(frame, view, area);
    if let Some(turn_frame) = view.turn_frame.filter(|f| !f.highlighted().is_empty()) {
        apply_flash_effect(frame, view, board, turn_frame.highlighted(), flash, flash_time, now);
    }
    if view.game_over {
        draw_game_over(frame, view, area);
    } else if view.paused {
        draw_pause_overlay(frame, view, area);
    }
}

/// Playfield plus sidebar, centred. Returns the board rect (inside the border).
fn draw_game(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let grid = shown_grid(view);
    let (pw, ph) = playfield_size(grid);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(ph), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board = draw_playfield(frame, view, grid, inner[0]);
    draw_sidebar(frame, view, inner[1]);
    board
}

fn shown_grid<'a>(view: &View<'a>) -> &'a ParticleGrid {
    view.turn_frame.map_or_else(|| view.session.grid(), TurnFrame::grid)
}

fn draw_playfield(frame: &mut Frame, view: &View, grid: &ParticleGrid, area: Rect) -> Rect {
    let theme = view.theme;
    let config = view.session.config();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Sandblast ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let (gw, gh) = (grid.width(), grid.height());
    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: (gw as u16).min(inner.width),
        height: (gh.div_ceil(2) as u16).min(inner.height),
    };

    let falling = falling_particles(view.session.current(), config.particle_scale, gw, gh);
    let danger_rows = config.danger_zone_rows * config.particle_scale;

    let colour_at = |row: usize, col: usize| -> Color {
        if row >= gh {
            return theme.bg;
        }
        let cell = falling.get(&(row, col)).copied().unwrap_or(grid[(row, col)]);
        match cell {
            Cell::Sand(i) => grain(theme.sand_color(i), row, col),
            Cell::Bomb => grain(theme.bomb, row, col),
            Cell::Empty if row < danger_rows => theme.danger,
            Cell::Empty => theme.bg,
        }
    };

    let buf = frame.buffer_mut();
    for y in (0..gh).step_by(2) {
        let ry = board.y + (y / 2) as u16;
        if ry >= board.y + board.height {
            break;
        }
        for x in 0..gw.min(board.width as usize) {
            let style = Style::default().fg(colour_at(y, x)).bg(colour_at(y + 1, x));
            buf[(board.x + x as u16, ry)].set_symbol("▀").set_style(style);
        }
    }
    board
}

/// Particles covered by the falling block, clipped to the grid.
fn falling_particles(block: Option<&FallingBlock>, scale: usize, w: usize, h: usize) -> HashMap<(usize, usize), Cell> {
    let Some(block) = block else {
        return HashMap::new();
    };
    let cell = Cell::from(block.tag);
    block
        .particle_cells(scale)
        .filter(|&(r, c)| r >= 0 && c >= 0 && (r as usize) < h && (c as usize) < w)
        .map(|(r, c)| ((r as usize, c as usize), cell))
        .collect()
}

/// Slight per-particle brightness jitter so sand reads as grains.
fn grain(color: Color, row: usize, col: usize) -> Color {
    let Color::Rgb(r, g, b) = color else {
        return color;
    };
    let jitter = (row.wrapping_mul(31) ^ col.wrapping_mul(17)) % 5;
    let factor = 0.92 + jitter as f32 * 0.03;
    let scale = |v: u8| (f32::from(v) * factor).min(255.0) as u8;
    Color::Rgb(scale(r), scale(g), scale(b))
}

/// Terminal cells covering the given particles.
fn flash_buffer_positions(board: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    cells
        .iter()
        .map(|&(row, col)| (board.x + col as u16, board.y + (row / 2) as u16))
        .filter(|&(x, y)| x < board.x + board.width && y < board.y + board.height)
        .collect()
}

/// Fade the flashing particles to the background over the flash duration.
/// A new effect is built whenever `flash` was reset by the app.
fn apply_flash_effect(
    frame: &mut Frame,
    view: &View,
    board: Rect,
    cells: &[(usize, usize)],
    flash: &mut Option<Effect>,
    flash_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = flash_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *flash_time = Some(now);

    if flash.is_none() {
        let positions = flash_buffer_positions(board, cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| positions.contains(&(pos.x, pos.y))));
        let bg = view.theme.bg;
        let ms = view.session.config().flash.as_millis().min(u128::from(u32::MAX)) as u32;
        *flash = Some(
            fx::fade_to(bg, bg, (ms, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board),
        );
    }
    if let Some(effect) = flash {
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next
            Constraint::Length(1),
            Constraint::Length(6), // Stats
            Constraint::Length(1),
            Constraint::Length(3), // Colours
            Constraint::Length(1),
            Constraint::Length(4), // Banner
        ])
        .split(area);

    let next_block = sidebar_block(theme).title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    draw_next_preview(frame, theme, session.next(), next_inner);

    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let status = if session.is_simulating() { "settling" } else { "" };
    Paragraph::new(Text::from(vec![
        stat("Score: ", session.score().to_string()),
        stat("Level: ", session.level().to_string()),
        stat("Lines: ", session.lines_cleared().to_string()),
        Line::from(Span::styled(status, Style::default().fg(theme.inactive_fg))),
    ]))
    .render(stats_inner, frame.buffer_mut());

    let colours_block = sidebar_block(theme);
    let colours_inner = colours_block.inner(chunks[4]);
    colours_block.render(chunks[4], frame.buffer_mut());
    draw_colour_strip(frame, theme, session.config().palette_size, colours_inner);

    if let Some(banner) = view.banner {
        let banner_block = sidebar_block(theme);
        let banner_inner = banner_block.inner(chunks[6]);
        banner_block.render(chunks[6], frame.buffer_mut());
        Paragraph::new(banner)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.title).add_modifier(Modifier::BOLD))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .render(banner_inner, frame.buffer_mut());
    }
}

/// Queued block drawn at two terminal cells per block cell; bombs get a badge.
fn draw_next_preview(frame: &mut Frame, theme: &Theme, next: &FallingBlock, area: Rect) {
    let (color, label) = match next.tag {
        Tag::Color(i) => (theme.sand_color(i), None),
        Tag::Bomb => (theme.bomb, Some(" BOMB ")),
    };
    let (bw, bh) = (next.shape.width() as u16, next.shape.height() as u16);
    let off_x = area.width.saturating_sub(bw * NEXT_MINI_CELL_W) / 2;
    let off_y = area.height.saturating_sub(bh * NEXT_MINI_CELL_H + u16::from(label.is_some())) / 2;

    for (r, c) in next.shape.cells() {
        let rect = Rect {
            x: area.x + off_x + c as u16 * NEXT_MINI_CELL_W,
            y: area.y + off_y + r as u16 * NEXT_MINI_CELL_H,
            width: NEXT_MINI_CELL_W,
            height: NEXT_MINI_CELL_H,
        }
        .intersection(area);
        Paragraph::new("██")
            .style(Style::default().fg(color).bg(color))
            .render(rect, frame.buffer_mut());
    }
    if let Some(label) = label {
        let y = area.y + off_y + bh * NEXT_MINI_CELL_H;
        if y < area.y + area.height {
            let rect = Rect { y, height: 1, ..area };
            Paragraph::new(Span::styled(
                label,
                Style::default().fg(theme.bg).bg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .render(rect, frame.buffer_mut());
        }
    }
}

fn draw_colour_strip(frame: &mut Frame, theme: &Theme, palette_size: u8, area: Rect) {
    let n = palette_size.max(1);
    let block_w = (area.width / u16::from(n)).max(1);
    for i in 0..n {
        let rect = Rect {
            x: area.x + u16::from(i) * block_w,
            y: area.y,
            width: block_w,
            height: area.height.min(1),
        }
        .intersection(area);
        let c = theme.sand_color(i);
        Paragraph::new("█")
            .style(Style::default().fg(c).bg(c))
            .render(rect, frame.buffer_mut());
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let popup = centered(area, 30, 6);
    let heading = if view.restored { " Saved game restored " } else { " Paused " };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(heading, Style::default().fg(Color::Black).bg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(" P - Resume    Q - Quit ", Style::default().fg(theme.main_fg))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(sidebar_block(theme))
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let fg = Style::default().fg(theme.main_fg);
    let popup = centered(area, 30, 10);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Game Over ", Style::default().fg(Color::White).bg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", session.score()), fg)),
        Line::from(Span::styled(format!(" Level: {} ", session.level()), fg)),
        Line::from(Span::styled(format!(" Lines: {} ", session.lines_cleared()), fg)),
        Line::from(""),
        Line::from(Span::styled(" R - Restart    Q - Quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(sidebar_block(theme).title(Span::styled(" Sandblast ", Style::default().fg(theme.title))))
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandblast::block::{Position, TetrominoKind};

    #[test]
    fn playfield_packs_two_particle_rows_per_line() {
        assert_eq!(playfield_size(&ParticleGrid::new(48, 80)), (50, 42));
        assert_eq!(playfield_size(&ParticleGrid::new(4, 5)), (6, 5));
    }

    #[test]
    fn flash_positions_fold_rows_in_pairs() {
        let board = Rect::new(1, 1, 4, 2);
        let set = flash_buffer_positions(board, &[(0, 0), (1, 0), (3, 3), (9, 0)]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&(1, 1)));
        assert!(set.contains(&(4, 2)));
    }

    #[test]
    fn falling_block_is_clipped_to_grid() {
        let block = FallingBlock {
            shape: TetrominoKind::O.shape(),
            tag: Tag::Bomb,
            position: Position { row: -1, col: 0 },
        };
        let cells = falling_particles(Some(&block), 2, 8, 8);
        assert_eq!(cells.len(), 8);
        assert!(cells.values().all(|&c| c == Cell::Bomb));
    }
}
