use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::board::{Board, CellContent};
use crate::types::{Flash, SignalClass, TrendLevel};

/// Column headers with their tooltip text, shown in the `?` legend overlay.
/// Built once; one description per annotated column.
const COLUMN_TOOLTIPS: [(&str, &str); 17] = [
    ("Pair", "Trading pair identifier"),
    ("Price", "Current price; flashes green/red on change"),
    ("SMA", "SMA 50/200 cross signal"),
    ("Stoch", "Stochastic oscillator signal"),
    ("ADX", "Average Directional Index value"),
    ("ADX Sig", "Trend strength derived from ADX and DI"),
    ("RSI", "Relative Strength Index value"),
    ("RSI Sig", "Overbought/oversold signal from RSI"),
    ("Ichimoku", "Ichimoku cloud trend signal"),
    ("ATR", "Average True Range value"),
    ("ATR Sig", "Volatility warning derived from ATR"),
    ("VWAP", "Volume-weighted average price"),
    ("VWAP Sig", "Price position relative to VWAP"),
    ("Fibo", "Nearest Fibonacci retracement level"),
    ("Rev%", "Reversal probability"),
    ("Down%", "Downtrend probability; highlighted above 50"),
    ("Up%", "Uptrend probability; alerts fire at 51 and above"),
];

/// Runs the dashboard event loop until `q` or Esc. The pollers keep mutating
/// the shared board; every frame renders a snapshot of it.
pub async fn run(board: Arc<RwLock<Board>>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut show_legend = false;
    let result = loop {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
                        KeyCode::Char('?') => show_legend = !show_legend,
                        _ => {}
                    }
                }
            }
        }

        let snapshot = {
            let mut board = board.write().await;
            board.expire_flashes(Instant::now());
            board.clone()
        };
        let now = Instant::now();
        if let Err(e) = terminal.draw(|f| draw(f, &snapshot, now, show_legend)) {
            break Err(e.into());
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    result
}

fn draw(f: &mut Frame, board: &Board, now: Instant, show_legend: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], board);
    render_table(f, chunks[1], board, now);
    render_footer(f, chunks[2]);

    if show_legend {
        render_legend(f, chunks[1]);
    }
}

fn render_header(f: &mut Frame, area: Rect, board: &Board) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "TRENDWATCH ",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "{} pairs | {} | ? for legend",
                board.rows().len(),
                Local::now().format("%H:%M:%S")
            ),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, board: &Board, now: Instant) {
    let block = Block::default().borders(Borders::ALL).title("Trading Pairs");
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let rows = board.rows().iter().map(|row| {
        Row::new(vec![
            Cell::from(row.pair.as_str()),
            Cell::from(Span::styled(
                row.price.clone(),
                flash_style(row.flash_at(now)),
            )),
            signal_cell(&row.sma_signal),
            signal_cell(&row.stoch_signal),
            Cell::from(row.adx.as_str()),
            signal_cell(&row.adx_signal),
            Cell::from(row.rsi.as_str()),
            signal_cell(&row.rsi_signal),
            signal_cell(&row.ichimoku_signal),
            Cell::from(row.atr.as_str()),
            signal_cell(&row.atr_signal),
            Cell::from(row.vwap.as_str()),
            signal_cell(&row.vwap_signal),
            Cell::from(row.near_fibo.as_str()),
            Cell::from(row.reversal.as_str()),
            Cell::from(Span::styled(
                row.downtrend_text.clone(),
                trend_style(row.downtrend_level, Color::Red),
            )),
            Cell::from(Span::styled(
                row.uptrend_text.clone(),
                trend_style(row.uptrend_level, Color::Green),
            )),
        ])
    });

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(COLUMN_TOOLTIPS.map(|(name, _)| name))
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .column_spacing(1);

    f.render_widget(table, inner);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Span::styled(
        "q: quit | ?: column legend",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(footer, area);
}

fn render_legend(f: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 60, (COLUMN_TOOLTIPS.len() + 2) as u16);
    let lines: Vec<Line> = COLUMN_TOOLTIPS
        .iter()
        .map(|(name, tooltip)| {
            Line::from(vec![
                Span::styled(
                    format!("{name:<10}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(*tooltip),
            ])
        })
        .collect();
    let legend = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Columns"));
    f.render_widget(Clear, popup);
    f.render_widget(legend, popup);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn signal_cell(content: &CellContent) -> Cell<'_> {
    Cell::from(Span::styled(
        content.display().to_string(),
        signal_style(content),
    ))
}

/// Transient price color: up is green, down is red, neutral otherwise.
fn flash_style(flash: Option<Flash>) -> Style {
    match flash {
        Some(Flash::Up) => Style::default().fg(Color::Green),
        Some(Flash::Down) => Style::default().fg(Color::Red),
        None => Style::default(),
    }
}

/// High-probability trend cells take the direction color, low ones stay dim.
fn trend_style(level: TrendLevel, high_color: Color) -> Style {
    match level {
        TrendLevel::High => Style::default()
            .fg(high_color)
            .add_modifier(Modifier::BOLD),
        TrendLevel::Low => Style::default().fg(Color::DarkGray),
    }
}

fn signal_style(content: &CellContent) -> Style {
    match content.icon() {
        Some(SignalClass::Neutral | SignalClass::Weak) => Style::default().fg(Color::DarkGray),
        Some(class) if class.is_bullish() => Style::default().fg(Color::Green),
        Some(_) => Style::default().fg(Color::Red),
        None => Style::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_styles_match_direction() {
        assert_eq!(flash_style(Some(Flash::Up)).fg, Some(Color::Green));
        assert_eq!(flash_style(Some(Flash::Down)).fg, Some(Color::Red));
        assert_eq!(flash_style(None).fg, None);
    }

    #[test]
    fn trend_styles_follow_level() {
        assert_eq!(
            trend_style(TrendLevel::High, Color::Green).fg,
            Some(Color::Green)
        );
        assert_eq!(
            trend_style(TrendLevel::Low, Color::Green).fg,
            Some(Color::DarkGray)
        );
    }

    #[test]
    fn signal_styles_follow_class() {
        let buy = CellContent::Icon(SignalClass::BuyArrow);
        let sell = CellContent::Icon(SignalClass::DeathCross);
        let neutral = CellContent::Icon(SignalClass::Neutral);
        let text = CellContent::Text("Veri Yok".to_string());
        assert_eq!(signal_style(&buy).fg, Some(Color::Green));
        assert_eq!(signal_style(&sell).fg, Some(Color::Red));
        assert_eq!(signal_style(&neutral).fg, Some(Color::DarkGray));
        assert_eq!(signal_style(&text).fg, None);
    }

    #[test]
    fn high_volatility_renders_as_down_icon() {
        let cell = CellContent::Icon(SignalClass::HighVolatility);
        assert_eq!(cell.display(), "↓");
        assert_eq!(signal_style(&cell).fg, Some(Color::Red));
    }

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(area, 60, 19);
        assert!(popup.x >= area.x && popup.right() <= area.right());
        assert!(popup.y >= area.y && popup.bottom() <= area.bottom());

        // Never larger than the surrounding area.
        let tiny = Rect::new(0, 0, 10, 5);
        let popup = centered_rect(tiny, 60, 19);
        assert_eq!(popup.width, 10);
        assert_eq!(popup.height, 5);
    }
}
