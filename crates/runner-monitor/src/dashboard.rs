//! TUI status dashboard using ratatui.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use rust_decimal::Decimal;
use std::io;
use std::time::Duration;
use runner_engine::StatusSnapshot;

/// What one frame shows.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Latest published status; `None` until the first tick
    pub status: Option<StatusSnapshot>,
    pub signal_name: String,
    pub messages: Vec<String>,
}

/// TUI Dashboard.
pub struct Dashboard {
    refresh_ms: u64,
}

impl Dashboard {
    /// Create a new dashboard.
    pub fn new(refresh_ms: u64) -> Self {
        Self { refresh_ms }
    }

    /// Run the dashboard until 'q' or Esc. Blocks the calling thread.
    ///
    /// Every other character key is handed to `on_key`.
    pub fn run<F, K>(&self, mut get_state: F, mut on_key: K) -> io::Result<()>
    where
        F: FnMut() -> DashboardState,
        K: FnMut(char),
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_loop(&mut terminal, &mut get_state, &mut on_key);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    fn run_loop<B, F, K>(
        &self,
        terminal: &mut Terminal<B>,
        get_state: &mut F,
        on_key: &mut K,
    ) -> io::Result<()>
    where
        B: Backend,
        F: FnMut() -> DashboardState,
        K: FnMut(char),
    {
        loop {
            let state = get_state();
            terminal.draw(|f| self.ui(f, &state))?;

            if event::poll(Duration::from_millis(self.refresh_ms))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char(c) => on_key(c),
                        _ => {}
                    }
                }
            }
        }
    }

    fn ui(&self, frame: &mut Frame, state: &DashboardState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(5), // Market
                Constraint::Length(5), // Position
                Constraint::Length(4), // Journal
                Constraint::Min(5),    // Events
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0], state);
        match &state.status {
            Some(status) => {
                self.render_market(frame, chunks[1], status);
                self.render_position(frame, chunks[2], status);
                self.render_journal(frame, chunks[3], status);
            }
            None => {
                let waiting = Paragraph::new("waiting for the first tick...")
                    .block(Block::default().borders(Borders::ALL).title("Market"));
                frame.render_widget(waiting, chunks[1]);
            }
        }
        self.render_messages(frame, chunks[4], state);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let (venue, trading) = match &state.status {
            Some(s) => (
                format!("{} {}", s.exchange, s.venue),
                s.trading_enabled,
            ),
            None => ("-".to_string(), false),
        };
        let (label, color) = if trading {
            ("TRADING ON", Color::Green)
        } else {
            ("TRADING OFF", Color::Yellow)
        };

        let header = Paragraph::new(vec![Line::from(vec![
            Span::styled("Fast Runner", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" | "),
            Span::styled(venue, Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::raw(state.signal_name.as_str()),
            Span::raw(" | "),
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(" | g go  s stop  f flatten  q quit"),
        ])])
        .block(Block::default().borders(Borders::ALL).title("System"));
        frame.render_widget(header, area);
    }

    fn render_market(&self, frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
        let price = status
            .price
            .map_or_else(|| "n/a".to_string(), |p| p.to_string());
        let age = status
            .snapshot_age_secs
            .map_or_else(|| "-".to_string(), |a| format!("{}s", a));

        let mut lines = vec![
            Line::from(vec![
                Span::raw("Symbol: "),
                Span::styled(
                    status.symbol.as_str(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  |  Price: "),
                Span::styled(price, Style::default().fg(Color::White)),
                Span::raw(format!("  |  Age: {}", age)),
                Span::raw(format!("  |  Leverage: {}x", status.leverage)),
            ]),
            Line::from(format!(
                "Ticks: {}  |  Cooldown: {}s",
                status.ticks, status.cooldown_remaining_secs
            )),
        ];
        if let Some((kind, message)) = &status.last_error {
            lines.push(Line::from(Span::styled(
                format!("Last error {:?}: {}", kind, message),
                Style::default().fg(Color::Red),
            )));
        }

        let market =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Market"));
        frame.render_widget(market, area);
    }

    fn render_position(&self, frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
        let header_cells = ["Side", "Qty", "Entry", "Stop", "Extreme", "Mode", "P&L"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells).height(1);

        let rows = status.position.iter().map(|pos| {
            let pnl = status.unrealized_pnl.unwrap_or_default();
            let mode = if pos.fast_mode { "FAST" } else { "normal" };
            Row::new(vec![
                Cell::from(pos.direction.to_string()),
                Cell::from(pos.quantity.to_string()),
                Cell::from(format!("{:.4}", pos.entry_price)),
                Cell::from(format!("{:.4}", pos.stop_price)),
                Cell::from(format!("{:.4}", pos.extreme_price)),
                Cell::from(mode),
                Cell::from(format!("{:.2}", pnl)).style(Style::default().fg(pnl_color(pnl))),
            ])
        });

        let title = if status.position.is_some() {
            "Position"
        } else {
            "Position (flat)"
        };
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(10),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
                Constraint::Percentage(10),
                Constraint::Percentage(16),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

        frame.render_widget(table, area);
    }

    fn render_journal(&self, frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
        let j = &status.journal;
        let stats = Paragraph::new(vec![Line::from(vec![
            Span::raw(format!(
                "Trades: {}  |  W/L: {}/{}  |  Win rate: {:.1}%  |  Fast exits: {}  |  P&L: ",
                j.trades, j.wins, j.losses, j.win_rate_pct, j.fast_exits
            )),
            Span::styled(
                format!("{:.2}", j.realized_pnl),
                Style::default().fg(pnl_color(j.realized_pnl)),
            ),
        ])])
        .block(Block::default().borders(Borders::ALL).title("Session"));
        frame.render_widget(stats, area);
    }

    fn render_messages(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let rows = area.height.saturating_sub(2) as usize;
        let messages: Vec<Line> = state
            .messages
            .iter()
            .rev()
            .take(rows)
            .map(|m| Line::from(m.as_str()))
            .collect();

        let paragraph =
            Paragraph::new(messages).block(Block::default().borders(Borders::ALL).title("Events"));
        frame.render_widget(paragraph, area);
    }
}

fn pnl_color(pnl: Decimal) -> Color {
    if pnl >= Decimal::ZERO {
        Color::Green
    } else {
        Color::Red
    }
}
