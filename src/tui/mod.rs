//! Ratatui-based terminal UI.
//!
//! The TUI provides a sidebar for picking an applicant, a predict action
//! with a probability gauge and decision banner, and on-demand explanation
//! charts rendered via Plotters.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
    Terminal,
};

use crate::app::session::Session;
use crate::domain::{ClientId, Prediction};
use crate::error::AppError;
use crate::explain::{GlobalImportance, LocalAttribution};
use crate::report;

mod chart;

use chart::AttributionBars;

/// Start the TUI with an already-started session.
///
/// The session (model load included) is built before the terminal enters raw
/// mode so startup failures print normally.
pub fn run(session: Session) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(session)?;
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode()
            .map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!(
                "Failed to enter alternate screen: {e}"
            )));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Which explanation is currently on screen.
enum Panel {
    None,
    Global(GlobalImportance),
    Local(LocalAttribution),
}

struct App {
    session: Session,
    clients: Vec<ClientId>,
    selected: usize,
    /// Last prediction, tagged with the applicant it was computed for.
    prediction: Option<(ClientId, Prediction)>,
    panel: Panel,
    status: String,
}

impl App {
    fn new(mut session: Session) -> Result<Self, AppError> {
        let clients = session.scoring.list_clients()?;
        if clients.is_empty() {
            return Err(AppError::runtime(
                "Scoring service returned an empty applicant list.",
            ));
        }
        let status = format!("{} applicant(s) loaded. Press p to predict.", clients.len());
        Ok(Self {
            session,
            clients,
            selected: 0,
            prediction: None,
            panel: Panel::None,
            status,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Handle one keypress; returns `true` to quit.
    ///
    /// Service and explanation errors terminate only the current interaction:
    /// the message lands in the status line and the next keypress starts
    /// fresh.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.on_selection_change();
                }
            }
            KeyCode::Down => {
                if self.selected + 1 < self.clients.len() {
                    self.selected += 1;
                    self.on_selection_change();
                }
            }
            KeyCode::Enter | KeyCode::Char('p') => self.predict(),
            KeyCode::Char('g') => self.toggle_global(),
            KeyCode::Char('l') => self.show_local(),
            KeyCode::Char('r') => self.refresh_clients(),
            KeyCode::Char('d') => self.write_debug_bundle(),
            _ => {}
        }
        false
    }

    fn selected_client(&self) -> ClientId {
        self.clients[self.selected]
    }

    /// Selection invalidates anything derived from the previous applicant.
    fn on_selection_change(&mut self) {
        self.prediction = None;
        if matches!(self.panel, Panel::Local(_)) {
            self.panel = Panel::None;
        }
    }

    fn predict(&mut self) {
        let client_id = self.selected_client();
        self.status = format!("Scoring applicant {client_id}...");
        match self.session.scoring.predict(client_id) {
            Ok(prediction) => {
                self.status = format!(
                    "Applicant {client_id}: {} — {}",
                    report::format_percent(prediction.proba),
                    prediction.decision.label()
                );
                self.prediction = Some((client_id, prediction));
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn toggle_global(&mut self) {
        if matches!(self.panel, Panel::Global(_)) {
            self.panel = Panel::None;
            self.status = "Global importance hidden.".to_string();
            return;
        }
        match self.session.global_importance() {
            Ok(global) => {
                self.status = format!("Global importance over {} row(s).", global.rows_used);
                self.panel = Panel::Global(global);
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn show_local(&mut self) {
        let client_id = self.selected_client();
        match self.session.local_attribution(client_id) {
            Ok(local) => {
                self.status = format!(
                    "Local attribution for applicant {client_id} (row {}).",
                    local.row
                );
                self.panel = Panel::Local(local);
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn refresh_clients(&mut self) {
        self.session.scoring.evict_client_list();
        match self.session.scoring.list_clients() {
            Ok(clients) => {
                if clients.is_empty() {
                    self.status = "Scoring service returned an empty applicant list.".to_string();
                    return;
                }
                self.status = format!("Refreshed: {} applicant(s).", clients.len());
                self.clients = clients;
                if self.selected >= self.clients.len() {
                    self.selected = self.clients.len() - 1;
                }
                self.on_selection_change();
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn write_debug_bundle(&mut self) {
        let global = match &self.panel {
            Panel::Global(global) => Some(global),
            _ => None,
        };
        match crate::debug::write_debug_bundle(
            &self.session.config,
            &self.session.model,
            self.prediction,
            global,
        ) {
            Ok(path) => self.status = format!("Wrote debug bundle: {}", path.display()),
            Err(err) => self.status = format!("Debug write failed: {err}"),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("cscope", Style::default().fg(Color::Cyan)),
            Span::raw(" — loan scoring desk"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "model: {}:{} | service: {} | applicants: {}",
                self.session.model.name,
                self.session.model.version,
                self.session.config.service_url,
                self.clients.len(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(0)])
            .split(area);

        self.draw_sidebar(frame, chunks[0]);

        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(chunks[1]);

        self.draw_prediction(frame, main[0]);
        self.draw_explanation(frame, main[1]);
    }

    fn draw_sidebar(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .clients
            .iter()
            .map(|id| ListItem::new(id.to_string()))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Applicants").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_prediction(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Prediction").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some((client_id, prediction)) = &self.prediction else {
            let msg = Paragraph::new(format!(
                "Applicant {} selected. Press p to request a prediction.",
                self.selected_client()
            ))
            .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let readout = Paragraph::new(format!(
            "Applicant {client_id} — probability of repayment: {}",
            report::format_percent(prediction.proba)
        ));
        frame.render_widget(readout, rows[0]);

        let steps = report::progress_steps(prediction.proba);
        let gauge_color = if prediction.decision.is_rejected() {
            Color::Red
        } else {
            Color::Green
        };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(gauge_color).bg(Color::DarkGray))
            .percent(steps)
            .label(format!("{steps}/100"));
        frame.render_widget(gauge, rows[1]);

        let banner_style = if prediction.decision.is_rejected() {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        };
        let banner = Paragraph::new(Span::styled(prediction.decision.label(), banner_style));
        frame.render_widget(banner, rows[2]);
    }

    fn draw_explanation(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let top_n = self.session.config.top_n;
        let (title, items, diverging) = match &self.panel {
            Panel::None => {
                let block = Block::default().title("Explanation").borders(Borders::ALL);
                let inner = block.inner(area);
                frame.render_widget(block, area);
                let msg = Paragraph::new("g: global importance  l: local attribution")
                    .style(Style::default().fg(Color::Yellow));
                frame.render_widget(msg, inner);
                return;
            }
            Panel::Global(global) => (
                format!("Global importance ({} rows)", global.rows_used),
                global
                    .features
                    .iter()
                    .take(top_n)
                    .map(|f| (f.name.clone(), f.mean_abs))
                    .collect::<Vec<_>>(),
                false,
            ),
            Panel::Local(local) => (
                format!(
                    "Local attribution — applicant {} (margin {:+.3})",
                    local.client_id, local.margin
                ),
                local
                    .contributions
                    .iter()
                    .take(top_n)
                    .map(|c| (c.name.clone(), c.contribution))
                    .collect::<Vec<_>>(),
                true,
            ),
        };

        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if items.is_empty() {
            let msg = Paragraph::new("(no features)").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let x_bounds = bar_bounds(&items, diverging);
        let (chart_rect, label_w) = chart_layout(inner, &items);
        let widget = AttributionBars {
            items: &items,
            diverging,
            x_bounds,
            fmt_x: fmt_axis_x,
        };
        frame.render_widget(widget, chart_rect);

        if let Some(label_w) = label_w {
            draw_bar_labels(frame, inner, chart_rect, label_w, &items);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  p predict  g global  l local  r refresh  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// X bounds for the bar chart, padded 5% so the longest bar never touches
/// the border.
fn bar_bounds(items: &[(String, f64)], diverging: bool) -> [f64; 2] {
    let mut lo = 0.0f64;
    let mut hi = 0.0f64;
    for &(_, v) in items {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !diverging {
        lo = 0.0;
    }
    if hi - lo <= 0.0 {
        return [if diverging { -1.0 } else { 0.0 }, 1.0];
    }
    let pad = (hi - lo) * 0.05;
    [if lo < 0.0 { lo - pad } else { lo }, hi + pad]
}

/// Reserve a left column for feature labels when the area is wide enough.
fn chart_layout(inner: Rect, items: &[(String, f64)]) -> (Rect, Option<u16>) {
    let longest = items
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .min(20) as u16;
    let label_w = longest + 1;

    if inner.width <= label_w + 20 || inner.height < 4 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + label_w,
        y: inner.y,
        width: inner.width - label_w,
        height: inner.height,
    };

    (rect, Some(label_w))
}

/// Render feature names beside their bars.
///
/// Plotters draws the bars; the names are ordinary terminal text, which stays
/// crisp at terminal resolution.
fn draw_bar_labels(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    label_w: u16,
    items: &[(String, f64)],
) {
    let n = items.len();
    let style = Style::default().fg(Color::Gray);

    // The chart reserves two bottom rows for the x axis.
    let plot_height = chart.height.saturating_sub(2);
    if plot_height == 0 {
        return;
    }

    for (i, (name, _)) in items.iter().enumerate() {
        let u = (i as f64 + 0.5) / n as f64;
        let y = chart.y + (plot_height.saturating_sub(1) as f64 * u).round() as u16;
        if y >= inner.y + inner.height {
            continue;
        }
        let label: String = name.chars().take(label_w as usize - 1).collect();
        frame.render_widget(
            Paragraph::new(label)
                .alignment(Alignment::Right)
                .style(style),
            Rect {
                x: inner.x,
                y,
                width: label_w - 1,
                height: 1,
            },
        );
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.2}")
}
