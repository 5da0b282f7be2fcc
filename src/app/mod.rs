use crate::acquire::{Session, TickOutcome};
use crate::config::Config;
use crate::history::Channel;
use crate::reflow_port::LineLink;
use chrono::{DateTime, Local};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Stylize},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph},
};
use std::time::{Duration, Instant};
use tracing::{info, warn};

type Series = (&'static str, Color, Channel);

const PID_SERIES: [Series; 4] = [
    ("P", Color::Yellow, Channel::Proportional),
    ("I", Color::Magenta, Channel::Integral),
    ("D", Color::Cyan, Channel::Derivative),
    ("PWM", Color::Blue, Channel::Pwm),
];

const TEMP_SERIES: [Series; 2] = [
    ("Setpoint", Color::Red, Channel::Setpoint),
    ("Measured", Color::Green, Channel::Measured),
];

/// Whether the acquisition timer still fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Running,
    /// Parse ceiling was hit; no more samples for this run.
    Halted,
}

/// Live view of a reflow run. Owns the session while the terminal UI is up;
/// [`App::into_session`] hands it back for shutdown.
pub struct App<L: LineLink> {
    /// Is the application running?
    running: bool,
    session: Session<L>,
    cfg: Config,
    capture: CaptureState,
    /// Status message to show at bottom.
    status: String,
    next_tick: Instant,
    started_at: DateTime<Local>,
}

impl<L: LineLink> App<L> {
    pub fn new(session: Session<L>, cfg: Config) -> Self {
        Self {
            running: false,
            session,
            cfg,
            capture: CaptureState::Running,
            status: "Capturing.".to_string(),
            next_tick: Instant::now(),
            started_at: Local::now(),
        }
    }

    pub fn capture(&self) -> CaptureState {
        self.capture
    }

    pub fn into_session(self) -> Session<L> {
        self.session
    }

    /// Run the application's main loop until the operator quits.
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.running = true;
        // Anything queued before the first tick predates the run.
        self.session.link.discard_input()?;
        self.next_tick = Instant::now() + self.cfg.tick_period();
        while self.running {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events()?;
            if self.running && Instant::now() >= self.next_tick {
                self.on_tick()?;
                self.schedule_next_tick();
            }
        }
        Ok(())
    }

    fn schedule_next_tick(&mut self) {
        let period = self.cfg.tick_period();
        self.next_tick += period;
        let now = Instant::now();
        if self.next_tick < now {
            self.next_tick = now + period;
        }
    }

    /// One timer expiry: read a sample unless capture has halted.
    pub fn on_tick(&mut self) -> Result<()> {
        if self.capture == CaptureState::Halted {
            return Ok(());
        }
        match self.session.tick(self.cfg.parse_attempts)? {
            TickOutcome::Appended { retries } if retries > 0 => {
                self.status = format!("Failed to parse values, retried {retries} time(s).");
            }
            TickOutcome::Appended { .. } => {}
            TickOutcome::Halted { last_error } => {
                self.capture = CaptureState::Halted;
                self.status = format!(
                    "Reflow process stopped ({last_error}). Close window to save data."
                );
                warn!(samples = self.session.history.len(), "capture halted");
            }
        }
        Ok(())
    }

    /// Renders the user interface.
    pub fn render(&self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![
                Constraint::Min(10),
                Constraint::Length(4),
                Constraint::Length(4),
            ])
            .split(frame.area());

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[0]);

        let pid_points = self.series_points(&PID_SERIES);
        let temp_points = self.series_points(&TEMP_SERIES);
        frame.render_widget(
            self.chart("Reflow Oven Controller", "", &pid_points, self.cfg.pid_limits, 1000.0),
            charts[0],
        );
        frame.render_widget(
            self.chart("Oven Temperature", "Temperature (°C)", &temp_points, self.cfg.temp_limits, 50.0),
            charts[1],
        );

        let (time, state) = self.session.history.latest().unwrap_or((0.0, "NA"));
        let mut readout = Text::default();
        readout.extend([Line::from(format!("Time: {time:.2} s"))]);
        readout.extend([Line::from(format!("State: {state}"))]);
        frame.render_widget(
            Paragraph::new(readout).block(Block::bordered().title("Latest")),
            layout[1],
        );

        let capture = match self.capture {
            CaptureState::Running => Span::styled("RUNNING", Style::default().fg(Color::Green)),
            CaptureState::Halted => Span::styled("HALTED", Style::default().fg(Color::Red)),
        };
        let mut status_text = Text::default();
        status_text.extend([Line::from(vec![
            Span::raw(format!(
                "Port: {} | Started {} | {} samples | ",
                self.session.link.name(),
                self.started_at.format("%Y-%m-%d %H:%M:%S"),
                self.session.history.len()
            )),
            capture,
        ])]);
        status_text.extend([Line::from(vec![
            Span::raw(self.status.clone()),
            Span::raw("  "),
            "q/Esc/Ctrl+C = stop and save".dark_gray(),
        ])]);
        frame.render_widget(
            Paragraph::new(status_text).block(Block::bordered().title("Connection Status")),
            layout[2],
        );
    }

    fn series_points(&self, series: &[Series]) -> Vec<(&'static str, Color, Vec<(f64, f64)>)> {
        series
            .iter()
            .map(|&(name, color, channel)| (name, color, self.session.history.points(channel)))
            .collect()
    }

    /// Fixed-range chart; points outside the bounds are simply not drawn.
    fn chart<'a>(
        &self,
        title: &'a str,
        y_title: &'a str,
        series: &'a [(&'static str, Color, Vec<(f64, f64)>)],
        y_limits: [f64; 2],
        y_step: f64,
    ) -> Chart<'a> {
        let datasets = series
            .iter()
            .map(|(name, color, points)| {
                Dataset::default()
                    .name(*name)
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(*color)
                    .data(points)
            })
            .collect();
        let [t_lo, t_hi] = self.cfg.time_limits;
        Chart::new(datasets)
            .block(Block::bordered().title(title.bold()))
            .x_axis(
                Axis::default()
                    .title("Time (s)")
                    .bounds([t_lo, t_hi])
                    .labels(axis_labels(t_lo, t_hi, (t_hi - t_lo) / 2.0)),
            )
            .y_axis(
                Axis::default()
                    .title(y_title)
                    .bounds(y_limits)
                    .labels(axis_labels(y_limits[0], y_limits[1], y_step * 2.0)),
            )
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self) -> Result<()> {
        let wait = match self.capture {
            CaptureState::Running => self.next_tick.saturating_duration_since(Instant::now()),
            CaptureState::Halted => Duration::from_millis(250),
        };
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            _ => {}
        }
    }

    fn quit(&mut self) {
        info!(samples = self.session.history.len(), "operator closed the window");
        self.running = false;
    }
}

fn axis_labels(lo: f64, hi: f64, step: f64) -> Vec<String> {
    let count = ((hi - lo) / step).round() as usize;
    (0..=count)
        .map(|i| format!("{:.0}", lo + step * i as f64))
        .collect()
}
