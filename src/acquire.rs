use crate::error::ReflowResult;
use crate::history::History;
use crate::reflow_port::{LineLink, is_quiet};
use crate::sample::{ParseError, Reading, parse_line};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of one acquisition tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A sample was appended after `retries` unusable lines.
    Appended { retries: u32 },
    /// Every attempt in this tick failed; capture should stop.
    Halted { last_error: String },
}

/// Everything owned by one controller session: the link, the captured run
/// and the clock the samples are stamped against.
pub struct Session<L: LineLink> {
    pub link: L,
    pub history: History,
    started: Instant,
}

impl<L: LineLink> Session<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            history: History::new(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Read lines until one parses or `max_attempts` consecutive lines fail.
    /// The failure count starts over on every call.
    pub fn tick(&mut self, max_attempts: u32) -> ReflowResult<TickOutcome> {
        let mut failures = 0;
        loop {
            let error = match read_reading(&mut self.link)? {
                Ok(reading) => {
                    let sample = reading.at(self.elapsed_secs());
                    debug!(state = %sample.state, t = sample.time_s, "sample");
                    self.history.push(sample);
                    return Ok(TickOutcome::Appended { retries: failures });
                }
                Err(e) => e,
            };
            failures += 1;
            warn!(attempt = failures, %error, "Failed to parse values, trying again...");
            if failures >= max_attempts {
                warn!(samples = self.history.len(), "Reflow process stopped.");
                return Ok(TickOutcome::Halted { last_error: error });
            }
        }
    }
}

/// Outer error is a dead link; inner error is a line that could not be used.
fn read_reading(link: &mut dyn LineLink) -> ReflowResult<Result<Reading, String>> {
    match link.read_line() {
        Ok(line) if line.is_empty() => Ok(Err("no data".to_string())),
        Ok(line) => Ok(parse_line(&line).map_err(|e: ParseError| e.to_string())),
        Err(e) if is_quiet(&e) => Ok(Err("read timed out".to_string())),
        Err(e) => Err(e.into()),
    }
}
