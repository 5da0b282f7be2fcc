use std::{path::PathBuf, time::Duration};

/// Sampling period of the controller's REFLOW log, in milliseconds.
pub const T_SAMPLE_MS: u64 = 500;

/// Turns off every other log tag, enables the REFLOW data log and restarts the process.
pub const START_MSG: &[u8] = b"log set * OFF\n log set REFLOW INFO\n reflow stop\n reflow start\n";

pub const STOP_MSG: &[u8] = b"reflow stop\n";

/// Exact line the firmware prints once the reflow process has started.
pub const START_RESPONSE: &str = "\x1b[0m\x1b[KStarting reflow process\r\n";

#[cfg(target_os = "windows")]
const DEFAULT_PORT: &str = "COM3";
#[cfg(not(target_os = "windows"))]
const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Fixed operating parameters. There is no CLI or config file; edit the
/// defaults to change them.
#[derive(Debug, Clone)]
pub struct Config {
    pub port_name: String,
    pub baud_rate: u32,
    /// Upper bound on a single blocking read.
    pub read_timeout: Duration,
    pub csv_path: PathBuf,
    pub plot_path: PathBuf,
    pub log_path: PathBuf,
    pub handshake_attempts: u32,
    pub parse_attempts: u32,
    pub time_limits: [f64; 2],
    pub pid_limits: [f64; 2],
    pub temp_limits: [f64; 2],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_secs(3600),
            csv_path: PathBuf::from("./csv/temp_ctrl.csv"),
            plot_path: PathBuf::from("./imgs/temp_ctrl.png"),
            log_path: PathBuf::from("./logs/reflow_plot.log"),
            handshake_attempts: 20,
            parse_attempts: 3,
            time_limits: [0.0, 450.0],
            pid_limits: [-5000.0, 5000.0],
            temp_limits: [0.0, 300.0],
        }
    }
}

impl Config {
    /// Period between acquisition ticks, slightly shorter than the sample
    /// period so the input buffer never falls behind.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(T_SAMPLE_MS - 20)
    }

    /// Sample period in seconds, stored in the first CSV row.
    pub fn sample_period_secs(&self) -> f64 {
        T_SAMPLE_MS as f64 / 1000.0
    }
}
