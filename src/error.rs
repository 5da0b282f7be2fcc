use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReflowError {
    #[error("Could not open serial port {port}: {source}")]
    PortOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Did not receive response from microcontroller after {attempts} lines")]
    NoStartResponse { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Plot rendering error: {0}")]
    Plot(String),
}

pub type ReflowResult<T> = Result<T, ReflowError>;
