use crate::config::Config;
use crate::error::{ReflowError, ReflowResult};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, BufRead, BufReader, Write};

/// Line-oriented view of the controller connection.
pub trait LineLink {
    /// Human readable name of the underlying port.
    fn name(&self) -> String;

    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line including its terminator. An empty string means nothing
    /// arrived before the port gave up.
    fn read_line(&mut self) -> io::Result<String>;

    /// Drop everything received so far.
    fn discard_input(&mut self) -> io::Result<()>;

    /// Bytes still waiting in the receive buffer.
    fn pending_input(&self) -> io::Result<u32>;
}

/// Serial port wrapped in a line buffer.
pub struct SerialLink {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("name", &self.name).finish()
    }
}

/// Open the controller port with 8N1 framing and no flow control.
pub fn open_port(cfg: &Config) -> ReflowResult<SerialLink> {
    let port = serialport::new(&cfg.port_name, cfg.baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(cfg.read_timeout)
        .open()
        .map_err(|source| ReflowError::PortOpen {
            port: cfg.port_name.clone(),
            source,
        })?;
    let name = port.name().unwrap_or_else(|| cfg.port_name.clone());
    Ok(SerialLink {
        name,
        reader: BufReader::new(port),
    })
}

impl LineLink for SerialLink {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.reader.get_mut();
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut raw = Vec::new();
        self.reader.read_until(b'\n', &mut raw)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        // Empty the line buffer as well as the driver's queue.
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        self.reader.get_ref().clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn pending_input(&self) -> io::Result<u32> {
        let waiting = self.reader.get_ref().bytes_to_read()?;
        Ok(waiting + self.reader.buffer().len() as u32)
    }
}

/// True when a failed read only means the controller stayed quiet.
pub fn is_quiet(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
pub mod testing {
    use super::LineLink;
    use std::collections::VecDeque;
    use std::io;

    /// In-memory controller: replays canned lines and records what was sent.
    /// Once the script runs dry every read times out, or fails outright when
    /// `broken` is set.
    #[derive(Debug, Default)]
    pub struct ScriptedLink {
        pub lines: VecDeque<String>,
        pub sent: Vec<u8>,
        pub discarded: usize,
        pub broken: bool,
    }

    impl ScriptedLink {
        pub fn new<I, S>(lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                lines: lines.into_iter().map(Into::into).collect(),
                ..Self::default()
            }
        }

        pub fn sent_text(&self) -> String {
            String::from_utf8_lossy(&self.sent).into_owned()
        }
    }

    impl LineLink for ScriptedLink {
        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }

        fn read_line(&mut self) -> io::Result<String> {
            match self.lines.pop_front() {
                Some(line) => Ok(line),
                None if self.broken => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "device unplugged",
                )),
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted")),
            }
        }

        fn discard_input(&mut self) -> io::Result<()> {
            self.discarded += 1;
            Ok(())
        }

        fn pending_input(&self) -> io::Result<u32> {
            Ok(self.lines.iter().map(|l| l.len() as u32).sum())
        }
    }
}
