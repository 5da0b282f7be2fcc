use crate::config::{START_MSG, START_RESPONSE, STOP_MSG};
use crate::error::{ReflowError, ReflowResult};
use crate::reflow_port::{LineLink, is_quiet};
use tracing::{debug, error, info};

/// Start the reflow process and wait for the controller to confirm it.
///
/// Each line that is not the exact confirmation counts as one attempt. When
/// `max_attempts` is reached the process is stopped again and
/// [`ReflowError::NoStartResponse`] is returned.
pub fn start_reflow(link: &mut dyn LineLink, max_attempts: u32) -> ReflowResult<()> {
    link.send(START_MSG)?;
    info!(port = %link.name(), "posted reflow start command");

    let mut attempts = 0;
    loop {
        match link.read_line() {
            Ok(line) => {
                println!("{line}");
                debug!(attempt = attempts, line = %line.escape_debug(), "handshake line");
                if line == START_RESPONSE {
                    println!("Start message received.");
                    info!("controller confirmed reflow start");
                    return Ok(());
                }
            }
            Err(e) if is_quiet(&e) => debug!(attempt = attempts, "handshake read timed out"),
            Err(e) => {
                error!(%e, "serial read failed during handshake, stopping controller");
                if let Err(stop_err) = link.send(STOP_MSG) {
                    error!(%stop_err, "failed to send reflow stop command");
                }
                return Err(e.into());
            }
        }
        attempts += 1;
        if attempts >= max_attempts {
            println!("Did not receive response from microcontroller.");
            error!(attempts, "no start response, stopping controller");
            link.send(STOP_MSG)?;
            return Err(ReflowError::NoStartResponse { attempts });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflow_port::testing::ScriptedLink;

    const NOISE: &str = "\r\x1b[0;32mI (1.204) REFLOW: Reflow oven controller initialized.\r\n";

    #[test]
    fn succeeds_on_exact_response() {
        let mut link = ScriptedLink::new([NOISE, NOISE, START_RESPONSE, "after\n"]);
        start_reflow(&mut link, 20).unwrap();
        assert_eq!(link.sent, START_MSG);
        assert_eq!(link.lines.len(), 1, "reading stops at the confirmation");
    }

    #[test]
    fn near_miss_is_not_accepted() {
        let mut lines = vec!["Starting reflow process\r\n".to_string(); 19];
        lines.push("\x1b[0m\x1b[KStarting reflow process\n".to_string());
        let mut link = ScriptedLink::new(lines);
        let err = start_reflow(&mut link, 20).unwrap_err();
        assert!(matches!(err, ReflowError::NoStartResponse { attempts: 20 }));
    }

    #[test]
    fn sends_stop_after_twenty_misses() {
        let mut link = ScriptedLink::new(vec![NOISE; 25]);
        let err = start_reflow(&mut link, 20).unwrap_err();
        assert!(matches!(err, ReflowError::NoStartResponse { attempts: 20 }));
        assert!(link.sent_text().ends_with("reflow stop\n"));
        assert_eq!(link.lines.len(), 5);
    }

    #[test]
    fn response_on_the_last_attempt_still_counts() {
        let mut lines = vec![NOISE; 19];
        lines.push(START_RESPONSE);
        let mut link = ScriptedLink::new(lines);
        start_reflow(&mut link, 20).unwrap();
        assert_eq!(link.sent, START_MSG, "no stop command after a late confirmation");
    }

    #[test]
    fn silent_controller_counts_timeouts() {
        let mut link = ScriptedLink::default();
        let err = start_reflow(&mut link, 20).unwrap_err();
        assert!(matches!(err, ReflowError::NoStartResponse { attempts: 20 }));
        assert!(link.sent_text().ends_with(std::str::from_utf8(STOP_MSG).unwrap()));
    }

    #[test]
    fn read_failure_still_stops_controller() {
        let mut link = ScriptedLink::new([NOISE]);
        link.broken = true;
        let err = start_reflow(&mut link, 20).unwrap_err();
        assert!(matches!(err, ReflowError::Io(_)));
        assert!(link.sent_text().ends_with("reflow stop\n"));
    }
}
