use crate::error::ReflowResult;
use crate::history::History;
use std::io::Write;

pub const CSV_HEADER: [&str; 9] = [
    "State",
    "Time (s)",
    "P",
    "I",
    "D",
    "PWM/4095",
    "Set point (°C)",
    "Measured (°C)",
    "Sample Period (s)",
];

/// Write the captured run. The first data row also carries the sample period
/// in the ninth column; all later rows have eight columns.
pub fn write_history<W: Write>(
    out: W,
    history: &History,
    sample_period_secs: f64,
) -> ReflowResult<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for (i, s) in history.iter().enumerate() {
        let mut row = vec![
            s.state,
            float(s.time_s),
            float(s.proportional),
            float(s.integral),
            float(s.derivative),
            float(s.pwm),
            float(s.setpoint),
            float(s.measured),
        ];
        if i == 0 {
            row.push(float(sample_period_secs));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Floats always keep a fractional part (`150.0`, not `150`).
fn float(v: f64) -> String {
    format!("{v:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    fn history(n: usize) -> History {
        let mut h = History::new();
        for i in 0..n {
            h.push(Sample {
                state: "RAMPUP".into(),
                time_s: i as f64 * 0.5,
                setpoint: 200.0,
                measured: 198.5,
                proportional: 150.0,
                integral: 1200.25,
                derivative: -4.0,
                pwm: 1346.25,
            });
        }
        h
    }

    #[test]
    fn first_row_carries_sample_period() {
        let mut out = Vec::new();
        write_history(&mut out, &history(3), 0.5).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<Vec<&str>> = text.lines().map(|l| l.split(',').collect()).collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].len(), 9);
        assert_eq!(rows[0][6], "Set point (°C)");
        assert_eq!(rows[1].len(), 9);
        assert_eq!(rows[1][8], "0.5");
        assert_eq!(rows[2].len(), 8);
        assert_eq!(rows[3].len(), 8);
        assert_eq!(
            rows[2],
            ["RAMPUP", "0.5", "150.0", "1200.25", "-4.0", "1346.25", "200.0", "198.5"]
        );
        assert_eq!(rows[1][1], "0.0");
    }

    #[test]
    fn empty_run_writes_only_header() {
        let mut out = Vec::new();
        write_history(&mut out, &History::new(), 0.5).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
