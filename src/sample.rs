use thiserror::Error;

/// Token index of the reflow phase name in a REFLOW log line.
const STATE_FIELD: usize = 3;
const VALUE_FIELDS: usize = 6;
const MIN_FIELDS: usize = STATE_FIELD + 1 + VALUE_FIELDS;

/// One controller report, stamped with the time it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub state: String,
    pub time_s: f64, // seconds since capture start
    pub setpoint: f64,
    pub measured: f64,
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub pwm: f64, // 0..4095
}

/// Fields of a log line before a receive time is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub state: String,
    pub values: [f64; VALUE_FIELDS],
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected at least 10 fields, got {0}")]
    TooFewFields(usize),

    #[error("field {index} is not a number: {token:?}")]
    BadNumber { index: usize, token: String },
}

/// Parse a REFLOW log line such as
/// `I (12.345) REFLOW: PREHEAT 150.00 148.20 355.10 12.00 -3.50 363.60`.
///
/// Values come in the order setpoint, measured, P, I, D, PWM.
pub fn parse_line(line: &str) -> Result<Reading, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields(words.len()));
    }
    let mut values = [0.0; VALUE_FIELDS];
    for (i, value) in values.iter_mut().enumerate() {
        let index = STATE_FIELD + 1 + i;
        let token = words[index];
        *value = token.parse().map_err(|_| ParseError::BadNumber {
            index,
            token: token.to_string(),
        })?;
    }
    Ok(Reading {
        state: words[STATE_FIELD].to_string(),
        values,
    })
}

impl Reading {
    pub fn at(self, time_s: f64) -> Sample {
        let [setpoint, measured, proportional, integral, derivative, pwm] = self.values;
        Sample {
            state: self.state,
            time_s,
            setpoint,
            measured,
            proportional,
            integral,
            derivative,
            pwm,
        }
    }
}
