use crate::sample::Sample;

/// Numeric columns that can be plotted against time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Setpoint,
    Measured,
    Proportional,
    Integral,
    Derivative,
    Pwm,
}

/// Captured run stored column-wise. Index `i` of every column belongs to the
/// same sample; [`History::push`] is the only way in, so all columns always
/// have the same length.
#[derive(Debug, Default, Clone)]
pub struct History {
    state: Vec<String>,
    time_s: Vec<f64>,
    setpoint: Vec<f64>,
    measured: Vec<f64>,
    proportional: Vec<f64>,
    integral: Vec<f64>,
    derivative: Vec<f64>,
    pwm: Vec<f64>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.state.push(sample.state);
        self.time_s.push(sample.time_s);
        self.setpoint.push(sample.setpoint);
        self.measured.push(sample.measured);
        self.proportional.push(sample.proportional);
        self.integral.push(sample.integral);
        self.derivative.push(sample.derivative);
        self.pwm.push(sample.pwm);
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Lengths of all eight columns, in CSV order.
    pub fn column_lens(&self) -> [usize; 8] {
        [
            self.state.len(),
            self.time_s.len(),
            self.proportional.len(),
            self.integral.len(),
            self.derivative.len(),
            self.pwm.len(),
            self.setpoint.len(),
            self.measured.len(),
        ]
    }

    pub fn states(&self) -> &[String] {
        &self.state
    }

    pub fn times(&self) -> &[f64] {
        &self.time_s
    }

    pub fn values(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Setpoint => &self.setpoint,
            Channel::Measured => &self.measured,
            Channel::Proportional => &self.proportional,
            Channel::Integral => &self.integral,
            Channel::Derivative => &self.derivative,
            Channel::Pwm => &self.pwm,
        }
    }

    /// `(time, value)` pairs for one channel, ready for a chart dataset.
    pub fn points(&self, channel: Channel) -> Vec<(f64, f64)> {
        self.time_s
            .iter()
            .copied()
            .zip(self.values(channel).iter().copied())
            .collect()
    }

    /// Elapsed time and phase name of the newest sample.
    pub fn latest(&self) -> Option<(f64, &str)> {
        let t = *self.time_s.last()?;
        let state = self.state.last()?;
        Some((t, state.as_str()))
    }

    pub fn sample(&self, i: usize) -> Option<Sample> {
        Some(Sample {
            state: self.state.get(i)?.clone(),
            time_s: *self.time_s.get(i)?,
            setpoint: *self.setpoint.get(i)?,
            measured: *self.measured.get(i)?,
            proportional: *self.proportional.get(i)?,
            integral: *self.integral.get(i)?,
            derivative: *self.derivative.get(i)?,
            pwm: *self.pwm.get(i)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(|i| self.sample(i))
    }
}
