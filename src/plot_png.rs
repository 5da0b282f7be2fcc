use crate::config::Config;
use crate::error::{ReflowError, ReflowResult};
use crate::history::{Channel, History};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const SIZE: (u32, u32) = (1200, 600);
const FOOTER_HEIGHT: u32 = 90;

/// A plotted channel: legend label, colour and its column in the history.
pub type Trace = (&'static str, RGBColor, Channel);

pub const PID_TRACES: [Trace; 4] = [
    ("P", YELLOW, Channel::Proportional),
    ("I", MAGENTA, Channel::Integral),
    ("D", CYAN, Channel::Derivative),
    ("PWM", BLUE, Channel::Pwm),
];

pub const TEMP_TRACES: [Trace; 2] = [
    ("Setpoint", RED, Channel::Setpoint),
    ("Measured", GREEN, Channel::Measured),
];

struct Panel<'a> {
    title: &'a str,
    y_desc: &'a str,
    y_limits: [f64; 2],
    y_step: f64,
    traces: &'a [Trace],
    legend: SeriesLabelPosition,
}

/// Render both charts of a finished run into a PNG at `path`.
pub fn save_plot(path: &Path, history: &History, cfg: &Config) -> ReflowResult<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    draw_run(&root, history, cfg).map_err(|e| ReflowError::Plot(e.to_string()))?;
    root.present().map_err(|e| ReflowError::Plot(e.to_string()))?;
    Ok(())
}

fn draw_run<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    history: &History,
    cfg: &Config,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let (body, footer) = root.split_vertically((SIZE.1 - FOOTER_HEIGHT) as i32);
    let (left, right) = body.split_horizontally((SIZE.0 / 2) as i32);

    draw_panel(
        &left,
        history,
        cfg.time_limits,
        &Panel {
            title: "Reflow Oven Controller",
            y_desc: "",
            y_limits: cfg.pid_limits,
            y_step: 1000.0,
            traces: &PID_TRACES,
            legend: SeriesLabelPosition::UpperMiddle,
        },
    )?;
    draw_panel(
        &right,
        history,
        cfg.time_limits,
        &Panel {
            title: "Oven Temperature",
            y_desc: "Temperature (°C)",
            y_limits: cfg.temp_limits,
            y_step: 50.0,
            traces: &TEMP_TRACES,
            legend: SeriesLabelPosition::UpperRight,
        },
    )?;

    let (time, state) = history.latest().unwrap_or((0.0, "NA"));
    let style = TextStyle::from(("sans-serif", 16).into_font());
    let x = (SIZE.0 / 2 + SIZE.0 / 3) as i32;
    footer.draw_text(&format!("Time: {time:.2} s"), &style, (x, 20))?;
    footer.draw_text(&format!("State: {state}"), &style, (x, 45))?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    history: &History,
    x_limits: [f64; 2],
    panel: &Panel<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let [y_lo, y_hi] = panel.y_limits;
    let mut chart = ChartBuilder::on(area)
        .caption(
            panel.title,
            ("sans-serif", 20).into_font().style(FontStyle::Bold),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_limits[0]..x_limits[1], y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(panel.y_desc)
        .y_labels(((y_hi - y_lo) / panel.y_step) as usize + 1)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let y_limits = panel.y_limits;
    for &(label, color, channel) in panel.traces {
        let runs = visible_runs(&history.points(channel), x_limits, y_limits);
        chart
            .draw_series(
                runs.into_iter()
                    .map(|run| PathElement::new(run, color.stroke_width(2))),
            )?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(panel.legend.clone())
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

/// Split a trace into stretches whose points all lie inside the chart.
/// Plotters pins out-of-range coordinates to the border, so anything
/// outside is dropped instead and the line breaks there.
fn visible_runs(
    points: &[(f64, f64)],
    x_limits: [f64; 2],
    y_limits: [f64; 2],
) -> Vec<Vec<(f64, f64)>> {
    let inside = |&(x, y): &(f64, f64)| {
        (x_limits[0]..=x_limits[1]).contains(&x) && (y_limits[0]..=y_limits[1]).contains(&y)
    };
    let mut runs = Vec::new();
    let mut run = Vec::new();
    for point in points {
        if inside(point) {
            run.push(*point);
        } else if !run.is_empty() {
            runs.push(std::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    fn history(measured: f64, integral: f64) -> History {
        let mut history = History::new();
        for i in 0..200 {
            history.push(Sample {
                state: "PEAK".into(),
                time_s: i as f64 * 2.0,
                setpoint: measured,
                measured,
                proportional: 100.0,
                integral,
                derivative: 0.0,
                pwm: 2000.0,
            });
        }
        history
    }

    fn render(history: &History) -> Vec<u8> {
        let mut buf = vec![0u8; (SIZE.0 * SIZE.1 * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, SIZE).into_drawing_area();
            draw_run(&root, history, &Config::default()).unwrap();
            root.present().unwrap();
        }
        buf
    }

    fn count(buf: &[u8], color: RGBColor) -> usize {
        buf.chunks(3)
            .filter(|px| *px == [color.0, color.1, color.2])
            .count()
    }

    #[test]
    fn runs_break_at_out_of_range_points() {
        let points = [
            (0.0, 10.0),
            (1.0, 20.0),
            (2.0, 1000.0),
            (3.0, 30.0),
            (500.0, 40.0),
            (4.0, -1.0),
        ];
        assert_eq!(
            visible_runs(&points, [0.0, 450.0], [0.0, 300.0]),
            vec![vec![(0.0, 10.0), (1.0, 20.0)], vec![(3.0, 30.0)]]
        );
        assert!(visible_runs(&[(1.0, 301.0)], [0.0, 450.0], [0.0, 300.0]).is_empty());
    }

    #[test]
    fn out_of_range_values_are_not_drawn_on_the_border() {
        let empty = render(&History::new());
        let clipped = render(&history(1000.0, 20000.0));
        let visible = render(&history(200.0, 2000.0));

        // Only the legend swatches carry the series colour.
        assert_eq!(count(&clipped, GREEN), count(&empty, GREEN));
        assert_eq!(count(&clipped, MAGENTA), count(&empty, MAGENTA));
        assert!(count(&visible, GREEN) > count(&empty, GREEN));
        assert!(count(&visible, MAGENTA) > count(&empty, MAGENTA));
    }

    #[test]
    fn saves_a_1200_by_600_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_ctrl.png");
        save_plot(&path, &history(180.0, 1500.0), &Config::default()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&bytes[12..16], b"IHDR");
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!((width, height), SIZE);
    }

    #[test]
    fn trace_sets_cover_every_channel_once() {
        let channels: Vec<Channel> = PID_TRACES
            .iter()
            .chain(TEMP_TRACES.iter())
            .map(|t| t.2)
            .collect();
        assert_eq!(channels.len(), 6);
        for channel in [
            Channel::Setpoint,
            Channel::Measured,
            Channel::Proportional,
            Channel::Integral,
            Channel::Derivative,
            Channel::Pwm,
        ] {
            assert_eq!(channels.iter().filter(|&&c| c == channel).count(), 1);
        }
    }
}
