use crate::acquire::Session;
use crate::config::{Config, STOP_MSG};
use crate::csv_utils;
use crate::error::ReflowResult;
use crate::plot_png;
use crate::reflow_port::LineLink;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// `dir/name_N.ext` for `dir/name.ext`.
pub fn with_suffix(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    path.with_file_name(name)
}

/// First free path for the plot and the version number it got.
/// Version 0 is the canonical path itself.
pub fn versioned_plot_path(canonical: &Path) -> (PathBuf, u32) {
    if !canonical.is_file() {
        return (canonical.to_path_buf(), 0);
    }
    let mut n = 1;
    while with_suffix(canonical, n).is_file() {
        n += 1;
    }
    (with_suffix(canonical, n), n)
}

/// CSV path for a run whose plot got `plot_version`. The CSV follows the
/// plot's number instead of checking its own collisions; a plot that needed
/// no suffix still sends a colliding CSV to `_1`.
pub fn csv_path_for(canonical: &Path, plot_version: u32) -> PathBuf {
    if canonical.is_file() {
        with_suffix(canonical, plot_version.max(1))
    } else {
        canonical.to_path_buf()
    }
}

/// Where a finished run ended up. `plot_path` is `None` when the plot
/// could not be written; the CSV is written regardless.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRun {
    pub plot_path: Option<PathBuf>,
    pub csv_path: PathBuf,
    pub version: u32,
}

/// Command the heater off, whatever state the run is in.
pub fn stop_controller(link: &mut dyn LineLink) {
    match link.pending_input() {
        Ok(n) => println!("Number of bytes remaining in rx buffer: {n}"),
        Err(e) => error!(%e, "could not query rx buffer"),
    }
    println!("Closing serial connection.");
    if let Err(e) = link.send(STOP_MSG) {
        error!(%e, "failed to send reflow stop command");
    }
}

/// Stop the controller, close the link and write the plot and CSV.
///
/// The stop command is always attempted first; a failure to send it is
/// logged and the captured data is still saved.
pub fn shutdown<L: LineLink>(session: Session<L>, cfg: &Config) -> ReflowResult<SavedRun> {
    let Session {
        mut link, history, ..
    } = session;

    stop_controller(&mut link);
    info!(port = %link.name(), samples = history.len(), "closing serial connection");
    drop(link);

    let (plot_path, version) = versioned_plot_path(&cfg.plot_path);
    let rendered = ensure_parent(&plot_path)
        .and_then(|()| plot_png::save_plot(&plot_path, &history, cfg));
    let plot_path = match rendered {
        Ok(()) => {
            info!(path = %plot_path.display(), version, "plot saved");
            Some(plot_path)
        }
        Err(e) => {
            println!("Could not save plot: {e}");
            error!(path = %plot_path.display(), %e, "plot not saved");
            None
        }
    };

    ensure_parent(&cfg.csv_path)?;
    let csv_path = csv_path_for(&cfg.csv_path, version);
    let file = BufWriter::new(File::create(&csv_path)?);
    csv_utils::write_history(file, &history, cfg.sample_period_secs())?;
    info!(path = %csv_path.display(), rows = history.len(), "csv saved");

    match &plot_path {
        Some(plot) => println!(
            "Plot and csv file saved at {} and {} respectively.",
            plot.display(),
            csv_path.display()
        ),
        None => println!("Csv file saved at {}.", csv_path.display()),
    }
    Ok(SavedRun {
        plot_path,
        csv_path,
        version,
    })
}

fn ensure_parent(path: &Path) -> ReflowResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
