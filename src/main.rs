//! ECG Plot - command line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use ecg_plot::{AppConfig, EcgApp, RunOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ecg-plot", version)]
#[command(about = "Unpack 12-lead ECG data, merge beat annotations and plot a time window")]
struct Args {
    /// Raw ECG sample files, read in order
    #[arg(short = 'i', long = "inputfile", num_args = 1.., default_values = ["1/Hour1UnpackedData.csv"])]
    filenames: Vec<PathBuf>,

    /// Output HTML chart
    #[arg(short = 'o', long = "outputfile", default_value = "test.html")]
    outputfile: PathBuf,

    /// Beat annotation (QT) files
    #[arg(short = 'q', long = "qtfile", num_args = 1.., default_values = ["1/1QT1.csv"])]
    qtnames: Vec<PathBuf>,

    /// Verbosity level (-1 = warnings only, 0 = progress, 1 = details, 2 = trace)
    #[arg(short = 'v', long = "verbose", default_value_t = 0, allow_negative_numbers = true)]
    verbose: i8,

    /// TOML file with sampling rates, plot window and panel size
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Plot window start (s)
    #[arg(long)]
    start: Option<f64>,

    /// Plot window end (s)
    #[arg(long)]
    end: Option<f64>,

    /// Directory for the CSV exports
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Also render the panels to a PNG image
    #[arg(long)]
    png: Option<PathBuf>,

    /// Open the HTML chart with the system viewer when done
    #[arg(long)]
    open: bool,
}

impl Args {
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_toml_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(start) = self.start {
            config.window_start_s = start;
        }
        if let Some(end) = self.end {
            config.window_end_s = end;
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = dir.clone();
        }
        Ok(config)
    }
}

fn default_level(verbose: i8) -> &'static str {
    match verbose {
        i8::MIN..=-1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: i8) {
    let default_level = default_level(verbose);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.app_config().context("Failed to build configuration")?;
    let mut app = EcgApp::new(config)?;

    let options = RunOptions {
        signal_files: args.filenames.clone(),
        annotation_files: args.qtnames.clone(),
        output_html: args.outputfile.clone(),
        output_png: args.png.clone(),
    };

    let report = app.run(&options).context("ECG plot run failed")?;
    info!(
        "Exported {} signal rows and {} annotations",
        report.signal_rows, report.annotation_rows
    );

    if args.open {
        open::that(&report.html)
            .with_context(|| format!("Failed to open {}", report.html.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ecg-plot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_point_at_first_recording() {
        let args = parse(&[]);
        assert_eq!(args.filenames, vec![PathBuf::from("1/Hour1UnpackedData.csv")]);
        assert_eq!(args.qtnames, vec![PathBuf::from("1/1QT1.csv")]);
        assert_eq!(args.outputfile, PathBuf::from("test.html"));
        assert_eq!(args.verbose, 0);
        assert!(args.config.is_none());
        assert!(!args.open);
        assert_eq!(args.app_config().unwrap(), AppConfig::default());
    }

    #[test]
    fn input_and_annotation_flags_take_several_files() {
        let args = parse(&["-i", "a.csv", "b.csv", "-q", "qa.csv", "qb.csv", "-o", "out.html"]);
        assert_eq!(
            args.filenames,
            vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]
        );
        assert_eq!(
            args.qtnames,
            vec![PathBuf::from("qa.csv"), PathBuf::from("qb.csv")]
        );
        assert_eq!(args.outputfile, PathBuf::from("out.html"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "data_sampling_hz = 500.0\nwindow_start_s = 10.0\nwindow_end_s = 20.0\nexport_dir = \"from_file\"\n",
        )
        .unwrap();
        let config_path = path.to_str().unwrap();

        let args = parse(&["-c", config_path]);
        let config = args.app_config().unwrap();
        assert_eq!(config.data_sampling_hz, 500.0);
        assert_eq!(config.window_start_s, 10.0);
        assert_eq!(config.export_dir, PathBuf::from("from_file"));

        let args = parse(&[
            "-c",
            config_path,
            "--start",
            "12.5",
            "--end",
            "14",
            "--export-dir",
            "exports",
        ]);
        let config = args.app_config().unwrap();
        assert_eq!(config.data_sampling_hz, 500.0);
        assert_eq!(config.window_start_s, 12.5);
        assert_eq!(config.window_end_s, 14.0);
        assert_eq!(config.export_dir, PathBuf::from("exports"));
    }

    #[test]
    fn overridden_window_is_still_validated() {
        let args = parse(&["--start", "30", "--end", "20"]);
        let config = args.app_config().unwrap();
        assert!(EcgApp::new(config).is_err());
    }

    #[test]
    fn negative_verbosity_keeps_warnings_only() {
        assert_eq!(parse(&["-v", "-1"]).verbose, -1);
        assert_eq!(default_level(-1), "warn");
        assert_eq!(default_level(0), "info");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(5), "trace");
    }
}
