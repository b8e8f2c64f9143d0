//! Command-line parsing for the viral kinetics explorer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! filtering/fitting code. `app` turns these structs into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cohort::DEFAULT_MAX_SUBJECTS;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "vkx", version, about = "Viral Kinetics Explorer: filter, plot and fit viral-load trajectories")]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Write logs to rotating files in this directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize and filter a dataset, then plot a sample of trajectories.
    Explore(ExploreArgs),
    /// Fit the piecewise-linear kinetics model to one subject.
    Fit(FitArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
    /// Write a synthetic demo cohort as CSV.
    Synth(SynthArgs),
    /// Launch the interactive TUI.
    ///
    /// Filters set here are the starting point; they can be changed in the UI.
    Tui(DataArgs),
}

/// Data source and filter options shared by every data-driven command.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Input CSV. Falls back to `VKX_DATA_PATH`, then `data/combined_cleaned_data.csv`,
    /// then an interactive picker.
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Keep age groups ending at or after this age.
    #[arg(long)]
    pub age_min: Option<f64>,

    /// Keep age groups starting at or before this age.
    #[arg(long)]
    pub age_max: Option<f64>,

    /// Keep only this study (repeatable). Default: every study.
    #[arg(long = "study", value_name = "ID")]
    pub studies: Vec<String>,

    /// Keep only this sample type (repeatable). Default: every sample type.
    #[arg(long = "sample-type", value_name = "TYPE")]
    pub sample_types: Vec<String>,

    /// Maximum subjects drawn in the trajectory overlay.
    #[arg(long, default_value_t = DEFAULT_MAX_SUBJECTS)]
    pub max_subjects: usize,
}

/// Plot and figure options.
#[derive(Debug, Args, Clone)]
pub struct PlotOpts {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Also save the figure as SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Use the dark figure theme for `--svg`.
    #[arg(long)]
    pub dark: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub plot: PlotOpts,

    /// Rows shown in the filtered-data preview.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub plot: PlotOpts,

    /// Subject (`PersonID`) to fit.
    #[arg(long, value_name = "ID")]
    pub subject: String,

    /// Exit with status 5 when the fit fails.
    #[arg(long)]
    pub strict: bool,

    /// Export per-observation fitted values and residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted curve (params + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Curve JSON file produced by `vkx fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of subjects.
    #[arg(long, default_value_t = 60)]
    pub subjects: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Measurement noise (standard deviation, log10 units).
    #[arg(long, default_value_t = 0.25)]
    pub noise: f64,

    /// Include GE/ml conversion columns.
    #[arg(long)]
    pub ge_conversion: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeatable_filters_and_globals_parse() {
        let cli = Cli::try_parse_from([
            "vkx",
            "explore",
            "-f",
            "data.csv",
            "--study",
            "S1",
            "--study",
            "S2",
            "--sample-type",
            "Nasal",
            "--age-min",
            "18",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        let Command::Explore(args) = cli.command else {
            panic!("expected explore");
        };
        assert_eq!(args.data.studies, vec!["S1", "S2"]);
        assert_eq!(args.data.sample_types, vec!["Nasal"]);
        assert_eq!(args.data.age_min, Some(18.0));
        assert_eq!(args.data.max_subjects, DEFAULT_MAX_SUBJECTS);
        assert_eq!(args.rows, 20);
    }

    #[test]
    fn fit_requires_subject() {
        assert!(Cli::try_parse_from(["vkx", "fit", "-f", "data.csv"]).is_err());
        let cli = Cli::try_parse_from(["vkx", "fit", "--subject", "P1", "--strict"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.subject, "P1");
        assert!(args.strict);
    }
}
