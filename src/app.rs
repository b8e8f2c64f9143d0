//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - starts logging
//! - resolves the input CSV
//! - runs explore/fit through `pipeline`
//! - prints reports/plots and writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, warn};

use crate::cli::picker::{prompt_for_csv_path, validate_csv_path};
use crate::cli::{Cli, Command, DataArgs, ExploreArgs, FitArgs, PlotArgs, PlotOpts, SynthArgs};
use crate::data::{SynthConfig, generate_cohort, write_cohort_csv};
use crate::domain::{FilterSelection, RunConfig};
use crate::error::AppError;
use crate::io::{build_curve_file, load_dataset, read_curve_json, write_curve_json, write_fit_csv};
use crate::logging::{LogTarget, init_logging};
use crate::plot::{FigureStyle, export_fit_svg, export_overlay_svg, render_curve_plot, render_fit_plot, render_overlay_plot};
use crate::report::{format_curve_summary, format_dataset_summary, format_fit_report, format_preview};

pub mod pipeline;

/// Environment variable naming the default input CSV.
pub const DATA_PATH_ENV: &str = "VKX_DATA_PATH";
/// Dataset used when neither `-f` nor `VKX_DATA_PATH` is given.
pub const DEFAULT_DATA_PATH: &str = "data/combined_cleaned_data.csv";

/// Entry point for the `vkx` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `vkx` and `vkx -f data.csv` behave like `vkx tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    init_logging(&cli.log_level, &LogTarget::for_command(interactive, cli.log_dir.as_deref()))?;

    match cli.command {
        Command::Explore(args) => handle_explore(args),
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Synth(args) => handle_synth(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_explore(args: ExploreArgs) -> Result<(), AppError> {
    let mut config = base_config(&args.data, &args.plot)?;
    config.preview_rows = args.rows;

    let dataset = load_dataset(&config.data_path)?;
    let ex = pipeline::explore(&dataset, &config.selection, config.max_subjects)?;

    println!("{}", format_dataset_summary(&dataset, &ex.spec, ex.rows.len(), &ex.overlay));
    println!("{}", format_preview(&ex.rows, config.preview_rows));

    if config.plot {
        println!("{}", render_overlay_plot(&ex.overlay, config.plot_width, config.plot_height));
    }
    if let Some(path) = &config.export_svg {
        export_overlay_svg(path, &ex.overlay, &FigureStyle::for_mode(config.dark_mode))?;
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config(args)?;

    let dataset = load_dataset(&config.data_path)?;
    let ex = pipeline::explore(&dataset, &config.selection, config.max_subjects)?;
    let subject = config.subject.as_deref().unwrap_or_default();
    let fitted = pipeline::fit_subject(&ex.rows, subject)?;

    println!("{}", format_fit_report(&fitted.subject, &fitted.observations, &fitted.result));
    if config.plot {
        println!(
            "{}",
            render_fit_plot(&fitted.observations, fitted.params(), config.plot_width, config.plot_height)
        );
    }
    if let Some(path) = &config.export_svg {
        export_fit_svg(
            path,
            &fitted.subject,
            &fitted.observations,
            fitted.params(),
            &FigureStyle::for_mode(config.dark_mode),
        )?;
    }

    match &fitted.result {
        Ok(outcome) => {
            if let Some(path) = &config.export_fit {
                write_fit_csv(path, &fitted.subject, &fitted.observations, &outcome.params)?;
            }
            if let Some(path) = &config.export_curve {
                let curve = build_curve_file(&fitted.subject, outcome, &fitted.observations);
                write_curve_json(path, &curve)?;
            }
            Ok(())
        }
        Err(err) => {
            if config.export_fit.is_some() || config.export_curve.is_some() {
                warn!("fit failed; skipping exports");
            }
            if config.strict {
                return Err(err.clone().into());
            }
            Ok(())
        }
    }
}

fn fit_config(args: FitArgs) -> Result<RunConfig, AppError> {
    let mut config = base_config(&args.data, &args.plot)?;
    config.subject = Some(args.subject);
    config.strict = args.strict;
    config.export_fit = args.export;
    config.export_curve = args.export_curve;
    Ok(config)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = read_curve_json(&args.curve)?;
    println!("{}", format_curve_summary(&curve));
    println!("{}", render_curve_plot(&curve, args.width, args.height));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        subjects: args.subjects,
        seed: args.seed,
        noise_sd: args.noise,
        ge_conversion: args.ge_conversion,
        ..SynthConfig::default()
    };
    let records = generate_cohort(&config)?;
    write_cohort_csv(&args.output, &records, config.ge_conversion)?;
    println!(
        "Wrote {} rows for {} subjects to {}",
        records.len(),
        config.subjects,
        args.output.display()
    );
    Ok(())
}

fn handle_tui(args: DataArgs) -> Result<(), AppError> {
    // Resolve the path (and run the picker) before the terminal enters raw mode.
    let data_path = resolve_data_path(args.file.as_deref())?;
    let dataset = load_dataset(&data_path)?;
    crate::tui::run(dataset, selection_from_args(&args), args.max_subjects)
}

/// Settings shared by `explore` and `fit`.
fn base_config(data: &DataArgs, plot: &PlotOpts) -> Result<RunConfig, AppError> {
    if data.max_subjects == 0 {
        return Err(AppError::input("--max-subjects must be at least 1."));
    }
    Ok(RunConfig {
        data_path: resolve_data_path(data.file.as_deref())?,
        selection: selection_from_args(data),
        max_subjects: data.max_subjects,
        preview_rows: 20,
        subject: None,
        strict: false,
        plot: !plot.no_plot,
        plot_width: plot.width,
        plot_height: plot.height,
        export_svg: plot.svg.clone(),
        dark_mode: plot.dark,
        export_curve: None,
        export_fit: None,
    })
}

pub fn selection_from_args(data: &DataArgs) -> FilterSelection {
    FilterSelection {
        age_min: data.age_min,
        age_max: data.age_max,
        studies: data.studies.clone(),
        sample_types: data.sample_types.clone(),
    }
}

/// Input CSV: `-f`, then `VKX_DATA_PATH`, then the default dataset, then the picker.
pub fn resolve_data_path(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    let env_value = std::env::var(DATA_PATH_ENV).ok();
    match candidate_data_path(explicit, env_value.as_deref(), Path::new(DEFAULT_DATA_PATH)) {
        Some(path) => {
            debug!("data path: {}", path.display());
            validate_csv_path(&path)
        }
        None => prompt_for_csv_path(),
    }
}

fn candidate_data_path(explicit: Option<&Path>, env_value: Option<&str>, default: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(v) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(v));
    }
    default.is_file().then(|| default.to_path_buf())
}

/// Rewrite argv so `vkx` defaults to `vkx tui`.
///
/// Rules:
/// - `vkx`                      -> `vkx tui`
/// - `vkx -f data.csv ...`      -> `vkx tui -f data.csv ...`
/// - `vkx --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "explore" | "fit" | "plot" | "synth" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_and_leading_flags_open_the_tui() {
        assert_eq!(rewrite_args(args(&["vkx"])), args(&["vkx", "tui"]));
        assert_eq!(
            rewrite_args(args(&["vkx", "-f", "x.csv"])),
            args(&["vkx", "tui", "-f", "x.csv"])
        );
        assert_eq!(rewrite_args(args(&["vkx", "--help"])), args(&["vkx", "--help"]));
        assert_eq!(
            rewrite_args(args(&["vkx", "fit", "--subject", "P1"])),
            args(&["vkx", "fit", "--subject", "P1"])
        );
    }

    #[test]
    fn data_path_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("combined_cleaned_data.csv");
        let explicit = Path::new("mine.csv");

        assert_eq!(
            candidate_data_path(Some(explicit), Some("env.csv"), &default),
            Some(PathBuf::from("mine.csv"))
        );
        assert_eq!(
            candidate_data_path(None, Some(" env.csv "), &default),
            Some(PathBuf::from("env.csv"))
        );
        assert_eq!(candidate_data_path(None, Some(""), &default), None);

        std::fs::write(&default, "PersonID,TimeDays,Log10VL\n").unwrap();
        assert_eq!(candidate_data_path(None, None, &default), Some(default.clone()));
    }

    #[test]
    fn run_config_carries_filters_and_plot_options() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("d.csv");
        std::fs::write(&csv, "PersonID,TimeDays,Log10VL\n").unwrap();

        let data = DataArgs {
            file: Some(csv.clone()),
            age_min: Some(18.0),
            age_max: None,
            studies: vec!["S1".to_string()],
            sample_types: Vec::new(),
            max_subjects: 10,
        };
        let plot = PlotOpts {
            no_plot: true,
            width: 80,
            height: 20,
            svg: None,
            dark: true,
        };

        let config = base_config(&data, &plot).unwrap();
        assert_eq!(config.data_path, csv);
        assert_eq!(config.selection.age_min, Some(18.0));
        assert_eq!(config.selection.studies, vec!["S1"]);
        assert!(!config.plot);
        assert!(config.dark_mode);

        let zero = DataArgs { max_subjects: 0, ..data.clone() };
        assert!(base_config(&zero, &plot).is_err());

        let fit = FitArgs {
            data,
            plot,
            subject: "P7".to_string(),
            strict: true,
            export: None,
            export_curve: Some(PathBuf::from("curve.json")),
        };
        let config = fit_config(fit).unwrap();
        assert_eq!(config.subject.as_deref(), Some("P7"));
        assert!(config.strict);
        assert_eq!(config.export_curve, Some(PathBuf::from("curve.json")));
    }
}
