//! Command-line interface for the tomography pipeline.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::loaders::Quantity;
use crate::session::{FigureLayout, Session};
use crate::visualization::selection::parse_vertices;
use crate::TomographyConfig;

#[derive(Parser)]
#[command(name = "ert-tomo")]
#[command(about = "Electrical resistivity tomography plotting", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Quantity selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QuantityArg {
    Resistivity,
    Conductivity,
    Both,
}

impl QuantityArg {
    fn quantities(self) -> Vec<Quantity> {
        match self {
            QuantityArg::Resistivity => vec![Quantity::Resistivity],
            QuantityArg::Conductivity => vec![Quantity::Conductivity],
            QuantityArg::Both => Quantity::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Interpolate a survey file and save tomography figures (PNG)
    Plot {
        /// Survey file (distance depth resistivity conductivity per line)
        file: PathBuf,
        /// Quantity to plot
        #[arg(short, long, value_enum, default_value_t = QuantityArg::Both)]
        quantity: QuantityArg,
        /// Write one figure per quantity instead of a stacked figure
        #[arg(long)]
        split: bool,
        /// Output directory for figures
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Grid nodes per axis
        #[arg(short, long)]
        resolution: Option<usize>,
        /// Selection polygon as "x,y;x,y;x,y" (repeatable)
        #[arg(long = "polygon")]
        polygons: Vec<String>,
        /// Skip titles, axis labels and tick labels
        #[arg(long)]
        no_annotate: bool,
    },

    /// Print the loaded survey as a table
    Table {
        /// Survey file
        file: PathBuf,
    },

    /// Export an interpolated grid as CSV
    ExportGrid {
        /// Survey file
        file: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Quantity to export
        #[arg(short, long, value_enum, default_value_t = QuantityArg::Resistivity)]
        quantity: QuantityArg,
        /// Grid nodes per axis
        #[arg(short, long)]
        resolution: Option<usize>,
    },

    /// Print or write the default configuration
    Config {
        /// Write the YAML to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Width of the summary box values column, in characters
const SUMMARY_VALUE_WIDTH: usize = 38;

/// Render a summary box
fn format_summary(title: &str, items: &[(&str, String)]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 4);
    lines.push("╔══════════════════════════════════════════════════════════════╗".to_string());
    lines.push(format!("║ {:<60} ║", title));
    lines.push("╠══════════════════════════════════════════════════════════════╣".to_string());
    for (key, value) in items {
        let display_value = if value.chars().count() > SUMMARY_VALUE_WIDTH {
            let head: String = value.chars().take(SUMMARY_VALUE_WIDTH - 3).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        lines.push(format!(
            "║ {:<20}: {:<w$} ║",
            key,
            display_value,
            w = SUMMARY_VALUE_WIDTH
        ));
    }
    lines.push("╚══════════════════════════════════════════════════════════════╝".to_string());
    lines.join("\n")
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("{}", format_summary(title, items));
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match TomographyConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {:#}, using defaults",
                    path.display(),
                    e
                );
                TomographyConfig::default()
            }
        },
        None => TomographyConfig::default(),
    };

    match cli.command {
        Commands::Plot {
            file,
            quantity,
            split,
            output_dir,
            resolution,
            polygons,
            no_annotate,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            if let Some(n) = resolution {
                config.grid.resolution = n;
            }
            if no_annotate {
                config.plot.annotate = false;
            }
            let layout = if split {
                FigureLayout::Split
            } else {
                FigureLayout::Combined
            };
            cmd_plot(&file, &quantity.quantities(), layout, &polygons, config);
        }
        Commands::Table { file } => cmd_table(&file, config),
        Commands::ExportGrid {
            file,
            output,
            quantity,
            resolution,
        } => {
            let mut config = config;
            if let Some(n) = resolution {
                config.grid.resolution = n;
            }
            cmd_export_grid(&file, &output, &quantity.quantities(), config);
        }
        Commands::Config { output } => cmd_config(output.as_deref(), &config),
    }
}

fn open_or_exit(session: &mut Session, file: &Path) {
    if let Err(e) = session.open(file) {
        error!("Could not open {}: {}", file.display(), e);
        std::process::exit(1);
    }
}

fn cmd_plot(
    file: &Path,
    quantities: &[Quantity],
    layout: FigureLayout,
    polygons: &[String],
    config: TomographyConfig,
) {
    let start = Instant::now();

    println!("Plotting tomography...");
    println!("Input: {}", file.display());
    println!("Output directory: {}", config.output.directory.display());
    println!("Grid resolution: {}", config.grid.resolution);

    let mut session = Session::new(config);
    open_or_exit(&mut session, file);

    let mut committed = 0;
    for text in polygons {
        match parse_vertices(text) {
            Ok(vertices) => {
                for &q in quantities {
                    if session.commit_selection(q, vertices.clone()) {
                        committed += 1;
                    }
                }
            }
            Err(e) => warn!("Ignoring polygon '{}': {}", text, e),
        }
    }

    let spinner = create_spinner("Interpolating and rendering...");

    match session.plot_figures(quantities, layout) {
        Ok(written) => {
            spinner.finish_and_clear();

            let samples = session.samples().map_or(0, |s| s.len());
            let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
            let labels: Vec<&str> = quantities.iter().map(|q| q.label()).collect();

            print_summary(
                "Tomography Plot Complete",
                &[
                    ("Input file", file.display().to_string()),
                    ("Samples", samples.to_string()),
                    ("Quantities", labels.join(", ")),
                    ("Selections", committed.to_string()),
                    ("Output files", files.join(", ")),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Plotting failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_table(file: &Path, config: TomographyConfig) {
    let mut session = Session::new(config);
    open_or_exit(&mut session, file);

    match session.table() {
        Ok(table) => print!("{}", table),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_export_grid(file: &Path, output: &Path, quantities: &[Quantity], config: TomographyConfig) {
    let start = Instant::now();
    let resolution = config.grid.resolution;

    let mut session = Session::new(config);
    open_or_exit(&mut session, file);

    // `both` exports one file per quantity next to the requested path.
    let targets: Vec<(Quantity, PathBuf)> = if quantities.len() == 1 {
        vec![(quantities[0], output.to_path_buf())]
    } else {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "grid".to_string());
        quantities
            .iter()
            .map(|&q| (q, output.with_file_name(format!("{}_{}.csv", stem, q.key()))))
            .collect()
    };

    let spinner = create_spinner("Interpolating grid...");

    for (q, path) in &targets {
        if let Err(e) = session.export_grid(*q, path) {
            spinner.finish_and_clear();
            error!("Grid export failed: {}", e);
            std::process::exit(1);
        }
    }
    spinner.finish_and_clear();

    let files: Vec<String> = targets.iter().map(|(_, p)| p.display().to_string()).collect();
    print_summary(
        "Grid Export Complete",
        &[
            ("Input file", file.display().to_string()),
            ("Output files", files.join(", ")),
            ("Nodes per axis", resolution.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_config(output: Option<&Path>, config: &TomographyConfig) {
    let result = match output {
        Some(path) => config.to_yaml(path).map(|_| {
            println!("Config written to {}", path.display());
        }),
        None => config.to_yaml_string().map(|yaml| print!("{}", yaml)),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plot_arguments() {
        let cli = Cli::try_parse_from([
            "ert-tomo",
            "-v",
            "plot",
            "survey.dat",
            "--quantity",
            "conductivity",
            "--split",
            "--polygon",
            "0,0;1,0;0,1",
            "--polygon",
            "2,2;3,2;3,3",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Plot {
                quantity,
                split,
                polygons,
                no_annotate,
                ..
            } => {
                assert_eq!(quantity.quantities(), vec![Quantity::Conductivity]);
                assert!(split);
                assert_eq!(polygons.len(), 2);
                assert!(!no_annotate);
            }
            _ => panic!("expected plot command"),
        }
    }

    #[test]
    fn test_summary_box_aligned() {
        let summary = format_summary(
            "Tomography Plot Complete",
            &[
                ("Input file", "survey.dat".to_string()),
                ("Output files", "x".repeat(80)),
                ("Exact fit", "y".repeat(SUMMARY_VALUE_WIDTH)),
            ],
        );
        let widths: Vec<usize> = summary.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 7);
        assert!(widths.iter().all(|&w| w == 64), "{:?}", widths);
        assert!(summary.contains("..."));
    }

    #[test]
    fn test_quantity_defaults() {
        let cli = Cli::try_parse_from(["ert-tomo", "export-grid", "a.dat", "b.csv"]).unwrap();
        match cli.command {
            Commands::ExportGrid { quantity, .. } => {
                assert_eq!(quantity, QuantityArg::Resistivity)
            }
            _ => panic!("expected export-grid command"),
        }
        assert_eq!(QuantityArg::Both.quantities(), Quantity::ALL.to_vec());
    }
}
