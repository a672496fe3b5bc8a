//! geoseries CLI - time-series filtering, trend tests and polygon rasterization

mod json;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoseries_algorithms::statistics::{
    mann_kendall_significance_with_progress, mann_kendall_statistics, MannKendallParams,
    SignificanceRule,
};
use geoseries_algorithms::timeseries::{timesat_filter_with_progress, TimesatParams};
use geoseries_algorithms::vector::{polygon_to_raster_with_progress, PolygonRasterParams};
use geoseries_core::{Domain, GeoReference, ItemDomain, Progress};

use json::{
    read_json, write_json, FeatureDocument, RasterDocument, RasterizationDocument, StackDocument,
    TrendStatisticsDocument,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geoseries")]
#[command(author, version, about = "Raster time-series and polygon processing", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster stack
    Info {
        /// Input stack (JSON)
        input: PathBuf,
    },
    /// Iterative Savitzky-Golay (TIMESAT) filtering of every pixel profile
    Timesat {
        /// Input stack (JSON)
        input: PathBuf,
        /// Output stack (JSON)
        output: PathBuf,
        /// Number of fitting iterations (2-5)
        #[arg(short, long)]
        iterations: Option<usize>,
        /// Force fitted values up to valid observations
        #[arg(long)]
        upper_envelope: bool,
        /// Do not force the upper envelope on the last iteration
        #[arg(long)]
        fit_last_iteration: bool,
        /// Do not pad profiles before fitting
        #[arg(long)]
        no_extend: bool,
        /// Parameter file (JSON); flags given on the command line take precedence
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Mann-Kendall trend significance per pixel
    MannKendall {
        /// Input stack (JSON)
        input: PathBuf,
        /// Output raster (JSON)
        output: PathBuf,
        /// Significance level
        #[arg(short, long)]
        alpha: Option<f64>,
        /// Rule turning the probability into a class
        #[arg(long, value_enum)]
        rule: Option<RuleArg>,
        /// Output class names, comma separated (index 0 = not significant)
        #[arg(long, default_value = "not significant,significant")]
        items: String,
        /// Write S, varS, Z and probability rasters instead of classes
        #[arg(long)]
        statistics: bool,
        /// Parameter file (JSON); flags given on the command line take precedence
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Rasterize polygon features onto a target grid
    #[command(name = "polygon2raster")]
    PolygonToRaster {
        /// Input features (JSON)
        features: PathBuf,
        /// Target georeference (JSON)
        georef: PathBuf,
        /// Output raster and attribute table (JSON)
        output: PathBuf,
        /// Name of the key column added to the attribute table
        #[arg(long)]
        key_column: Option<String>,
        /// Parameter file (JSON); flags given on the command line take precedence
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    PositiveProbability,
    TwoSided,
}

impl From<RuleArg> for SignificanceRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::PositiveProbability => SignificanceRule::PositiveProbability,
            RuleArg::TwoSided => SignificanceRule::TwoSided,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Progress sink drawing an indicatif bar
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg:>18} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn update(&self, n: u64) {
        self.bar.inc(n);
    }

    fn inform(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }
}

fn read_stack(path: &Path) -> Result<geoseries_core::RasterStack<f64>> {
    let pb = spinner("Reading stack...");
    let doc: StackDocument = read_json(path)?;
    let stack = doc.into_stack().context("Invalid stack")?;
    pb.finish_and_clear();
    let (bands, rows, cols) = stack.shape();
    info!("Input: {} bands of {} x {}", bands, cols, rows);
    Ok(stack)
}

fn write_output<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_json(value, path)?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_items(s: &str) -> Result<Domain> {
    let items: Vec<&str> = s.split(',').map(str::trim).collect();
    if items.len() < 2 || items.iter().any(|i| i.is_empty()) {
        anyhow::bail!("Need two non-empty class names, got: {}", s);
    }
    Ok(Domain::Item(ItemDomain::new(items)))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let stack = read_stack(&input)?;
            let (bands, rows, cols) = stack.shape();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} x {} bands ({} cells)", cols, rows, bands, stack.len());
            let t = stack.transform();
            println!("Origin: ({:.6}, {:.6})", t.origin_x, t.origin_y);
            println!("Pixel size: {} x {}", t.pixel_width, t.pixel_height);
            if let Some(crs) = stack.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nPer-band statistics:");
            for b in 0..bands {
                let stats = stack.band(b)?.statistics();
                let fmt = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.4}", v));
                println!(
                    "  {:>3}: min {} max {} mean {} valid {}/{}",
                    b,
                    fmt(stats.min),
                    fmt(stats.max),
                    fmt(stats.mean),
                    stats.valid_count,
                    rows * cols
                );
            }
        }

        Commands::Timesat {
            input,
            output,
            iterations,
            upper_envelope,
            fit_last_iteration,
            no_extend,
            params,
        } => {
            let mut p: TimesatParams = match params {
                Some(path) => read_json(&path)?,
                None => TimesatParams::default(),
            };
            if let Some(n) = iterations {
                p.iterations = n;
            }
            p.upper_envelope |= upper_envelope;
            p.fit_last_iteration |= fit_last_iteration;
            if no_extend {
                p.extend_window = false;
            }

            let stack = read_stack(&input)?;
            let start = Instant::now();
            let progress = BarProgress::new();
            progress.inform("Filtering");
            let result = timesat_filter_with_progress(&stack, &p, &progress)
                .context("Failed to filter time series")?;
            progress.finish();
            let elapsed = start.elapsed();
            write_output(&StackDocument::from_stack(&result), &output)?;
            done("Filtered stack", &output, elapsed);
        }

        Commands::MannKendall {
            input,
            output,
            alpha,
            rule,
            items,
            statistics,
            params,
        } => {
            let stack = read_stack(&input)?;
            let start = Instant::now();

            if statistics {
                let result = mann_kendall_statistics(&stack)
                    .context("Failed to compute trend statistics")?;
                let elapsed = start.elapsed();
                let doc = TrendStatisticsDocument {
                    s: RasterDocument::from_raster(&result.s),
                    var_s: RasterDocument::from_raster(&result.var_s),
                    z: RasterDocument::from_raster(&result.z),
                    probability: RasterDocument::from_raster(&result.probability),
                };
                write_output(&doc, &output)?;
                done("Trend statistics", &output, elapsed);
                return Ok(());
            }

            let mut p: MannKendallParams = match params {
                Some(path) => read_json(&path)?,
                None => MannKendallParams::default(),
            };
            if let Some(a) = alpha {
                p.significance_level = a;
            }
            if let Some(r) = rule {
                p.rule = r.into();
            }
            let domain = parse_items(&items)?;

            let progress = BarProgress::new();
            progress.inform("Testing");
            let result = mann_kendall_significance_with_progress(&stack, &domain, &p, &progress)
                .context("Failed to test trend significance")?;
            progress.finish();
            let elapsed = start.elapsed();
            write_output(&RasterDocument::from_raster(&result), &output)?;
            done("Significance", &output, elapsed);
        }

        Commands::PolygonToRaster {
            features,
            georef,
            output,
            key_column,
            params,
        } => {
            let pb = spinner("Reading features...");
            let doc: FeatureDocument = read_json(&features)?;
            let collection = doc.into_collection()?;
            let grid: GeoReference = read_json(&georef)?;
            pb.finish_and_clear();
            info!("Input: {} features onto {} x {}", collection.len(), grid.cols, grid.rows);

            let mut p: PolygonRasterParams = match params {
                Some(path) => read_json(&path)?,
                None => PolygonRasterParams::default(),
            };
            if let Some(name) = key_column {
                p.key_column = name;
            }

            let start = Instant::now();
            let progress = BarProgress::new();
            let result = polygon_to_raster_with_progress(&collection, &grid, &p, &progress)
                .context("Failed to rasterize polygons")?;
            progress.finish();
            let elapsed = start.elapsed();
            let doc = RasterizationDocument {
                raster: RasterDocument::from_raster(&result.raster),
                attributes: result.attributes,
                key_map: result.key_map,
            };
            write_output(&doc, &output)?;
            done("Polygon raster", &output, elapsed);
        }
    }

    Ok(())
}
