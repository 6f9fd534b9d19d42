use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use montearea::api::{DatasetSource, load_countries};
use montearea::config::AppConfig;
use montearea::dataset::CountryDataset;
use montearea::domain::CountryBoundary;
use montearea::geometry::{BoundingBox, Polygon, ProjectionProvider};
use montearea::report::summary::{render_bounding_box, render_geographic_extent};
use montearea::report::{format_thousands, plot_title, render_results, write_preview_svg, write_svg};
use montearea::simulation::{
    ErrorReport, MAX_POINTS, MIN_POINTS, MonteCarloEstimator, SimulationResult, evaluate,
    validate_point_count,
};

const DEFAULT_POINTS: u64 = 100_000;

/// Estimate the area of a country with the Monte Carlo method
///
/// Points are drawn uniformly in the bounding box of the projected country
/// boundary; the share that falls inside, times the box area, estimates
/// the country's area.
///
/// Examples:
///   # Interactive menu of the configured countries
///   montearea
///
///   # One-shot run with a plot
///   montearea -c Paraguay -n 1000000 --plot paraguay.svg
///
///   # Offline, from a local Natural Earth GeoJSON file
///   montearea --dataset ne_110m_admin_0_countries.geojson -c Chile
#[derive(Parser, Debug)]
#[command(name = "montearea")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches montearea.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Country to simulate; skips the interactive menu
    #[arg(short = 'c', long)]
    country: Option<String>,

    /// Number of random points
    #[arg(
        short = 'n',
        long,
        value_parser = clap::value_parser!(u64).range(MIN_POINTS..=MAX_POINTS)
    )]
    points: Option<u64>,

    /// Local GeoJSON file with country boundaries instead of downloading
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Download the dataset again even if a cached copy exists
    #[arg(long)]
    refresh: bool,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Spread sampling across all CPU cores
    #[arg(long)]
    parallel: bool,

    /// Write an SVG plot of the result to this file
    /// (in the menu, one file per country: `<stem>_<country>.svg`)
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Write an SVG preview of the boundary in degrees, before projection
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Everything a run needs, loaded once at startup
struct Session {
    config: AppConfig,
    dataset: CountryDataset,
    provider: ProjectionProvider,
    estimator: MonteCarloEstimator,
    parallel: bool,
    seed: Option<u64>,
}

impl Session {
    /// Command-line flags take precedence over the config file
    fn new(config: AppConfig, dataset: CountryDataset, args: &Args) -> Self {
        Self {
            provider: ProjectionProvider::new(
                config.projection.primary.clone(),
                config.projection.fallback.clone(),
            ),
            estimator: MonteCarloEstimator::new(config.simulation.estimator_config()),
            parallel: args.parallel || config.simulation.parallel,
            seed: args.seed.or(config.simulation.seed),
            dataset,
            config,
        }
    }
}

/// A country projected to meters, ready to sample
struct Prepared<'a> {
    boundary: &'a CountryBoundary,
    polygon: Polygon,
    bbox: BoundingBox,
}

struct Outcome {
    result: SimulationResult,
    report: ErrorReport,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match args.config {
        Some(ref path) => AppConfig::from_file(path)?,
        None => AppConfig::load(),
    };

    println!("montearea - Monte Carlo Area Calculator");
    println!("=======================================");
    println!();

    let spinner = create_spinner("Loading country boundaries...");
    let start = Instant::now();
    let loaded = load_countries(&config.dataset, args.dataset.as_deref(), args.refresh);
    let (dataset, source) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            spinner.abandon_with_message("Dataset unavailable");
            return Err(e.context("Dataset unavailable, cannot continue without boundaries"));
        }
    };
    let origin = match source {
        DatasetSource::Download => "downloaded".to_string(),
        DatasetSource::Cache(path) => format!("cached at {}", path.display()),
        DatasetSource::File(path) => format!("from {}", path.display()),
    };
    spinner.finish_with_message(format!(
        "Loaded {} country boundaries ({}) [{:.1}s]",
        dataset.len(),
        origin,
        start.elapsed().as_secs_f32()
    ));

    let session = Session::new(config, dataset, &args);

    if args.verbose {
        println!("Configuration:");
        println!("  Primary projection: {}", session.config.projection.primary);
        println!("  Fallback projection: {}", session.config.projection.fallback);
        println!(
            "  Sample caps: {} inside / {} outside",
            session.config.simulation.inside_cap, session.config.simulation.outside_cap
        );
        println!("  Parallel: {}", if session.parallel { "yes" } else { "no" });
        if let Some(seed) = session.seed {
            println!("  Seed: {}", seed);
        }
        println!();
    }

    match args.country {
        Some(ref country) => {
            let points = validate_point_count(args.points.unwrap_or(DEFAULT_POINTS))?;
            let boundary = session.dataset.get(country)?;
            show_boundary(boundary);
            if let Some(ref path) = args.preview {
                save_preview(path, boundary);
            }
            let prepared = prepare_country(&session, boundary)?;
            let outcome = run_simulation(&session, &prepared, points)?;
            if let Some(ref path) = args.plot {
                save_plot(path, &prepared, &outcome)?;
            }
            Ok(())
        }
        None => interactive(&session, &args, &mut io::stdin().lock()),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn show_boundary(boundary: &CountryBoundary) {
    println!();
    println!("Country: {} ({} parts)", boundary.name, boundary.part_count());
    if let Some(extent) = boundary.extent() {
        print!("{}", render_geographic_extent(&extent));
    }
}

/// Preview failures are reported and otherwise ignored
fn save_preview(path: &Path, boundary: &CountryBoundary) {
    match write_preview_svg(path, boundary) {
        Ok(()) => println!("Preview written to {}", path.display()),
        Err(e) => println!("Could not write preview: {:#}", e),
    }
}

/// Project the boundary and print its bounding box
fn prepare_country<'a>(session: &Session, boundary: &'a CountryBoundary) -> Result<Prepared<'a>> {
    let spinner = create_spinner("Projecting boundary...");
    let geographic = boundary
        .to_polygon()
        .with_context(|| format!("Invalid boundary geometry for {}", boundary.name))?;
    let projected = session.provider.project(&geographic)?;
    let bbox = projected
        .polygon
        .bounding_box()
        .with_context(|| format!("Boundary of {} has no area after projection", boundary.name))?;
    if projected.used_fallback {
        spinner.finish_with_message(format!(
            "Primary projection unavailable, using {} ({})",
            projected.projection_id, projected.description
        ));
    } else {
        spinner.finish_with_message(format!(
            "Projected with {} ({}), {} vertices",
            projected.projection_id,
            projected.description,
            projected.polygon.vertex_count()
        ));
    }
    if !projected.equal_area {
        println!(
            "Note: {} does not preserve area exactly; expect a small bias",
            projected.projection_id
        );
    }
    print!("{}", render_bounding_box(&bbox));

    Ok(Prepared {
        boundary,
        polygon: projected.polygon,
        bbox,
    })
}

/// Run the estimator on a prepared country and print the results
fn run_simulation(session: &Session, prepared: &Prepared, points: u64) -> Result<Outcome> {
    println!();
    println!(
        "Running Monte Carlo simulation with {} points...",
        format_thousands(points as f64, 0)
    );
    let progress = create_progress_bar(points);
    let observer = |done: u64, _total: u64| progress.set_position(done);

    let polygon = &prepared.polygon;
    let bbox = &prepared.bbox;
    let result = if session.parallel {
        session
            .estimator
            .run_parallel(polygon, bbox, points, session.seed, Some(&observer))?
    } else {
        let mut rng = match session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        session
            .estimator
            .run(polygon, bbox, points, &mut rng, Some(&observer))?
    };
    progress.finish_with_message(format!(
        "Simulation finished [{:.2}s]",
        result.elapsed().as_secs_f64()
    ));

    let name = &prepared.boundary.name;
    let report = evaluate(
        result.estimated_area_km2(),
        session.config.reference_area_km2(name),
    );
    println!();
    print!("{}", render_results(name, &result, &report));

    Ok(Outcome { result, report })
}

fn save_plot(path: &Path, prepared: &Prepared, outcome: &Outcome) -> Result<()> {
    let title = plot_title(&prepared.boundary.name, &outcome.result, &outcome.report);
    write_svg(path, &prepared.polygon, &outcome.result, &title).context("Failed to write plot")?;
    println!("Plot written to {}", path.display());
    Ok(())
}

fn interactive<R: BufRead>(session: &Session, args: &Args, input: &mut R) -> Result<()> {
    loop {
        print_menu(&session.config);

        let Some(choice) = prompt(input, "\nEnter the country number (0 to exit): ")? else {
            break;
        };
        if choice == "0" {
            break;
        }
        let index = match choice.parse::<usize>() {
            Ok(i) if (1..=session.config.countries.len()).contains(&i) => i - 1,
            Ok(_) => {
                println!("Invalid option. Please choose a number from the menu.");
                continue;
            }
            Err(_) => {
                println!("Please enter a valid number.");
                continue;
            }
        };
        let country = &session.config.countries[index].name;

        let boundary = match session.dataset.get(country) {
            Ok(boundary) => boundary,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        show_boundary(boundary);
        let preview_path = match args.preview {
            Some(ref path) => Some(country_path(path, country)),
            None if confirm(input, "\nSave a geographic preview? (y/n): ")? => {
                Some(PathBuf::from(format!("{}_preview.svg", slug(country))))
            }
            None => None,
        };
        if let Some(path) = preview_path {
            save_preview(&path, boundary);
        }

        // Projection and bounding box come before the point count prompt
        let prepared = match prepare_country(session, boundary) {
            Ok(prepared) => prepared,
            Err(e) => {
                println!("Could not prepare {}: {:#}", country, e);
                continue;
            }
        };

        let points = match args.points {
            Some(points) => points,
            None => match prompt_points(input)? {
                Some(points) => points,
                None => break,
            },
        };

        let outcome = match run_simulation(session, &prepared, points) {
            Ok(outcome) => outcome,
            Err(e) => {
                println!("Could not simulate {}: {:#}", country, e);
                continue;
            }
        };

        let plot_path = match args.plot {
            Some(ref path) => Some(country_path(path, country)),
            None if confirm(input, "\nSave a plot of the result? (y/n): ")? => {
                Some(PathBuf::from(format!("{}.svg", slug(country))))
            }
            None => None,
        };
        if let Some(path) = plot_path
            && let Err(e) = save_plot(&path, &prepared, &outcome)
        {
            println!("{:#}", e);
        }

        if !confirm(input, "\nCalculate another country? (y/n): ")? {
            break;
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Lowercase file-name fragment for a country
fn slug(country: &str) -> String {
    country
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// `dir/plot.svg` becomes `dir/plot_<country>.svg`
fn country_path(path: &Path, country: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plot".to_string());
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "svg".to_string());
    path.with_file_name(format!("{}_{}.{}", stem, slug(country), extension))
}

fn print_menu(config: &AppConfig) {
    let rule = "=".repeat(60);
    println!();
    println!("{}", rule);
    println!("  AREA CALCULATOR - MONTE CARLO METHOD");
    println!("{}", rule);
    println!();
    for (i, entry) in config.countries.iter().enumerate() {
        let area = entry
            .reference_area_km2
            .filter(|a| *a > 0.0)
            .map(|a| format!("{} km²", format_thousands(a, 0)))
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {:2}. {:20} (reference area: {:>16})", i + 1, entry.name, area);
    }
    println!();
    println!("   0. Exit");
    println!("{}", "-".repeat(60));
}

fn prompt_points<R: BufRead>(input: &mut R) -> Result<Option<u64>> {
    println!();
    println!("Suggested point counts:");
    println!("  10,000     quick test (seconds)");
    println!("  100,000    good precision");
    println!("  1,000,000  high precision (longer)");

    loop {
        let Some(line) = prompt(input, "\nNumber of points to generate: ")? else {
            return Ok(None);
        };
        match parse_point_count(&line) {
            Ok(points) => return Ok(Some(points)),
            Err(message) => println!("{}", message),
        }
    }
}

/// Parse a point count typed by a user; `,`, `.` and `_` group separators are allowed
fn parse_point_count(input: &str) -> std::result::Result<u64, String> {
    let digits: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '_'))
        .collect();
    let count: u64 = digits
        .parse()
        .map_err(|_| "Please enter a valid number.".to_string())?;
    validate_point_count(count).map_err(|e| e.to_string())
}

fn prompt<R: BufRead>(input: &mut R, message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm<R: BufRead>(input: &mut R, message: &str) -> Result<bool> {
    Ok(prompt(input, message)?
        .map(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí"))
        .unwrap_or(false))
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use montearea::dataset::parse_countries;
    use std::ffi::OsStr;

    const SQUARELAND: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"NAME": "Squareland"},
         "geometry": {"type": "Polygon", "coordinates":
            [[[-61.0, -33.0], [-60.0, -33.0], [-60.0, -32.0], [-61.0, -32.0], [-61.0, -33.0]]]}}
    ]}"#;

    fn session(args: &Args) -> Session {
        let config = AppConfig::from_toml(
            "[[countries]]\nname = \"Squareland\"\nreference_area_km2 = 10300\n",
        )
        .unwrap();
        let dataset = parse_countries(SQUARELAND, "NAME").unwrap();
        Session::new(config, dataset, args)
    }

    #[test]
    fn test_country_path() {
        assert_eq!(
            country_path(Path::new("out/plot.svg"), "Costa Rica"),
            PathBuf::from("out/plot_costa_rica.svg")
        );
        assert_eq!(
            country_path(Path::new("result"), "Peru"),
            PathBuf::from("result_peru.svg")
        );
        assert_eq!(slug(" Bosnia and Herz. "), "bosnia_and_herz_");
    }

    #[test]
    fn test_menu_writes_one_plot_per_country() {
        let dir = tempfile::tempdir().unwrap();
        let plot = dir.path().join("plot.svg");
        let preview = dir.path().join("preview.svg");
        let args = Args::parse_from([
            OsStr::new("montearea"),
            OsStr::new("--seed"),
            OsStr::new("1"),
            OsStr::new("--plot"),
            plot.as_os_str(),
            OsStr::new("--preview"),
            preview.as_os_str(),
        ]);
        let session = session(&args);

        // country, point count, another country?
        let mut input = io::Cursor::new("1\n500\nn\n");
        interactive(&session, &args, &mut input).unwrap();

        assert!(dir.path().join("plot_squareland.svg").exists());
        assert!(dir.path().join("preview_squareland.svg").exists());
        assert!(!plot.exists());
    }

    #[test]
    fn test_menu_survives_plot_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let plot = dir.path().join("missing").join("plot.svg");
        let args = Args::parse_from([
            OsStr::new("montearea"),
            OsStr::new("-n"),
            OsStr::new("500"),
            OsStr::new("--plot"),
            plot.as_os_str(),
        ]);
        let session = session(&args);

        // Two rounds: country, preview?, another country?
        let mut input = io::Cursor::new("1\nn\ny\n1\nn\nn\n");
        interactive(&session, &args, &mut input).unwrap();

        // Both prompts were answered, so the loop ran twice and consumed everything
        assert_eq!(input.position() as usize, input.get_ref().len());
    }

    #[test]
    fn test_menu_asks_points_after_projection() {
        let args = Args::parse_from(["montearea", "--seed", "3"]);
        let session = session(&args);

        // country, preview?, bad point count, good point count, plot?, another?
        let mut input = io::Cursor::new("1\nn\n50\n500\nn\nn\n");
        interactive(&session, &args, &mut input).unwrap();
        assert_eq!(input.position() as usize, input.get_ref().len());
    }

    #[test]
    fn test_parse_point_count() {
        assert_eq!(parse_point_count("100000"), Ok(100_000));
        assert_eq!(parse_point_count(" 1,000,000 "), Ok(1_000_000));
        assert_eq!(parse_point_count("10.000"), Ok(10_000));
        assert!(parse_point_count("99").is_err());
        assert!(parse_point_count("20,000,000").is_err());
        assert!(parse_point_count("lots").is_err());
        assert!(parse_point_count("").is_err());
    }

    #[test]
    fn test_prompt_reads_until_eof() {
        let mut input = io::Cursor::new("  3 \n");
        assert_eq!(prompt(&mut input, "").unwrap(), Some("3".to_string()));
        assert_eq!(prompt(&mut input, "").unwrap(), None);
    }

    #[test]
    fn test_prompt_points_reprompts() {
        let mut input = io::Cursor::new("12\nabc\n250,000\n");
        assert_eq!(prompt_points(&mut input).unwrap(), Some(250_000));

        let mut input = io::Cursor::new("5\n");
        assert_eq!(prompt_points(&mut input).unwrap(), None);
    }

    #[test]
    fn test_confirm() {
        assert!(confirm(&mut io::Cursor::new("Yes\n"), "").unwrap());
        assert!(confirm(&mut io::Cursor::new("s\n"), "").unwrap());
        assert!(!confirm(&mut io::Cursor::new("n\n"), "").unwrap());
        assert!(!confirm(&mut io::Cursor::new(""), "").unwrap());
    }
}
