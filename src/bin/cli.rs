//! trailcast CLI - commute extraction and location prediction
//!
//! Usage:
//!   trailcast-cli commutes <input> [--output <file>] [--config <json>]
//!   trailcast-cli predict <input> [--timestamp T --lat LAT --lng LNG [--accuracy A]]
//!
//! `commutes` writes the validated HOME->WORK->HOME points of every day as
//! `lat,lng` lines. `predict` builds a nearest-neighbor model over the input
//! and reports where the entity tended to be an hour after moments similar
//! to the query.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use trailcast::{
    CoordinateLookup, LoadOptions, NeighborModel, PipelineConfig, Ping, PredictorConfig,
    VenueLookup, describe_point,
    export::commutes_to_file,
    loader::{DEFAULT_LIMIT, load_points_from_path},
};

/// Query point used when none is given on the command line.
const DEFAULT_QUERY: (i64, f64, f64, i32) = (1_431_002_436, 41.0029563, -74.0784164, 30);

#[derive(Parser)]
#[command(name = "trailcast-cli")]
#[command(about = "Commute extraction and location prediction over GPS ping trails", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and validate daily commutes
    Commutes {
        /// Tab-separated ping file
        input: PathBuf,

        /// Output file for `lat,lng` lines
        #[arg(short, long, default_value = "commutes.txt")]
        output: PathBuf,

        /// JSON file with anchors and validation thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Predict a future location from similar past moments
    Predict {
        /// Tab-separated ping file
        input: PathBuf,

        /// Query time (Unix seconds)
        #[arg(long, requires_all = ["lat", "lng"])]
        timestamp: Option<i64>,

        /// Query latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Query longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,

        /// Query accuracy in meters
        #[arg(long)]
        accuracy: Option<i32>,

        /// Stop loading after this many distinct timestamps
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Extrapolation horizon in seconds [default: from config, else 3600]
        #[arg(long, allow_hyphen_values = true)]
        horizon: Option<i64>,

        /// Number of neighbors [default: from config, else 10]
        #[arg(short)]
        k: Option<usize>,

        /// Also report the trail up to the horizon for each neighbor
        #[arg(long)]
        future_trail: bool,

        /// Foursquare OAuth token for venue names (requires `http` feature)
        #[arg(long, env = "FOURSQUARE_TOKEN")]
        token: Option<String>,

        /// Print the prediction report as JSON
        #[arg(long)]
        json: bool,

        /// JSON file with predictor settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Commutes {
            input,
            output,
            config,
        } => run_commutes(&input, &output, config.as_deref()),
        Commands::Predict {
            input,
            timestamp,
            lat,
            lng,
            accuracy,
            limit,
            horizon,
            k,
            future_trail,
            token,
            json,
            config,
        } => {
            let query = match (timestamp, lat, lng) {
                (Some(t), Some(la), Some(ln)) => Ping::new(t, la, ln, accuracy),
                _ => {
                    let (t, la, ln, acc) = DEFAULT_QUERY;
                    Ping::new(t, la, ln, Some(acc))
                }
            };
            let options = PredictOptions {
                limit,
                horizon,
                k,
                future_trail,
                json,
            };
            run_predict(&input, query, &options, token, config.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run commute extraction
fn run_commutes(input: &Path, output: &Path, config: Option<&Path>) -> trailcast::Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    println!("\n{}", "=".repeat(60));
    println!("COMMUTE EXTRACTION");
    println!("{}", "=".repeat(60));
    println!("  Input:  {}", input.display());
    println!("  Output: {}", output.display());
    println!(
        "  Home: ({:.6}, {:.6})  Work: ({:.6}, {:.6})  Slack: {}",
        config.commute.home.latitude,
        config.commute.home.longitude,
        config.commute.work.latitude,
        config.commute.work.longitude,
        config.commute.slack
    );

    let report = commutes_to_file(input, output, &config)?;

    println!("\n{}", "-".repeat(60));
    println!("  Lines read:         {}", report.load.lines_read);
    println!("  Duplicates dropped: {}", report.load.duplicates_dropped);
    println!("  Malformed lines:    {}", report.load.malformed_skipped);
    println!("  Trails:             {}", report.trails);
    if let Some(extent) = report.extent {
        let center = extent.center();
        println!(
            "  Extent:             lat {:.4}..{:.4}, lng {:.4}..{:.4} (center {:.4}, {:.4})",
            extent.min_lat,
            extent.max_lat,
            extent.min_lng,
            extent.max_lng,
            center.latitude,
            center.longitude
        );
    }
    println!("  Commute days:       {}", report.commute_days);
    println!("  Excluded days:      {}", report.excluded_days);
    println!("  Points written:     {}", report.points_written);
    if report.points_written > 0 {
        println!(
            "  Mean commute:       {:.1} min, {:.2} km",
            report.mean_commute_seconds / 60.0,
            report.mean_commute_meters / 1000.0
        );
    }
    Ok(())
}

struct PredictOptions {
    limit: usize,
    horizon: Option<i64>,
    k: Option<usize>,
    future_trail: bool,
    json: bool,
}

fn venue_lookup(token: Option<String>) -> trailcast::Result<Box<dyn VenueLookup>> {
    match token {
        #[cfg(feature = "http")]
        Some(token) => Ok(Box::new(trailcast::FoursquareLookup::new(token)?)),
        #[cfg(not(feature = "http"))]
        Some(_) => {
            log::warn!("Built without `http` feature; ignoring venue token");
            Ok(Box::new(CoordinateLookup))
        }
        None => Ok(Box::new(CoordinateLookup)),
    }
}

/// Run prediction
fn run_predict(
    input: &Path,
    query: Ping,
    options: &PredictOptions,
    token: Option<String>,
    config: Option<&Path>,
) -> trailcast::Result<()> {
    let predictor_config = match config {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            serde_json::from_reader::<_, PredictorConfig>(std::io::BufReader::new(file))?
        }
        None => PredictorConfig::default(),
    }
    .with_overrides(options.k, options.horizon);
    let horizon = predictor_config.horizon_seconds;

    let lookup = venue_lookup(token)?;

    let (points, stats) = load_points_from_path(
        input,
        &LoadOptions {
            limit: Some(options.limit),
        },
    )?;
    log::info!(
        "Loaded {} points ({} duplicates dropped)",
        points.len(),
        stats.duplicates_dropped
    );

    let model = NeighborModel::build(points, predictor_config)?;
    let predictions = model.predict_default(&query);

    if options.json {
        let json = serde_json::to_string_pretty(&predictions)?;
        println!("{}", json);
        return Ok(());
    }

    let encoder = model.encoder();
    println!(
        "Testing point: {}",
        describe_point(&query, lookup.as_ref(), encoder)?
    );

    for prediction in &predictions {
        println!(
            "\t=> {}",
            describe_point(&prediction.ping, lookup.as_ref(), encoder)?
        );
        match &prediction.future {
            Some(future) => println!(
                "\t  In {} you'll be at {}",
                horizon_phrase(horizon),
                describe_point(&future.ping, lookup.as_ref(), encoder)?
            ),
            None => println!("\t  No data {} later", horizon_phrase(horizon)),
        }
        if options.future_trail {
            let trail = model.future_trail(prediction.neighbor.index, horizon)?;
            println!("\t  Trail up to horizon: {} points", trail.len());
        }
    }

    Ok(())
}

fn horizon_phrase(seconds: i64) -> String {
    match seconds {
        3600 => "an hour".to_string(),
        s if s % 3600 == 0 => format!("{} hours", s / 3600),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}
