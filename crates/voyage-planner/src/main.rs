//! Voyage Planner - sea routes, multi-stop sequencing and speed profiles

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_core::vessel::DEFAULT_VESSEL_TYPE;
use voyage_core::{ArrivalWindow, GeoPoint, MultiStopRequest, PortConditions, Priorities, SpeedRequest};
use voyage_planner::{Config, VoyagePlanner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan sea routes and voyage speeds")]
struct Cli {
    /// Ignore provider URLs from the environment
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route between two points, priced for a vessel
    Route(RouteArgs),
    /// Order and price a multi-stop voyage from a JSON request file
    MultiStop {
        /// Path to a JSON multi-stop request
        #[arg(long)]
        input: PathBuf,
    },
    /// Route between two points with recommended speeds
    Speeds(SpeedArgs),
}

#[derive(Args, Debug)]
struct RouteArgs {
    #[arg(long, allow_negative_numbers = true)]
    from_lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    from_lon: f64,

    #[arg(long, allow_negative_numbers = true)]
    to_lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    to_lon: f64,

    #[arg(long, default_value = DEFAULT_VESSEL_TYPE)]
    vessel_type: String,
}

#[derive(Args, Debug)]
struct SpeedArgs {
    #[command(flatten)]
    route: RouteArgs,

    /// Fuel economy priority (0-100)
    #[arg(long, default_value_t = 50.0)]
    fuel_priority: f64,

    /// Schedule priority (0-100)
    #[arg(long, default_value_t = 50.0)]
    time_priority: f64,

    /// Departure time (RFC 3339), defaults to now
    #[arg(long)]
    departure: Option<DateTime<Utc>>,

    /// Earliest acceptable arrival (RFC 3339)
    #[arg(long, requires = "latest")]
    earliest: Option<DateTime<Utc>>,

    /// Latest acceptable arrival (RFC 3339)
    #[arg(long, requires = "earliest")]
    latest: Option<DateTime<Utc>>,

    /// Preferred arrival inside the window (RFC 3339)
    #[arg(long)]
    preferred: Option<DateTime<Utc>>,

    /// Time the berth becomes available (RFC 3339)
    #[arg(long)]
    berth_available_at: Option<DateTime<Utc>>,
}

impl RouteArgs {
    fn endpoints(&self) -> (GeoPoint, GeoPoint) {
        (
            GeoPoint::new(self.from_lat, self.from_lon),
            GeoPoint::new(self.to_lat, self.to_lon),
        )
    }
}

impl SpeedArgs {
    fn request(&self) -> SpeedRequest {
        let arrival_window = match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) => Some(ArrivalWindow {
                earliest,
                latest,
                preferred: self.preferred,
            }),
            _ => None,
        };
        SpeedRequest {
            vessel_type: self.route.vessel_type.clone(),
            priorities: Priorities::new(self.fuel_priority, self.time_priority),
            arrival_window,
            port_conditions: self.berth_available_at.map(|at| PortConditions {
                berth_available_at: Some(at),
            }),
            departure: self.departure.unwrap_or_else(Utc::now),
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("voyage_planner=info".parse()?)
            .add_directive("voyage_core=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = if cli.offline {
        Config::offline()
    } else {
        Config::from_env()
    };
    if !config.searoute_enabled() {
        tracing::info!("No sea-route provider configured, routing locally");
    }
    let planner = VoyagePlanner::new(&config);

    match cli.command {
        Command::Route(args) => {
            let (from, to) = args.endpoints();
            let route = planner.plan_route(from, to, &args.vessel_type).await?;
            tracing::info!(
                "Route {:.1} nm via {} waypoints ({:?})",
                route.total_distance_nm,
                route.waypoints.len(),
                route.source
            );
            print_json(&route)
        }
        Command::MultiStop { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let request: MultiStopRequest = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", input.display()))?;
            let result = planner.optimize_multi_stop(&request).await?;
            print_json(&result)
        }
        Command::Speeds(args) => {
            let (from, to) = args.route.endpoints();
            let route = planner.plan_route(from, to, &args.route.vessel_type).await?;
            let optimization = planner.optimize_speeds(&route, &args.request()).await;
            print_json(&optimization)
        }
    }
}
