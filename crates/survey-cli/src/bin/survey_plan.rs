//! Plan a coverage flight over the area enclosing a set of points.
//!
//! The first point is the take-off and landing point.
//!
//! Usage:
//!   cargo run -p survey-cli --bin survey-plan -- --points area.json --velocity 60 --minutes 45

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use survey_cli::{load_points, SurveyClient};
use survey_core::PathPlanRequest;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan a coverage flight over a detected area")]
struct Args {
    /// Survey server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// JSON file with the input points
    #[arg(long)]
    points: Option<PathBuf>,

    /// Extra input point as LAT,LON (repeatable)
    #[arg(long = "point")]
    point: Vec<String>,

    /// Cruise speed in km/h
    #[arg(long, default_value_t = 60.0)]
    velocity: f64,

    /// Flight time budget in minutes
    #[arg(long, default_value_t = 60.0)]
    minutes: f64,

    /// Sensor footprint radius in meters
    #[arg(long)]
    scan_radius: Option<f64>,

    /// Maximum bank angle in degrees
    #[arg(long)]
    max_bank: Option<f64>,

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let points = load_points(args.points.as_deref(), &args.point)?;
    let client = SurveyClient::new(args.url);

    let request = PathPlanRequest {
        points,
        velocity_kmh: args.velocity,
        travel_time_min: args.minutes,
        scan_radius_m: args.scan_radius,
        max_bank_angle_deg: args.max_bank,
        ..PathPlanRequest::default()
    };

    println!("Planning coverage flight ({} km/h, {} min)...", args.velocity, args.minutes);
    let response = client.plan_path(&request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.ok {
        println!("Waypoints: {} ({} before smoothing)", response.path.len(), response.raw_path.len());
        println!("Candidates: {}", response.candidates);
        println!("Length: {:.0} m", response.length_m);
        println!("Travel time: {:.1} min", response.travel_time_min);
        println!("Max bank angle: {:.1} deg", response.max_bank_angle_deg);
        for warning in &response.warnings {
            println!("Warning: {}", warning);
        }
    }

    if !response.ok {
        anyhow::bail!("Path planning failed: {}", response.errors.join("; "));
    }
    Ok(())
}
