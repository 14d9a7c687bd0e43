//! Detect the survey area enclosing a set of points.
//!
//! Usage:
//!   cargo run -p survey-cli --bin survey-detect -- --point 54.1377,18.6413 --point 54.139,18.643

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use survey_cli::{load_points, SurveyClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect the area enclosing a set of points")]
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

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let points = load_points(args.points.as_deref(), &args.point)?;
    let client = SurveyClient::new(args.url);

    println!("Detecting area around {} points...", points.len());
    let response = client.detect_area(points).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.ok {
        println!("Boundary: {} vertices", response.boundary.len());
        println!("Obstacles: {}", response.obstacles.len());
        if let Some(stats) = response.stats {
            println!(
                "Seeds: {}, filled pixels: {}, tiles: {}",
                stats.seeds, stats.filled_pixels, stats.tiles
            );
        }
    }

    if !response.ok {
        anyhow::bail!("Area detection failed: {}", response.errors.join("; "));
    }
    Ok(())
}
