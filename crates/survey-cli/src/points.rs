//! Input point parsing.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use survey_core::LatLon;

#[derive(Deserialize)]
#[serde(untagged)]
enum PointEntry {
    Object(LatLon),
    Pair([f64; 2]),
}

impl From<PointEntry> for LatLon {
    fn from(entry: PointEntry) -> Self {
        match entry {
            PointEntry::Object(point) => point,
            PointEntry::Pair([lat, lon]) => LatLon::new(lat, lon),
        }
    }
}

/// Parse `lat,lon`.
pub fn parse_point(value: &str) -> Result<LatLon> {
    let (lat, lon) = value
        .split_once(',')
        .with_context(|| format!("expected LAT,LON, got '{}'", value))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude '{}'", lat))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("bad longitude '{}'", lon))?;
    Ok(LatLon::new(lat, lon))
}

/// Parse a JSON array of `{"lat": .., "lon": ..}` objects or `[lat, lon]` pairs.
pub fn parse_points_json(text: &str) -> Result<Vec<LatLon>> {
    let entries: Vec<PointEntry> = serde_json::from_str(text).context("invalid points JSON")?;
    Ok(entries.into_iter().map(LatLon::from).collect())
}

/// Points from a JSON file followed by the ones given inline.
pub fn load_points(file: Option<&Path>, inline: &[String]) -> Result<Vec<LatLon>> {
    let mut points = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_points_json(&text)?
        }
        None => Vec::new(),
    };
    for value in inline {
        points.push(parse_point(value)?);
    }
    if points.is_empty() {
        anyhow::bail!("no input points; pass --points FILE or --point LAT,LON");
    }
    Ok(points)
}
