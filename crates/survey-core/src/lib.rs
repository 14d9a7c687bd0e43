pub mod assembled;
pub mod assembler;
pub mod contour;
pub mod coverage;
pub mod error;
pub mod geo_point;
pub mod models;
pub mod projection;
pub mod raster;
pub mod source;
pub mod spatial;
pub mod survey;
pub mod tile;
pub mod tile_grid;

pub use assembled::AssembledRaster;
pub use assembler::{AreaAssembler, AreaDetectionConfig, DetectionStats};
pub use contour::{BorderFollower, Contour, ContourNode, ContourSet, ContourTracer};
pub use coverage::{
    CoverageAlgorithm, CoverageConfig, CoveragePlanner, GreedyCoverage, Path, PlanOutcome,
    SmoothedPath, SmoothingConfig, SmoothingWarning,
};
pub use error::PlannerError;
pub use geo_point::GeoPoint;
pub use models::{
    AreaDetectionRequest, AreaDetectionResponse, HealthResponse, LatLon, PathPlanRequest,
    PathPlanResponse,
};
pub use projection::{LocalProjection, Projection};
pub use raster::Raster;
pub use source::{BlankRasterSource, FnRasterSource, RasterSource, TileRequest};
pub use spatial::haversine_distance;
pub use survey::{AreaDetection, SurveyConfig, SurveyPlan, SurveyPlanner};
pub use tile::{Connectivity, Tile, TileKey, TileLattice};
pub use tile_grid::TileGrid;
