/// WGS84 semi-axes
pub const WGS84_SEMI_MAJOR_M: f64 = 6378137.0;
pub const WGS84_SEMI_MINOR_M: f64 = 6356752.3;

/// Default half-width of the sampled window around a point
pub const DEFAULT_BBOX_RADIUS_M: f64 = 1000.0;

/// Geohash length used for file names and record codes
pub const DEFAULT_GEOHASH_PRECISION: usize = 10;

/// Coverage request parameters
pub const DEFAULT_COVERAGE_URL: &str = "http://maps.isric.org/mapserv?map=/map/";
pub const DEFAULT_CRS: &str = "urn:ogc:def:crs:EPSG::4326";
pub const DEFAULT_COVERAGE_FORMAT: &str = "GEOTIFF_INT16";
pub const DEFAULT_TILE_SIZE: u32 = 8;
pub const WCS_VERSION: &str = "1.0.0";

/// Raster pixel value meaning "no measurement"
pub const RASTER_NO_DATA: f64 = 255.0;

/// Serialized stand-ins for missing soil values
pub const SENTINEL_NO_DATA: f64 = -89.0;
pub const SENTINEL_UNAVAILABLE: f64 = -99.0;

/// Profile depth written into every sample record (cm)
pub const PROFILE_DEPTH_CM: u32 = 600;

/// Bulk density is served in cg/cm3
pub const BULK_DENSITY_SCALE: f64 = 100.0;

/// Width of the solver-generated code at the start of a record header
pub const HEADER_CODE_WIDTH: usize = 12;

/// File extensions
pub const SOLVER_EXTENSION: &str = "SOL";
pub const STAGED_EXTENSION: &str = "SOLD";
pub const TILE_EXTENSION: &str = "tif";

/// File and directory names inside a point arena
pub const SAMPLE_FILE_PREFIX: &str = "sample_asc_";
pub const TILES_DIR: &str = "tiles";

/// Processing defaults
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SOLVER_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
