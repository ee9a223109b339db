//! Error types for the lookup library.

use crate::pip::Crs;

/// Errors raised while loading reference data or running a lookup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure or non-success HTTP status
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Mapping service answered with an error payload instead of features
    #[error("Mapping service error: {message}")]
    Service { message: String },

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Invalid WKB geometry: {0}")]
    Wkb(#[from] geozero::error::GeozeroError),

    /// GeoParquet file that does not follow the expected layout
    #[error("Invalid GeoParquet file: {message}")]
    GeoParquet { message: String },

    #[error(
        "Unsupported coordinate reference system: {0} (supported: {supported})",
        supported = crate::pip::SUPPORTED_CRS
    )]
    UnsupportedCrs(String),

    /// Two layers that must be combined are in different reference systems
    #[error("Cannot combine layers in {0} and {1}")]
    CrsMismatch(Crs, Crs),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Coordinate file lacks the latitude/longitude header
    #[error("Input file must include 'latitude' and 'longitude' columns")]
    MissingCoordinateColumns,

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("No states selected")]
    NoStatesSelected,

    /// A state's tract file could not be loaded; nothing downstream can run
    #[error("Failed to load census tracts for state {fips}: {source}")]
    TractLoad {
        fips: String,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience `Result` alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
