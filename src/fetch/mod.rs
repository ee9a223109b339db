//! Remote dataset access: HTTP fetching, file decoding, retry and caching.

mod cache;
mod client;
mod feature_collection;
mod geoparquet;
mod repository;
mod retry;

pub use cache::MemoCache;
pub use client::HttpFetcher;
pub use feature_collection::parse_feature_collection;
pub use geoparquet::read_geoparquet;
pub use repository::DatasetRepository;
pub use retry::RetryPolicy;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::pip::FeatureSet;

/// Decode a dataset file by its extension (GeoParquet or GeoJSON).
///
/// `columns` selects the GeoParquet attribute columns to keep; GeoJSON
/// features always carry all their properties.
pub fn decode_dataset(filename: &str, data: Bytes, columns: &[&str]) -> Result<FeatureSet> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".parquet") || lower.ends_with(".geoparquet") {
        read_geoparquet(data, columns)
    } else if lower.ends_with(".geojson") || lower.ends_with(".json") {
        parse_feature_collection(&data)
    } else {
        Err(Error::UnsupportedFormat(filename.to_string()))
    }
}
