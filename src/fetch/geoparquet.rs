//! GeoParquet decoding (WKB geometry column + attribute columns).

use std::collections::HashMap;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use bytes::Bytes;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pip::{into_multipolygon, Crs, FeatureSet, RawFeature};

/// The `geo` key of the Parquet footer
#[derive(Debug, Deserialize)]
struct GeoMetadata {
    primary_column: String,
    #[serde(default)]
    columns: HashMap<String, GeoColumn>,
}

#[derive(Debug, Deserialize)]
struct GeoColumn {
    #[serde(default = "default_encoding")]
    encoding: String,
    #[serde(default)]
    crs: Option<Value>,
}

fn default_encoding() -> String {
    "WKB".to_string()
}

/// Read a GeoParquet file, keeping the named attribute columns as string
/// properties. Columns absent from the file are ignored.
///
/// Files without `geo` metadata are read as a WKB `geometry` column in
/// OGC:CRS84.
pub fn read_geoparquet(data: Bytes, columns: &[&str]) -> Result<FeatureSet> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;

    let metadata = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == "geo"))
        .and_then(|kv| kv.value.as_deref())
        .map(serde_json::from_str::<GeoMetadata>)
        .transpose()?;

    let (primary, crs) = match &metadata {
        Some(meta) => {
            let column = meta.columns.get(&meta.primary_column);
            if let Some(column) = column {
                if !column.encoding.eq_ignore_ascii_case("WKB") {
                    return Err(Error::GeoParquet {
                        message: format!("unsupported geometry encoding '{}'", column.encoding),
                    });
                }
            }
            let crs = Crs::from_geoparquet(column.and_then(|c| c.crs.as_ref()))?;
            (meta.primary_column.clone(), crs)
        }
        None => ("geometry".to_string(), Crs::Wgs84),
    };

    let reader = builder.build()?;
    let mut set = FeatureSet::new(crs);
    let mut skipped = 0usize;

    for batch in reader {
        let batch = batch?;

        let geometry = batch
            .column_by_name(&primary)
            .ok_or_else(|| Error::GeoParquet {
                message: format!("missing geometry column '{}'", primary),
            })?;
        let geometry = cast(geometry, &DataType::Binary)?;
        let geometry = geometry.as_binary::<i32>();

        let mut attrs: Vec<(&str, ArrayRef)> = Vec::with_capacity(columns.len());
        for name in columns {
            if let Some(column) = batch.column_by_name(name) {
                attrs.push((*name, cast(column, &DataType::Utf8)?));
            }
        }

        for row in 0..batch.num_rows() {
            if geometry.is_null(row) {
                skipped += 1;
                continue;
            }
            let decoded = Wkb(geometry.value(row).to_vec()).to_geo()?;
            let Some(multipolygon) = into_multipolygon(decoded) else {
                skipped += 1;
                continue;
            };

            let mut properties = Map::new();
            for (name, array) in &attrs {
                let strings = array.as_string::<i32>();
                let value = if strings.is_null(row) {
                    Value::Null
                } else {
                    Value::String(strings.value(row).to_string())
                };
                properties.insert(name.to_string(), value);
            }

            set.features.push(RawFeature {
                geometry: multipolygon,
                properties,
            });
        }
    }

    debug!(
        "Decoded {} GeoParquet features ({} skipped, {})",
        set.len(),
        skipped,
        set.crs
    );
    Ok(set)
}
