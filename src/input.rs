//! Reading coordinate files (CSV or XLSX).

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Xlsx,
}

impl InputFormat {
    /// Format from a short name (`csv`, `xlsx`, `xls`)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" | "text/csv" => Ok(Self::Csv),
            "xlsx" | "xls" | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Ok(Self::Xlsx)
            }
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Self::from_name(ext)
    }
}

/// Valid coordinates in file order, plus the number of rows that were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateBatch {
    pub coordinates: Vec<Coordinate>,
    pub dropped: usize,
}

impl CoordinateBatch {
    fn push_row(&mut self, row: usize, latitude: Option<&str>, longitude: Option<&str>) {
        match latitude.zip(longitude).and_then(|(lat, lon)| Coordinate::parse(lat, lon)) {
            Some(coordinate) => self.coordinates.push(coordinate),
            None => {
                debug!(
                    "Dropping row {}: invalid coordinate ({:?}, {:?})",
                    row, latitude, longitude
                );
                self.dropped += 1;
            }
        }
    }
}

pub fn read_coordinates_file(path: &Path) -> Result<CoordinateBatch> {
    let format = InputFormat::from_path(path)?;
    let data = fs::read(path)?;
    read_coordinates(&data, format)
}

pub fn read_coordinates(data: &[u8], format: InputFormat) -> Result<CoordinateBatch> {
    match format {
        InputFormat::Csv => read_csv(data),
        InputFormat::Xlsx => read_xlsx(data),
    }
}

/// Positions of the latitude and longitude columns in a header row
fn coordinate_columns<'a, I>(headers: I) -> Result<(usize, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut latitude = None;
    let mut longitude = None;
    for (i, header) in headers.into_iter().enumerate() {
        let name = header.trim_start_matches('\u{feff}').trim();
        if latitude.is_none() && name.eq_ignore_ascii_case("latitude") {
            latitude = Some(i);
        } else if longitude.is_none() && name.eq_ignore_ascii_case("longitude") {
            longitude = Some(i);
        }
    }
    latitude.zip(longitude).ok_or(Error::MissingCoordinateColumns)
}

pub fn read_csv<R: Read>(reader: R) -> Result<CoordinateBatch> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let (lat_idx, lon_idx) = coordinate_columns(csv_reader.headers()?.iter())?;

    let mut batch = CoordinateBatch::default();
    for (row, result) in csv_reader.records().enumerate() {
        match result {
            Ok(record) => batch.push_row(row + 1, record.get(lat_idx), record.get(lon_idx)),
            Err(e) => {
                debug!("Dropping row {}: {}", row + 1, e);
                batch.dropped += 1;
            }
        }
    }
    Ok(batch)
}

/// First worksheet of a workbook; the first row is the header
pub fn read_xlsx(data: &[u8]) -> Result<CoordinateBatch> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::UnsupportedFormat("workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(Error::MissingCoordinateColumns)?
        .iter()
        .map(cell_text)
        .collect();
    let (lat_idx, lon_idx) = coordinate_columns(header.iter().map(String::as_str))?;

    let mut batch = CoordinateBatch::default();
    for (row, cells) in rows.enumerate() {
        let latitude = cells.get(lat_idx).map(cell_text);
        let longitude = cells.get(lon_idx).map(cell_text);
        batch.push_row(row + 1, latitude.as_deref(), longitude.as_deref());
    }
    Ok(batch)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
