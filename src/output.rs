//! CSV export of a lookup report.

use std::io::Write;

use crate::error::Result;
use crate::models::ResultRecord;
use crate::pipeline::LookupReport;

/// Cells of one record in report column order; missing values are empty.
///
/// Coordinates always keep a decimal point (`45.0`, not `45`).
pub fn record_cells(record: &ResultRecord) -> Vec<String> {
    let mut cells = vec![
        format!("{:?}", record.latitude),
        format!("{:?}", record.longitude),
        record.geoid.clone().unwrap_or_default(),
        record.state.unwrap_or_default().to_string(),
        record.nmtc_eligibility.clone().unwrap_or_default(),
        record.opportunity_zone.clone().unwrap_or_default(),
        record
            .usda_eligible
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
    ];
    cells.extend(record.zones.iter().map(|z| z.as_str().to_string()));
    cells
}

pub fn write_csv<W: Write>(report: &LookupReport, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(report.columns())?;
    for record in &report.records {
        csv_writer.write_record(record_cells(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(report: &LookupReport) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(report, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
