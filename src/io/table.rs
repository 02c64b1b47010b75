//! Flat CSV tables: the input reader and the append-only output side.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::Path;

use ndarray::Array2;
use serde::Serialize;

use crate::posterior::ModelRecord;

/// Read a whole input table into (time frames x columns) row-major form.
///
/// The header row is optional: if the first record does not parse as numbers
/// it is taken to be one and skipped. Any later non-numeric cell is an error.
pub fn read_csv(path: &Path) -> Result<Array2<f32>, Box<dyn Error>> {
    let file = File::open(path)
        .map_err(|e| format!("failed to open input table `{}`: {e}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut values: Vec<f32> = Vec::new();
    let mut nrows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        match parse_row(&record) {
            Ok(mut parsed) => { values.append(&mut parsed); nrows += 1; }
            Err(_) if row == 0 => continue,
            Err(column) => return Err(format!(
                "input table `{}`: cell at row {}, column {} is not a number",
                path.display(), row + 1, column + 1).into()),
        }
    }
    if nrows == 0 {
        return Err(format!("input table `{}` contains no data rows", path.display()).into());
    }
    let ncols = values.len() / nrows;
    Ok(Array2::from_shape_vec((nrows, ncols), values)?)
}

fn parse_row(record: &csv::StringRecord) -> Result<Vec<f32>, usize> {
    record.iter().enumerate()
        .map(|(column, cell)| cell.parse::<f32>().map_err(|_| column))
        .collect()
}

/// Start an output table: create (or truncate) the file and write the header.
pub fn create_with_header(path: &Path, columns: &[&str]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("failed to create output table `{}`: {e}", path.display()))?;
    writer.write_record(columns)?;
    writer.flush()?;
    Ok(())
}

/// Append one chunk's records. The file is opened, extended and flushed per
/// call, so an aborted run leaves every fully processed chunk on disk.
pub fn append_records<R: Serialize>(path: &Path, records: &[R]) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the flat model posterior back in, for the post-run compressed rewrite.
pub fn read_model_records(path: &Path) -> Result<Vec<ModelRecord>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}
