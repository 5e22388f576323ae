pub mod run;
pub mod sample;
pub mod simulators;

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use nalgebra::DMatrix;
use serde::Serialize;

/// Writes `samples` as CSV with one `theta_<i>` column per parameter.
pub fn write_samples<W: Write>(writer: W, samples: &DMatrix<f64>) -> Result<(), Box<dyn Error>> {
    let mut csv = csv::Writer::from_writer(writer);
    let header: Vec<String> = (0..samples.ncols()).map(|idx| format!("theta_{idx}")).collect();
    csv.write_record(&header)?;
    for row in samples.row_iter() {
        csv.write_record(row.iter().map(|value| value.to_string()))?;
    }
    csv.flush()?;
    Ok(())
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
