use std::io;

use thiserror::Error;

use super::ReportRow;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Header row followed by one row per pass. Fields are quoted only when
/// they need to be (e.g. a satellite name containing a comma).
pub fn write_csv<W: io::Write>(rows: &[ReportRow], writer: W) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[ReportRow]) -> Result<String, ReportError> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

pub fn read_csv<R: io::Read>(reader: R) -> Result<Vec<ReportRow>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let rows = reader.deserialize().collect::<Result<Vec<ReportRow>, _>>()?;
    Ok(rows)
}
