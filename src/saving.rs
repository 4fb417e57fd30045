use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::workbook::Workbook;

/// Write the workbook as gzip-compressed bincode.
///
/// The file is written next to `path` first and renamed over it, so a
/// reader never sees a half-written workbook.
pub fn save_workbook(workbook: &Workbook, path: &Path) -> std::io::Result<()> {
    let staging = path.with_extension("tmp");
    {
        let file = File::create(&staging)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = std::io::BufWriter::new(encoder);

        serialize_into(&mut writer, workbook)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let encoder = writer.into_inner().map_err(|e| e.into_error())?;
        encoder.finish()?.flush()?;
    }
    fs::rename(&staging, path)
}

pub fn load_workbook(path: &Path) -> std::io::Result<Workbook> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let workbook: Workbook = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(workbook)
}
