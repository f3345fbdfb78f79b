use chrono::{DateTime, TimeZone};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// `<prefix>_fotos_<YYYYMMDD_HHMMSS>.zip`
pub fn archive_name<Tz: TimeZone>(prefix: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_fotos_{}.zip", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Bundles `(name, bytes)` entries into an in-memory deflated ZIP.
///
/// Repeated names keep their first occurrence. An empty entry list still
/// produces a valid, empty archive.
pub fn build_zip(entries: Vec<(String, Vec<u8>)>) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut seen = HashSet::new();

    for (name, data) in entries {
        if !seen.insert(name.clone()) {
            tracing::warn!("Duplicate archive entry {} skipped", name);
            continue;
        }
        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    Ok(writer.finish()?.into_inner())
}
