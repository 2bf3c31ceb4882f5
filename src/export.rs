use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::core::types::{FilingRecord, CSV_HEADERS};

/// `<prefix>YYYYMMDD_HHMMSS.csv`
pub fn default_filename(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Writes `batch` as CSV with a header row and returns the path written.
///
/// Without `filename` the file lands in the current directory under a
/// timestamped name. Rows are staged in a temporary file next to the
/// target and renamed into place only once fully flushed, so a failed
/// export never leaves a partial file behind.
pub fn export(batch: &[FilingRecord], filename: Option<&Path>, prefix: &str) -> Result<PathBuf> {
    let path = match filename {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(default_filename(prefix, Local::now())),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory {:?}", dir))?;

    let staging = NamedTempFile::new_in(&dir)
        .with_context(|| format!("failed to create staging file in {:?}", dir))?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(staging.as_file());
        writer.write_record(CSV_HEADERS)?;
        for record in batch {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }

    staging
        .persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {:?}", path))?;

    info!("Data saved to {}", path.display());
    info!("Total amendments found: {}", batch.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_filename() {
        let now = Local.with_ymd_and_hms(2026, 3, 7, 8, 5, 9).unwrap();
        assert_eq!(
            default_filename("sec_amendments_", now),
            "sec_amendments_20260307_080509.csv"
        );
    }

    #[test]
    fn test_empty_batch_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(&[], Some(&dir.path().join("empty.csv")), "x_").unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "Date,Time,Symbol,Form Type,Company,Title,URL,AI Summary\n"
        );
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("run.csv");
        let written = export(&[FilingRecord::default()], Some(&target), "x_").unwrap();
        assert_eq!(written, target);
        assert!(target.exists());
        // Only the target remains; the staging file was renamed.
        assert_eq!(fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }
}
