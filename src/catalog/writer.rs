// lcls-catalog is a persistent filesystem metadata catalog
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Writes base and delta snapshot files. Every write lands at a sibling
//! `.tmp` path first, then `rename`s into place — a partially written file
//! is never observable under its final name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::error::{CatalogError, Result};
use super::record::MetadataRecord;
use super::schema::records_to_batch;

pub const BASE_PREFIX: &str = "base_";
pub const DELTA_PREFIX: &str = "delta_";

/// Formats a timestamp exactly as `YYYY-MM-DDThhmmss.ffffff`, chosen so
/// lexicographic and temporal order coincide.
pub fn format_snapshot_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%dT%H%M%S%.6f").to_string()
}

pub fn base_filename(ts: &str) -> String {
    format!("{BASE_PREFIX}{ts}.parquet")
}

pub fn delta_filename(ts: &str) -> String {
    format!("{DELTA_PREFIX}{ts}.parquet")
}

/// Writes a base snapshot from a fresh scan, where every record is by
/// definition currently on disk. Empty `records` writes nothing and
/// returns `(0, 0, 0)`.
pub fn write_base(dir: &Path, records: &[MetadataRecord], ts: &str) -> Result<(usize, usize, usize)> {
    if records.is_empty() {
        return Ok((0, 0, 0));
    }
    let mut records = records.to_vec();
    for r in &mut records {
        r.mark_as_base(true);
    }
    let n = records.len();
    write_snapshot_file(dir, &base_filename(ts), &records)?;
    Ok((n, 0, 0))
}

/// Writes a base snapshot from an already-reconstructed state (the
/// consolidator's case), preserving each record's own `on_disk` flag
/// rather than forcing it to `true` — a removed-but-tracked path must
/// stay `on_disk = false` across consolidation (invariant I4).
pub fn write_base_from_state(dir: &Path, records: &[MetadataRecord], ts: &str) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let mut records = records.to_vec();
    for r in &mut records {
        let on_disk = r.effective_on_disk();
        r.mark_as_base(on_disk);
    }
    write_snapshot_file(dir, &base_filename(ts), &records)
}

/// Writes a delta snapshot. `records` must already carry `status` per row
/// (see `DeltaResult::into_records`). An empty change set writes nothing
/// and returns `(0, 0, 0)`.
pub fn write_delta(dir: &Path, records: &[MetadataRecord], ts: &str) -> Result<(usize, usize, usize)> {
    if records.is_empty() {
        return Ok((0, 0, 0));
    }

    let counts = records.iter().fold((0, 0, 0), |(a, m, r), rec| {
        use super::record::RecordStatus::*;
        match rec.status {
            Some(Added) => (a + 1, m, r),
            Some(Modified) => (a, m + 1, r),
            Some(Removed) => (a, m, r + 1),
            None => (a, m, r),
        }
    });

    write_snapshot_file(dir, &delta_filename(ts), records)?;
    Ok(counts)
}

fn write_snapshot_file(dir: &Path, filename: &str, records: &[MetadataRecord]) -> Result<()> {
    for record in records {
        record.validate();
    }

    std::fs::create_dir_all(dir).map_err(|source| CatalogError::SnapshotWriteIo {
        path: dir.to_path_buf(),
        source,
    })?;

    let final_path = dir.join(filename);
    let tmp_path = dir.join(format!("{filename}.tmp"));

    let result = (|| -> anyhow::Result<()> {
        let batch = records_to_batch(records)?;
        let file = std::fs::File::create(&tmp_path)?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    })();

    if let Err(source) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(CatalogError::SnapshotWriteIo {
            path: final_path,
            source: std::io::Error::new(std::io::ErrorKind::Other, source),
        });
    }

    Ok(())
}

/// Returns the lexicographically greatest `base_*.parquet` file in `dir`,
/// if any.
pub fn find_current_base(dir: &Path) -> Option<PathBuf> {
    list_snapshot_files(dir, BASE_PREFIX).into_iter().last()
}

/// Returns every `delta_*.parquet` file whose paired timestamp sorts after
/// `base_ts`, in ascending (application) order.
pub fn applicable_deltas(dir: &Path, base_ts: &str) -> Vec<PathBuf> {
    list_snapshot_files(dir, DELTA_PREFIX)
        .into_iter()
        .filter(|path| {
            delta_timestamp(path)
                .map(|ts| ts.as_str() > base_ts)
                .unwrap_or(false)
        })
        .collect()
}

fn delta_timestamp(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(DELTA_PREFIX))
        .map(|s| s.to_string())
}

pub fn base_timestamp(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(BASE_PREFIX))
        .map(|s| s.to_string())
}

fn list_snapshot_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(prefix) && n.ends_with(".parquet"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Every snapshot file (base and delta) in `dir`, sorted by filename.
pub fn list_all_snapshot_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = list_snapshot_files(dir, BASE_PREFIX);
    files.extend(list_snapshot_files(dir, DELTA_PREFIX));
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::RecordStatus;

    fn sample(path: &str) -> MetadataRecord {
        MetadataRecord {
            path: path.into(),
            parent_path: "/exp".into(),
            filename: path.rsplit('/').next().unwrap().into(),
            size: Some(128),
            mtime: Some(1_700_000_000),
            owner: "0".into(),
            group_name: "0".into(),
            permissions: 0o100644,
            checksum: None,
            experiment: None,
            run: None,
            indexed_at: "2025-01-01T000000.000000".into(),
            on_disk: None,
            status: None,
        }
    }

    #[test]
    fn empty_base_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (a, m, r) = write_base(dir.path(), &[], "2025-01-01T000000.000000").unwrap();
        assert_eq!((a, m, r), (0, 0, 0));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn base_write_lands_atomically_no_tmp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let ts = "2025-01-01T000000.000000";
        write_base(dir.path(), &[sample("/exp/a.h5")], ts).unwrap();

        let final_path = dir.path().join(base_filename(ts));
        assert!(final_path.exists());
        assert!(!dir.path().join(format!("{}.tmp", base_filename(ts))).exists());
    }

    #[test]
    fn delta_applicability_filters_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        write_base(dir.path(), &[sample("/exp/a.h5")], "2025-01-01T000000.000000").unwrap();

        let mut removed = sample("/exp/a.h5");
        removed.mark_as_delta(RecordStatus::Removed);
        write_delta(dir.path(), &[removed], "2025-01-02T000000.000000").unwrap();

        let base = find_current_base(dir.path()).unwrap();
        let base_ts = base_timestamp(&base).unwrap();
        let deltas = applicable_deltas(dir.path(), &base_ts);
        assert_eq!(deltas.len(), 1);
    }
}
