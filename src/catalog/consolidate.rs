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

//! Rewrites (base + deltas) for each experiment into a single new base.
//! The new base lands via temp+rename before any prior file is touched,
//! so a crash mid-consolidation leaves two valid bases — reconstruct's
//! "lexicographically greatest base wins" rule already handles that on
//! the next read, no special-case recovery needed.

use std::path::{Path, PathBuf};

use chrono::Local;

use super::error::Result;
use super::reconstruct::reconstruct;
use super::writer::{format_snapshot_timestamp, list_all_snapshot_files, write_base_from_state};

#[derive(Debug, Default, Clone)]
pub struct ConsolidateStats {
    pub experiments_touched: usize,
    pub files_removed: usize,
    pub files_archived: usize,
}

/// Consolidates every experiment directory under `catalog_root` that holds
/// more than one snapshot file. `archive_dir`, if given, receives the
/// superseded files instead of them being deleted outright.
pub fn consolidate(catalog_root: &Path, archive_dir: Option<&Path>) -> Result<ConsolidateStats> {
    let mut stats = ConsolidateStats::default();

    let Ok(entries) = std::fs::read_dir(catalog_root) else {
        return Ok(stats);
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let prior_files = list_all_snapshot_files(&dir);
        if prior_files.len() <= 1 {
            continue;
        }

        consolidate_experiment(&dir, archive_dir, &prior_files, &mut stats)?;
    }

    Ok(stats)
}

fn consolidate_experiment(
    dir: &Path,
    archive_dir: Option<&Path>,
    prior_files: &[PathBuf],
    stats: &mut ConsolidateStats,
) -> Result<()> {
    let state = reconstruct(dir)?;
    let records: Vec<_> = state.into_values().collect();

    let ts = format_snapshot_timestamp(Local::now());
    write_base_from_state(dir, &records, &ts)?;

    stats.experiments_touched += 1;

    let experiment_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for old_file in prior_files {
        match archive_dir {
            Some(archive_root) => {
                let target_dir = archive_root.join(&experiment_name);
                let _ = std::fs::create_dir_all(&target_dir);
                let filename = old_file.file_name().unwrap_or_default();
                if std::fs::rename(old_file, target_dir.join(filename)).is_ok() {
                    stats.files_archived += 1;
                }
            }
            None => {
                if std::fs::remove_file(old_file).is_ok() {
                    stats.files_removed += 1;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::MetadataRecord;
    use crate::catalog::writer::{write_base, write_delta};

    fn sample(path: &str, ts: &str) -> MetadataRecord {
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
            indexed_at: ts.into(),
            on_disk: None,
            status: None,
        }
    }

    #[test]
    fn single_snapshot_experiment_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let exp_dir = dir.path().join("xpptest01");
        let ts = "2025-01-01T000000.000000";
        write_base(&exp_dir, &[sample("/exp/a.h5", ts)], ts).unwrap();

        let stats = consolidate(dir.path(), None).unwrap();
        assert_eq!(stats.experiments_touched, 0);
        assert_eq!(list_all_snapshot_files(&exp_dir).len(), 1);
    }

    #[test]
    fn consolidate_collapses_base_and_delta_into_one_base() {
        let dir = tempfile::tempdir().unwrap();
        let exp_dir = dir.path().join("xpptest01");
        let base_ts = "2025-01-01T000000.000000";
        write_base(
            &exp_dir,
            &[sample("/exp/a.h5", base_ts), sample("/exp/b.h5", base_ts)],
            base_ts,
        )
        .unwrap();

        let delta_ts = "2025-01-02T000000.000000";
        let mut removed = sample("/exp/a.h5", delta_ts);
        removed.mark_as_delta(crate::catalog::record::RecordStatus::Removed);
        write_delta(&exp_dir, &[removed], delta_ts).unwrap();

        let before = reconstruct(&exp_dir).unwrap();

        let stats = consolidate(dir.path(), None).unwrap();
        assert_eq!(stats.experiments_touched, 1);
        assert_eq!(stats.files_removed, 2);

        let remaining = list_all_snapshot_files(&exp_dir);
        assert_eq!(remaining.len(), 1);

        let after = reconstruct(&exp_dir).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn archive_dir_moves_rather_than_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let exp_dir = dir.path().join("xpptest01");
        let base_ts = "2025-01-01T000000.000000";
        write_base(&exp_dir, &[sample("/exp/a.h5", base_ts)], base_ts).unwrap();

        let delta_ts = "2025-01-02T000000.000000";
        let mut added = sample("/exp/c.h5", delta_ts);
        added.mark_as_delta(crate::catalog::record::RecordStatus::Added);
        write_delta(&exp_dir, &[added], delta_ts).unwrap();

        let stats = consolidate(dir.path(), Some(archive.path())).unwrap();
        assert_eq!(stats.files_archived, 2);
        assert_eq!(stats.files_removed, 0);

        let archived = list_all_snapshot_files(&archive.path().join("xpptest01"));
        assert_eq!(archived.len(), 2);
    }

    #[test]
    fn consolidate_preserves_on_disk_false_for_tracked_removed_paths() {
        let dir = tempfile::tempdir().unwrap();
        let exp_dir = dir.path().join("xpptest01");
        let base_ts = "2025-01-01T000000.000000";
        write_base(&exp_dir, &[sample("/exp/a.h5", base_ts)], base_ts).unwrap();

        let delta_ts = "2025-01-02T000000.000000";
        let mut removed = sample("/exp/a.h5", delta_ts);
        removed.mark_as_delta(crate::catalog::record::RecordStatus::Removed);
        write_delta(&exp_dir, &[removed], delta_ts).unwrap();

        consolidate(dir.path(), None).unwrap();

        let after = reconstruct(&exp_dir).unwrap();
        assert_eq!(after["/exp/a.h5"].on_disk, Some(false));
        assert_eq!(after["/exp/a.h5"].status, None);
    }
}
