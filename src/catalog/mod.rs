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

pub mod consolidate;
pub mod delta;
pub mod error;
pub mod query;
pub mod reconstruct;
pub mod record;
pub mod schema;
pub mod scanner;
pub mod walker;
pub mod writer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use rayon::prelude::*;

pub use consolidate::ConsolidateStats;
pub use error::{CatalogError, Result};
pub use query::{CatalogStats, DirSummary, FindArgs, QueryRow};
pub use record::{MetadataRecord, RecordStatus};

/// One open catalog: a root directory holding zero or more experiment
/// subdirectories, each an independent sequence of base/delta snapshot
/// files. Created on open if absent — every operation below is a thin
/// dispatcher onto `catalog::*`'s free functions.
pub struct Catalog {
    root: PathBuf,
}

/// One experiment's snapshot summary, as surfaced by the `snapshots`
/// subcommand.
pub struct SnapshotInfo {
    pub experiment: String,
    pub files: Vec<PathBuf>,
}

/// Live progress hook for `snapshot`'s walk and scan phases. Implemented by
/// `ui::progress::SnapshotProgress` for the CLI; tests and library callers
/// that don't care about progress just omit it.
pub trait SnapshotObserver: Sync {
    fn on_dirs_walked(&self, n: u64);
    fn on_files_scanned(&self, n: u64);
}

impl Catalog {
    /// Opens (creating if absent) the catalog rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CatalogError::SnapshotWriteIo {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks `scan_root`, computes the delta against the experiment's
    /// reconstructed state, and writes a base (first snapshot) or delta
    /// (subsequent snapshot) file. Returns `(added, modified, removed)`.
    pub fn snapshot(
        &self,
        scan_root: &Path,
        experiment: Option<&str>,
        compute_checksum: bool,
        workers: usize,
    ) -> Result<(usize, usize, usize)> {
        self.snapshot_with_batch_size(scan_root, experiment, compute_checksum, workers, None)
    }

    /// Same as `snapshot`, but lets the caller override the walker's
    /// per-round directory batch size (the CLI's `--batch-size`).
    pub fn snapshot_with_batch_size(
        &self,
        scan_root: &Path,
        experiment: Option<&str>,
        compute_checksum: bool,
        workers: usize,
        batch_size: Option<usize>,
    ) -> Result<(usize, usize, usize)> {
        self.snapshot_with_observer(scan_root, experiment, compute_checksum, workers, batch_size, None)
    }

    /// Same as `snapshot_with_batch_size`, but reports live walk/scan
    /// progress to `observer` (the CLI's spinner pair) as work happens.
    pub fn snapshot_with_observer(
        &self,
        scan_root: &Path,
        experiment: Option<&str>,
        compute_checksum: bool,
        workers: usize,
        batch_size: Option<usize>,
        observer: Option<&dyn SnapshotObserver>,
    ) -> Result<(usize, usize, usize)> {
        if let Some(label) = experiment {
            validate_experiment_label(label)?;
        }

        let experiment_dir_name = match experiment {
            Some(label) => label.to_string(),
            None => md5_prefix(scan_root)?,
        };
        let experiment_dir = self.root.join(&experiment_dir_name);

        let ts = writer::format_snapshot_timestamp(Local::now());

        let workers = workers.max(1);
        let effective_batch_size = batch_size.unwrap_or(2 * workers);
        let on_dir = |n: u64| {
            if let Some(observer) = observer {
                observer.on_dirs_walked(n);
            }
        };
        let paths = walker::walk_with_progress(scan_root, workers, effective_batch_size, &on_dir);

        let on_file = |n: u64| {
            if let Some(observer) = observer {
                observer.on_files_scanned(n);
            }
        };
        let current = scan_paths(paths, compute_checksum, experiment, &ts, workers, &on_file);

        let previous = reconstruct::reconstruct(&experiment_dir)?;

        if previous.is_empty() {
            let records: Vec<_> = current.into_values().collect();
            let n = records.len();
            if n == 0 {
                return Ok((0, 0, 0));
            }
            writer::write_base(&experiment_dir, &records, &ts)?;
            return Ok((n, 0, 0));
        }

        let delta = delta::compute_delta(&current, &previous, &ts);
        if delta.is_empty() {
            return Ok((0, 0, 0));
        }
        let counts = delta.counts();
        writer::write_delta(&experiment_dir, &delta.into_records(), &ts)?;
        Ok(counts)
    }

    pub fn ls(&self, path: &str, on_disk_only: bool) -> anyhow::Result<Vec<MetadataRecord>> {
        self.with_view(Vec::new(), |conn| query::ls(conn, path, on_disk_only))
    }

    pub fn ls_dirs(&self, path: &str, on_disk_only: bool) -> anyhow::Result<Vec<DirSummary>> {
        self.with_view(Vec::new(), |conn| query::ls_dirs(conn, path, on_disk_only))
    }

    pub fn find(&self, args: &FindArgs) -> anyhow::Result<Vec<MetadataRecord>> {
        self.with_view(Vec::new(), |conn| query::find(conn, args))
    }

    pub fn count(&self, on_disk_only: bool) -> anyhow::Result<i64> {
        self.with_view(0, |conn| query::count(conn, on_disk_only))
    }

    pub fn total_size(&self, on_disk_only: bool) -> anyhow::Result<i64> {
        self.with_view(0, |conn| query::total_size(conn, on_disk_only))
    }

    pub fn get_stats(&self) -> anyhow::Result<CatalogStats> {
        self.with_view(
            CatalogStats {
                total_files: 0,
                total_size: 0,
                total_files_on_disk: 0,
                total_size_on_disk: 0,
                experiment_count: 0,
            },
            query::get_stats,
        )
    }

    pub fn tree(&self, path: &str, depth: usize) -> anyhow::Result<String> {
        self.with_view(format!("{path}\n"), |conn| query::tree(conn, path, depth))
    }

    pub fn query(&self, sql: &str) -> anyhow::Result<Vec<QueryRow>> {
        self.with_view(Vec::new(), |conn| query::run_query(conn, sql))
    }

    pub fn consolidate(&self, archive_dir: Option<&Path>) -> Result<ConsolidateStats> {
        consolidate::consolidate(&self.root, archive_dir)
    }

    /// Lists every experiment directory (optionally filtered to one) along
    /// with the snapshot files it holds, for the `snapshots` subcommand.
    pub fn list_snapshots(&self, experiment: Option<&str>) -> anyhow::Result<Vec<SnapshotInfo>> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Ok(out),
        };

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let name = dir.file_name().unwrap_or_default().to_string_lossy().into_owned();
            if let Some(filter) = experiment {
                if name != filter {
                    continue;
                }
            }
            out.push(SnapshotInfo {
                experiment: name,
                files: writer::list_all_snapshot_files(&dir),
            });
        }

        out.sort_by(|a, b| a.experiment.cmp(&b.experiment));
        Ok(out)
    }

    /// Opens a DuckDB connection with the `files` view (if the catalog has
    /// any snapshot data at all) and runs `f` against it; returns `empty`
    /// untouched when the catalog is empty, matching the "skip ranking
    /// entirely"/no-op contract for a fresh catalog.
    fn with_view<T>(
        &self,
        empty: T,
        f: impl FnOnce(&duckdb::Connection) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        match query::open_connection(&self.root)? {
            Some(conn) => f(&conn),
            None => Ok(empty),
        }
    }
}

/// Runs the scan phase (C2 over every walked path) on a dedicated pool
/// sized to `workers`, matching §5's scan-phase contract: chunks of
/// `max(1, len / (workers * 4))` paths, fully drained before the caller
/// moves on to delta computation. `workers <= 1` (or too few paths to
/// bother chunking) scans inline on the calling thread.
///
/// Per-path errors never surface here: `scanner::scan_file` already
/// swallows them into `None`.
fn scan_paths(
    paths: Vec<PathBuf>,
    compute_checksum: bool,
    experiment: Option<&str>,
    ts: &str,
    workers: usize,
    on_file: &(dyn Fn(u64) + Sync),
) -> BTreeMap<String, MetadataRecord> {
    if workers <= 1 || paths.len() <= 1 {
        return paths
            .iter()
            .filter_map(|path| scanner::scan_file(path, compute_checksum, experiment, ts))
            .inspect(|_| on_file(1))
            .map(|record| (record.path.clone(), record))
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("failed to build scan thread pool");

    let chunk_size = (paths.len() / (workers * 4)).max(1);

    pool.install(|| {
        paths
            .par_chunks(chunk_size)
            .flat_map_iter(|chunk| {
                chunk
                    .iter()
                    .filter_map(|path| scanner::scan_file(path, compute_checksum, experiment, ts))
            })
            .inspect(|_| on_file(1))
            .map(|record| (record.path.clone(), record))
            .collect()
    })
}

fn validate_experiment_label(label: &str) -> Result<()> {
    if label.is_empty() || label.contains('/') || label == "." || label == ".." {
        return Err(CatalogError::InvalidArgument(format!(
            "experiment label {label:?} must be a single legal path segment"
        )));
    }
    Ok(())
}

fn md5_prefix(root: &Path) -> Result<String> {
    let resolved = std::fs::canonicalize(root).map_err(|source| CatalogError::SnapshotWriteIo {
        path: root.to_path_buf(),
        source,
    })?;
    let digest = md5::compute(resolved.to_string_lossy().as_bytes());
    Ok(format!("{digest:x}")[..8].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn first_snapshot_is_all_added_and_counted() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let scan_dir = tempfile::tempdir().unwrap();

        write_file(&scan_dir.path().join("run0001/a.h5"), &[0u8; 100]);
        write_file(&scan_dir.path().join("run0001/b.h5"), &[0u8; 128]);

        let catalog = Catalog::open(catalog_dir.path()).unwrap();
        let counts = catalog
            .snapshot(scan_dir.path(), Some("xpptest01"), false, 1)
            .unwrap();
        assert_eq!(counts, (2, 0, 0));

        let files = writer::list_all_snapshot_files(&catalog_dir.path().join("xpptest01"));
        assert_eq!(files.len(), 1);
        assert!(files[0].file_name().unwrap().to_str().unwrap().starts_with("base_"));
    }

    #[test]
    fn unchanged_tree_produces_no_new_file() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let scan_dir = tempfile::tempdir().unwrap();
        write_file(&scan_dir.path().join("a.h5"), &[0u8; 100]);

        let catalog = Catalog::open(catalog_dir.path()).unwrap();
        catalog.snapshot(scan_dir.path(), Some("exp"), false, 1).unwrap();
        let counts = catalog.snapshot(scan_dir.path(), Some("exp"), false, 1).unwrap();

        assert_eq!(counts, (0, 0, 0));
        assert_eq!(
            writer::list_all_snapshot_files(&catalog_dir.path().join("exp")).len(),
            1
        );
    }

    #[test]
    fn delete_then_resnapshot_produces_removed_delta() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let scan_dir = tempfile::tempdir().unwrap();
        let victim = scan_dir.path().join("a.h5");
        write_file(&victim, &[0u8; 100]);
        write_file(&scan_dir.path().join("b.h5"), &[0u8; 128]);

        let catalog = Catalog::open(catalog_dir.path()).unwrap();
        catalog.snapshot(scan_dir.path(), Some("exp"), false, 1).unwrap();

        std::fs::remove_file(&victim).unwrap();
        let counts = catalog.snapshot(scan_dir.path(), Some("exp"), false, 1).unwrap();
        assert_eq!(counts, (0, 0, 1));
    }

    #[test]
    fn experiment_label_with_path_separator_is_rejected() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let scan_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(catalog_dir.path()).unwrap();
        let err = catalog
            .snapshot(scan_dir.path(), Some("a/b"), false, 1)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
    }

    #[test]
    fn missing_experiment_label_falls_back_to_md5_prefix() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let scan_dir = tempfile::tempdir().unwrap();
        write_file(&scan_dir.path().join("a.h5"), &[0u8; 10]);

        let catalog = Catalog::open(catalog_dir.path()).unwrap();
        catalog.snapshot(scan_dir.path(), None, false, 1).unwrap();

        let entries: Vec<_> = std::fs::read_dir(catalog_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name().to_string_lossy().len(), 8);
    }

    #[test]
    fn parallel_scan_matches_sequential_scan() {
        let scan_dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            write_file(&scan_dir.path().join(format!("run0001/f{i}.h5")), &[0u8; 32]);
        }
        let paths = walker::walk(scan_dir.path(), 1);

        let sequential = scan_paths(paths.clone(), false, Some("exp"), "2025-01-01T000000.000000", 1, &|_| {});
        let parallel = scan_paths(paths, false, Some("exp"), "2025-01-01T000000.000000", 4, &|_| {});

        assert_eq!(sequential.len(), 20);
        assert_eq!(sequential.keys().collect::<Vec<_>>(), parallel.keys().collect::<Vec<_>>());
    }
}
