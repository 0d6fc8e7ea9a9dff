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

//! Produces every regular-file path under a root. Symlinks are yielded as
//! file entries (so the scanner records them) but never descended into.
//! Directory-level errors silently prune that subtree.
//!
//! `workers == 1` walks depth-first with an explicit stack (no recursion).
//! `workers > 1` runs a breadth-first frontier in rounds of up to
//! `2 * workers` directories, scanned concurrently on a dedicated `rayon`
//! pool. The two modes are not guaranteed to emit paths in the same order.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Walks `root` and returns every regular-file (or symlink) path found.
pub fn walk(root: &Path, workers: usize) -> Vec<PathBuf> {
    walk_with_batch_size(root, workers, 2 * workers.max(1))
}

/// Same as `walk`, but lets the caller override the number of directories
/// popped from the frontier per round (the CLI's `--batch-size`). Ignored
/// when `workers <= 1`, since the sequential walk has no rounds.
pub fn walk_with_batch_size(root: &Path, workers: usize, batch_size: usize) -> Vec<PathBuf> {
    walk_with_progress(root, workers, batch_size, &|_| {})
}

/// Same as `walk_with_batch_size`, but calls `on_dir_done` with the number
/// of directories drained each time a batch is pulled off the frontier (or
/// once per directory in the sequential path), so a caller can drive a live
/// progress indicator. The callback must tolerate concurrent calls from the
/// walker pool's worker threads.
pub fn walk_with_progress(
    root: &Path,
    workers: usize,
    batch_size: usize,
    on_dir_done: &(dyn Fn(u64) + Sync),
) -> Vec<PathBuf> {
    if workers <= 1 {
        walk_sequential(root, on_dir_done)
    } else {
        walk_parallel(root, workers, batch_size.max(1), on_dir_done)
    }
}

fn classify(path: &Path) -> Option<Entry> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if metadata.is_dir() {
        Some(Entry::Dir)
    } else {
        // Regular files and symlinks (to anything) are both leaves here;
        // the scanner decides later whether a symlink gets hashed.
        Some(Entry::File)
    }
}

enum Entry {
    Dir,
    File,
}

fn walk_sequential(root: &Path, on_dir_done: &(dyn Fn(u64) + Sync)) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "directory unreadable, pruning subtree");
                on_dir_done(1);
                continue;
            }
        };

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            match classify(&path) {
                Some(Entry::Dir) => stack.push(path),
                Some(Entry::File) => files.push(path),
                None => {
                    tracing::debug!(path = %path.display(), "could not stat entry, skipping");
                }
            }
        }
        on_dir_done(1);
    }

    files
}

fn walk_parallel(
    root: &Path,
    workers: usize,
    batch_size: usize,
    on_dir_done: &(dyn Fn(u64) + Sync),
) -> Vec<PathBuf> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("failed to build walker thread pool");

    let frontier = Mutex::new(VecDeque::from([root.to_path_buf()]));
    let files = Mutex::new(Vec::new());

    pool.install(|| {
        loop {
            let batch: Vec<PathBuf> = {
                let mut frontier = frontier.lock();
                if frontier.is_empty() {
                    break;
                }
                let take = batch_size.min(frontier.len());
                frontier.drain(..take).collect()
            };
            on_dir_done(batch.len() as u64);

            use rayon::iter::{IntoParallelIterator, ParallelIterator};
            let round_results: Vec<(Vec<PathBuf>, Vec<PathBuf>)> = batch
                .into_par_iter()
                .map(|dir| scan_directory(&dir))
                .collect();

            let mut frontier = frontier.lock();
            let mut files = files.lock();
            for (subdirs, found_files) in round_results {
                frontier.extend(subdirs);
                files.extend(found_files);
            }
        }
    });

    files.into_inner()
}

/// Lists one directory, partitioning its entries into subdirectories and files.
fn scan_directory(dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "directory unreadable, pruning subtree");
            return (subdirs, files);
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        match classify(&path) {
            Some(Entry::Dir) => subdirs.push(path),
            Some(Entry::File) => files.push(path),
            None => {
                tracing::debug!(path = %path.display(), "could not stat entry, skipping");
            }
        }
    }

    (subdirs, files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn build_tree(root: &Path) {
        std::fs::create_dir_all(root.join("run0001")).unwrap();
        std::fs::create_dir_all(root.join("run0002")).unwrap();
        std::fs::write(root.join("run0001/image_0001.h5"), b"a").unwrap();
        std::fs::write(root.join("run0001/image_0002.h5"), b"bb").unwrap();
        std::fs::write(root.join("run0002/data.h5"), b"ccc").unwrap();
        std::fs::write(root.join("top.txt"), b"d").unwrap();
    }

    #[test]
    fn sequential_and_parallel_agree_on_file_set() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());

        let seq: BTreeSet<_> = walk(dir.path(), 1).into_iter().collect();
        let par: BTreeSet<_> = walk(dir.path(), 4).into_iter().collect();

        assert_eq!(seq.len(), 4);
        assert_eq!(seq, par);
    }

    #[test]
    fn prunes_unreadable_subtree_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());

        let missing = dir.path().join("does-not-exist");
        let (subdirs, files) = scan_directory(&missing);
        assert!(subdirs.is_empty());
        assert!(files.is_empty());
    }
}
