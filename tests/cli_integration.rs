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

//! End-to-end exercises of the public `Catalog` API against real temp
//! directories, covering the concrete scenarios from the spec's testable
//! properties: a mixed-size tree, deletion, restoration and consolidation.

use std::path::Path;

use lcls_catalog::catalog::{Catalog, FindArgs};

fn write_sized(path: &Path, bytes: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0u8; bytes]).unwrap();
}

#[test]
fn full_lifecycle_matches_spec_scenarios() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let scan_dir = tempfile::tempdir().unwrap();
    let root = scan_dir.path();

    write_sized(&root.join("image_0001.h5"), 100);
    write_sized(&root.join("image_0002.h5"), 128);
    write_sized(&root.join("run0001/a.h5"), 256);
    write_sized(&root.join("run0001/b.h5"), 512);
    write_sized(&root.join("run0002/c.h5"), 1024);
    write_sized(&root.join("run0002/d.h5"), 2048);

    let catalog = Catalog::open(catalog_dir.path()).unwrap();

    // Scenario 1: first snapshot of a 6-file tree.
    let counts = catalog.snapshot(root, Some("xpptest01"), false, 1).unwrap();
    assert_eq!(counts, (6, 0, 0));
    assert_eq!(catalog.count(false).unwrap(), 6);
    assert_eq!(catalog.total_size(false).unwrap(), 100 + 128 + 256 + 512 + 1024 + 2048);

    // Scenario 2: delete the 100-byte file and re-snapshot.
    std::fs::remove_file(root.join("image_0001.h5")).unwrap();
    let counts = catalog.snapshot(root, Some("xpptest01"), false, 1).unwrap();
    assert_eq!(counts, (0, 0, 1));
    assert_eq!(catalog.count(false).unwrap(), 6);
    assert_eq!(catalog.count(true).unwrap(), 5);
    assert_eq!(catalog.total_size(true).unwrap(), 128 + 256 + 512 + 1024 + 2048);

    // Scenario 3: recreate the same file at the same path (restoration).
    write_sized(&root.join("image_0001.h5"), 100);
    let counts = catalog.snapshot(root, Some("xpptest01"), false, 1).unwrap();
    assert_eq!(counts, (1, 0, 0));
    assert_eq!(catalog.count(true).unwrap(), 6);

    // find(): two files over 1000 bytes under run0002.
    let mut find_args = FindArgs::new("%run0002%");
    find_args.size_gt = Some(1000);
    let found = catalog.find(&find_args).unwrap();
    let mut paths: Vec<_> = found.iter().map(|r| r.path.clone()).collect();
    paths.sort();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("c.h5"));
    assert!(paths[1].ends_with("d.h5"));

    // ls_dirs(): two subdirectories with known file counts/sizes.
    let root_str = root.to_string_lossy().to_string();
    let dirs = catalog.ls_dirs(&root_str, false).unwrap();
    let run1 = dirs.iter().find(|d| d.dirname == "run0001").unwrap();
    assert_eq!(run1.file_count, 2);
    assert_eq!(run1.total_size, 256 + 512);
    let run2 = dirs.iter().find(|d| d.dirname == "run0002").unwrap();
    assert_eq!(run2.file_count, 2);
    assert_eq!(run2.total_size, 1024 + 2048);

    // Scenario 4: consolidate collapses base+deltas into one base, state preserved.
    let reconstructed_before = catalog.count(false).unwrap();
    let stats = catalog.consolidate(None).unwrap();
    assert_eq!(stats.experiments_touched, 1);
    assert_eq!(catalog.count(false).unwrap(), reconstructed_before);
}

#[test]
fn unchanged_tree_reports_no_changes() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let scan_dir = tempfile::tempdir().unwrap();
    write_sized(&scan_dir.path().join("a.h5"), 64);

    let catalog = Catalog::open(catalog_dir.path()).unwrap();
    catalog.snapshot(scan_dir.path(), Some("exp"), false, 2).unwrap();
    let counts = catalog.snapshot(scan_dir.path(), Some("exp"), false, 2).unwrap();
    assert_eq!(counts, (0, 0, 0));
}

#[test]
fn checksum_mode_computes_sha256_for_regular_files() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let scan_dir = tempfile::tempdir().unwrap();
    std::fs::write(scan_dir.path().join("data.bin"), b"hello world").unwrap();

    let catalog = Catalog::open(catalog_dir.path()).unwrap();
    catalog.snapshot(scan_dir.path(), Some("exp"), true, 1).unwrap();

    let records = catalog.ls(&scan_dir.path().to_string_lossy(), false).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].checksum.is_some());
    assert_eq!(records[0].checksum.as_deref().unwrap().len(), 64);
}

#[test]
fn stats_report_matches_count_and_total_size() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let scan_dir = tempfile::tempdir().unwrap();
    write_sized(&scan_dir.path().join("a.h5"), 10);
    write_sized(&scan_dir.path().join("b.h5"), 20);

    let catalog = Catalog::open(catalog_dir.path()).unwrap();
    catalog.snapshot(scan_dir.path(), Some("exp"), false, 1).unwrap();

    let stats = catalog.get_stats().unwrap();
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_size, 30);
    assert_eq!(stats.total_files_on_disk, 2);
    assert_eq!(stats.experiment_count, 1);
}

#[test]
fn empty_catalog_queries_return_empty_without_touching_sql() {
    let catalog_dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::open(catalog_dir.path()).unwrap();

    assert_eq!(catalog.count(false).unwrap(), 0);
    assert_eq!(catalog.total_size(false).unwrap(), 0);
    assert!(catalog.ls("/anything", false).unwrap().is_empty());
    assert!(catalog.find(&FindArgs::new("%")).unwrap().is_empty());
}
