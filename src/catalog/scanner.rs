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

//! Turns a single path into a `MetadataRecord`. Every OS-level failure here
//! is swallowed into a `None` (the "skipped" marker) rather than propagated:
//! a vanished file or a permission error should not abort a whole snapshot.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use super::record::MetadataRecord;

const HASH_CHUNK_SIZE: usize = 8192;

fn run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"run(\d+)").expect("static pattern is valid"))
}

fn extract_run(path: &str) -> Option<i32> {
    run_pattern()
        .captures(path)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Scans a single path. Returns `None` if the path can't be stat'd (vanished,
/// permission denied, broken symlink, ...) — scan errors never propagate.
pub fn scan_file(
    path: &Path,
    compute_checksum: bool,
    experiment: Option<&str>,
    indexed_at: &str,
) -> Option<MetadataRecord> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    let path_str = path.to_str()?.to_string();

    let parent_path = path
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("")
        .to_string();
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("")
        .to_string();

    let is_regular_file = metadata.file_type().is_file();

    let checksum = if compute_checksum && is_regular_file {
        hash_file(path)
    } else {
        None
    };

    let (owner, group_name, permissions) = file_attrs(&metadata);

    Some(MetadataRecord {
        run: extract_run(&path_str),
        path: path_str,
        parent_path,
        filename,
        size: Some(metadata.len() as i64),
        mtime: metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64),
        owner,
        group_name,
        permissions,
        checksum,
        experiment: experiment.map(|s| s.to_string()),
        indexed_at: indexed_at.to_string(),
        on_disk: None,
        status: None,
    })
}

/// Hashes a regular file in 8 KiB chunks. `None` on any read failure — the
/// caller still keeps the rest of the record, just without a checksum.
fn hash_file(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).ok()?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(unix)]
fn file_attrs(metadata: &std::fs::Metadata) -> (String, String, i32) {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    (
        metadata.uid().to_string(),
        metadata.gid().to_string(),
        metadata.permissions().mode() as i32,
    )
}

#[cfg(not(unix))]
fn file_attrs(_metadata: &std::fs::Metadata) -> (String, String, i32) {
    (String::new(), String::new(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scans_regular_file_without_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("run0001").join("image_0001.h5");
        std::fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        std::fs::write(&file_path, vec![0u8; 1024]).unwrap();

        let record = scan_file(&file_path, false, Some("xpptest01"), "2025-01-01T000000.000000")
            .expect("file exists");

        assert_eq!(record.size, Some(1024));
        assert_eq!(record.run, Some(1));
        assert_eq!(record.experiment.as_deref(), Some("xpptest01"));
        assert!(record.checksum.is_none());
    }

    #[test]
    fn computes_checksum_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("data.bin");
        let mut f = std::fs::File::create(&file_path).unwrap();
        f.write_all(b"Lorem ipsum dolor sit amet").unwrap();
        drop(f);

        let record = scan_file(&file_path, true, None, "2025-01-01T000000.000000").unwrap();
        assert_eq!(
            record.checksum.as_deref(),
            Some("16aba5393ad72c0041f5600ad3c2c52ec437a2f0c7fc08fadfc3c0fe9641d7a3")
        );
    }

    #[test]
    fn vanished_file_is_skipped() {
        let record = scan_file(
            Path::new("/nonexistent/path/does-not-exist"),
            false,
            None,
            "2025-01-01T000000.000000",
        );
        assert!(record.is_none());
    }

    #[test]
    fn run_extraction_matches_first_occurrence() {
        assert_eq!(extract_run("/exp/scratch/run0001/image.h5"), Some(1));
        assert_eq!(extract_run("/exp/scratch/run0042/run0099/x"), Some(42));
        assert_eq!(extract_run("/exp/scratch/no-run-here"), None);
    }
}
