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

use serde::{Deserialize, Serialize};

/// Discriminator carried by delta rows. Base rows instead carry `on_disk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Added,
    Modified,
    Removed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Added => "added",
            RecordStatus::Modified => "modified",
            RecordStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(RecordStatus::Added),
            "modified" => Some(RecordStatus::Modified),
            "removed" => Some(RecordStatus::Removed),
            _ => None,
        }
    }
}

/// One observed file. Exactly one of `on_disk`/`status` is set: `on_disk`
/// for rows coming from a base snapshot, `status` for rows coming from a
/// delta snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub path: String,
    pub parent_path: String,
    pub filename: String,
    pub size: Option<i64>,
    pub mtime: Option<i64>,
    pub owner: String,
    pub group_name: String,
    pub permissions: i32,
    pub checksum: Option<String>,
    pub experiment: Option<String>,
    pub run: Option<i32>,
    pub indexed_at: String,
    pub on_disk: Option<bool>,
    pub status: Option<RecordStatus>,
}

impl MetadataRecord {
    /// Invariant I1: exactly one of `on_disk`/`status` is non-null.
    pub fn is_valid_discriminator(&self) -> bool {
        self.on_disk.is_some() != self.status.is_some()
    }

    /// Debug-asserts invariant I1. Called by the writer on every row right
    /// before it's handed to the columnar encoder.
    pub fn validate(&self) {
        debug_assert!(
            self.is_valid_discriminator(),
            "row {:?} violates invariant I1: on_disk={:?}, status={:?}",
            self.path,
            self.on_disk,
            self.status
        );
    }

    pub fn mark_as_base(&mut self, on_disk: bool) {
        self.on_disk = Some(on_disk);
        self.status = None;
    }

    pub fn mark_as_delta(&mut self, status: RecordStatus) {
        self.status = Some(status);
        self.on_disk = None;
    }

    /// The effective on-disk flag a delta-derived row should report, per
    /// the selective-dedup rule in the query layer: `on_disk` itself if
    /// set, else `status != Removed`, else `true`.
    pub fn effective_on_disk(&self) -> bool {
        match (self.on_disk, self.status) {
            (Some(on_disk), _) => on_disk,
            (None, Some(RecordStatus::Removed)) => false,
            (None, Some(_)) => true,
            (None, None) => true,
        }
    }

    /// `(permissions & S_IFMT) != S_IFLNK` — true unless this is a symlink.
    #[cfg(unix)]
    pub fn is_not_symlink(&self) -> bool {
        (self.permissions & libc::S_IFMT as i32) != libc::S_IFLNK as i32
    }

    #[cfg(not(unix))]
    pub fn is_not_symlink(&self) -> bool {
        (self.permissions & 0o170_000) != 0o120_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_row_has_on_disk_only() {
        let mut r = sample();
        r.mark_as_base(true);
        assert!(r.is_valid_discriminator());
        assert_eq!(r.on_disk, Some(true));
        assert_eq!(r.status, None);
    }

    #[test]
    fn delta_row_has_status_only() {
        let mut r = sample();
        r.mark_as_delta(RecordStatus::Removed);
        assert!(r.is_valid_discriminator());
        assert_eq!(r.status, Some(RecordStatus::Removed));
        assert_eq!(r.on_disk, None);
    }

    #[test]
    fn effective_on_disk_follows_status() {
        let mut r = sample();
        r.mark_as_delta(RecordStatus::Removed);
        assert!(!r.effective_on_disk());

        r.mark_as_delta(RecordStatus::Added);
        assert!(r.effective_on_disk());

        r.mark_as_base(false);
        assert!(!r.effective_on_disk());
    }

    #[test]
    fn is_not_symlink_tests_the_file_type_bits() {
        let mut r = sample();
        r.permissions = 0o100_644; // regular file
        assert!(r.is_not_symlink());

        r.permissions = 0o120_777; // symlink
        assert!(!r.is_not_symlink());
    }

    fn sample() -> MetadataRecord {
        MetadataRecord {
            path: "/a/b/c.h5".into(),
            parent_path: "/a/b".into(),
            filename: "c.h5".into(),
            size: Some(1024),
            mtime: Some(1_700_000_000),
            owner: "1000".into(),
            group_name: "1000".into(),
            permissions: 0o100644,
            checksum: None,
            experiment: Some("xpptest01".into()),
            run: Some(1),
            indexed_at: "2025-01-01T000000.000000".into(),
            on_disk: None,
            status: None,
        }
    }
}
