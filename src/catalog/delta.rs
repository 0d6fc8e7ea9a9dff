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

//! Three-way diff between a freshly scanned directory listing and the
//! reconstructed previous state: every path is classified as added,
//! modified, or removed.

use std::collections::BTreeMap;

use super::record::{MetadataRecord, RecordStatus};

#[derive(Debug, Default, Clone)]
pub struct DeltaResult {
    pub added: Vec<MetadataRecord>,
    pub modified: Vec<MetadataRecord>,
    pub removed: Vec<MetadataRecord>,
}

impl DeltaResult {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.added.len(), self.modified.len(), self.removed.len())
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// All three vectors flattened into one slice, each row already
    /// carrying the `status` its column demands — ready for `write_delta`.
    pub fn into_records(self) -> Vec<MetadataRecord> {
        let mut out = Vec::with_capacity(self.added.len() + self.modified.len() + self.removed.len());
        out.extend(self.added.into_iter().map(|mut r| {
            r.mark_as_delta(RecordStatus::Added);
            r
        }));
        out.extend(self.modified.into_iter().map(|mut r| {
            r.mark_as_delta(RecordStatus::Modified);
            r
        }));
        out.extend(self.removed);
        out
    }
}

/// A row counts as "modified" only if `size` or `mtime` differ from the
/// previous observation. Checksum is deliberately excluded: it may be
/// legitimately absent on either side when `compute_checksum` was off.
fn changed(previous: &MetadataRecord, current: &MetadataRecord) -> bool {
    previous.size != current.size || previous.mtime != current.mtime
}

/// `current` is the freshly scanned listing for one experiment, keyed by
/// path (duplicates collapse to the last scan of that path). `previous` is
/// the reconstructed prior state from `reconstruct` — every entry ever
/// observed, each carrying its own `on_disk` flag (a removed-then-absent
/// path is still present here with `on_disk = Some(false)`). `indexed_at`
/// stamps every emitted row.
pub fn compute_delta(
    current: &BTreeMap<String, MetadataRecord>,
    previous: &BTreeMap<String, MetadataRecord>,
    indexed_at: &str,
) -> DeltaResult {
    let mut result = DeltaResult::default();

    for (path, record) in current {
        match previous.get(path) {
            None => {
                let mut row = record.clone();
                row.indexed_at = indexed_at.to_string();
                result.added.push(row);
            }
            Some(prev) if prev.on_disk == Some(false) => {
                // Restoration of a path previously marked removed counts as add.
                let mut row = record.clone();
                row.indexed_at = indexed_at.to_string();
                result.added.push(row);
            }
            Some(prev) if changed(prev, record) => {
                let mut row = record.clone();
                row.indexed_at = indexed_at.to_string();
                result.modified.push(row);
            }
            Some(_) => {}
        }
    }

    for (path, prev) in previous {
        if prev.on_disk == Some(true) && !current.contains_key(path) {
            let mut row = prev.clone();
            row.indexed_at = indexed_at.to_string();
            row.mark_as_delta(RecordStatus::Removed);
            result.removed.push(row);
        }
    }

    result
}
