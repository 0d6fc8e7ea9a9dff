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

//! Folds a base snapshot plus every applicable delta into the current
//! state of an experiment: one row per path, latest-wins. A path that was
//! removed and never restored stays in the map with `on_disk = false`
//! rather than disappearing — `count()` still sees it, `count(on_disk_only)`
//! does not.

use std::collections::BTreeMap;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::error::{CatalogError, Result};
use super::record::{MetadataRecord, RecordStatus};
use super::schema::batch_to_records;
use super::writer::{applicable_deltas, base_timestamp, find_current_base};

/// The reconstructed state of an experiment at the moment of the latest
/// applied delta: every path ever observed, each carrying the `on_disk`
/// flag that reflects whether it is currently believed present.
pub fn reconstruct(dir: &Path) -> Result<BTreeMap<String, MetadataRecord>> {
    let mut state = BTreeMap::new();

    let Some(base_path) = find_current_base(dir) else {
        return Ok(state);
    };

    for record in read_parquet(&base_path)? {
        state.insert(record.path.clone(), record);
    }

    let base_ts = base_timestamp(&base_path).unwrap_or_default();
    for delta_path in applicable_deltas(dir, &base_ts) {
        apply_delta(&mut state, &read_parquet(&delta_path)?);
    }

    Ok(state)
}

/// Applies one delta's rows onto `state` in place, per the fold rule: a
/// `removed` row only flips `on_disk` to `false` and bumps `indexed_at` on
/// an existing entry (a removal for a path never seen is ignored); an
/// `added`/`modified` row overwrites the entry wholesale and forces
/// `on_disk = Some(true)`.
fn apply_delta(state: &mut BTreeMap<String, MetadataRecord>, rows: &[MetadataRecord]) {
    for row in rows {
        match row.status {
            Some(RecordStatus::Removed) => {
                if let Some(existing) = state.get_mut(&row.path) {
                    existing.on_disk = Some(false);
                    existing.status = None;
                    existing.indexed_at = row.indexed_at.clone();
                }
            }
            Some(RecordStatus::Added) | Some(RecordStatus::Modified) => {
                let mut entry = row.clone();
                entry.mark_as_base(true);
                state.insert(row.path.clone(), entry);
            }
            None => {}
        }
    }
}

fn read_parquet(path: &Path) -> Result<Vec<MetadataRecord>> {
    let file = std::fs::File::open(path).map_err(|source| CatalogError::SnapshotReadCorrupt {
        path: path.to_path_buf(),
        source: source.into(),
    })?;

    let result = (|| -> anyhow::Result<Vec<MetadataRecord>> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let mut records = Vec::new();
        for batch in reader {
            records.extend(batch_to_records(&batch?)?);
        }
        Ok(records)
    })();

    result.map_err(|source| CatalogError::SnapshotReadCorrupt {
        path: path.to_path_buf(),
        source,
    })
}
