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

//! The columnar schema shared by every snapshot file. Column order matches
//! the field order of `MetadataRecord`; writers always emit all columns,
//! using null where the base/delta discriminator doesn't apply.

use std::sync::{Arc, OnceLock};

use arrow::array::{
    ArrayRef, BooleanArray, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::record::{MetadataRecord, RecordStatus};

static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();

pub fn catalog_schema() -> Arc<Schema> {
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Field::new("path", DataType::Utf8, false),
                Field::new("parent_path", DataType::Utf8, false),
                Field::new("filename", DataType::Utf8, false),
                Field::new("size", DataType::Int64, true),
                Field::new("mtime", DataType::Int64, true),
                Field::new("owner", DataType::Utf8, false),
                Field::new("group_name", DataType::Utf8, false),
                Field::new("permissions", DataType::Int32, false),
                Field::new("checksum", DataType::Utf8, true),
                Field::new("experiment", DataType::Utf8, true),
                Field::new("run", DataType::Int32, true),
                Field::new("indexed_at", DataType::Utf8, false),
                Field::new("on_disk", DataType::Boolean, true),
                Field::new("status", DataType::Utf8, true),
            ]))
        })
        .clone()
}

/// Builds a `RecordBatch` from in-memory records using the catalog schema.
pub fn records_to_batch(records: &[MetadataRecord]) -> anyhow::Result<RecordBatch> {
    let path: ArrayRef = Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.path)));
    let parent_path: ArrayRef =
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.parent_path)));
    let filename: ArrayRef =
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.filename)));
    let size: ArrayRef = Arc::new(Int64Array::from_iter(records.iter().map(|r| r.size)));
    let mtime: ArrayRef = Arc::new(Int64Array::from_iter(records.iter().map(|r| r.mtime)));
    let owner: ArrayRef = Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.owner)));
    let group_name: ArrayRef =
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.group_name)));
    let permissions: ArrayRef =
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.permissions)));
    let checksum: ArrayRef = Arc::new(StringArray::from_iter(
        records.iter().map(|r| r.checksum.as_deref()),
    ));
    let experiment: ArrayRef = Arc::new(StringArray::from_iter(
        records.iter().map(|r| r.experiment.as_deref()),
    ));
    let run: ArrayRef = Arc::new(Int32Array::from_iter(records.iter().map(|r| r.run)));
    let indexed_at: ArrayRef =
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.indexed_at)));
    let on_disk: ArrayRef = Arc::new(BooleanArray::from_iter(records.iter().map(|r| r.on_disk)));
    let status: ArrayRef = Arc::new(StringArray::from_iter(
        records.iter().map(|r| r.status.map(|s| s.as_str())),
    ));

    Ok(RecordBatch::try_new(
        catalog_schema(),
        vec![
            path,
            parent_path,
            filename,
            size,
            mtime,
            owner,
            group_name,
            permissions,
            checksum,
            experiment,
            run,
            indexed_at,
            on_disk,
            status,
        ],
    )?)
}

/// Inverse of `records_to_batch`, used by tests to assert round-trip fidelity.
pub fn batch_to_records(batch: &RecordBatch) -> anyhow::Result<Vec<MetadataRecord>> {
    let path = downcast_str(batch, "path")?;
    let parent_path = downcast_str(batch, "parent_path")?;
    let filename = downcast_str(batch, "filename")?;
    let size = downcast_i64(batch, "size")?;
    let mtime = downcast_i64(batch, "mtime")?;
    let owner = downcast_str(batch, "owner")?;
    let group_name = downcast_str(batch, "group_name")?;
    let permissions = downcast_i32(batch, "permissions")?;
    let checksum = downcast_str(batch, "checksum")?;
    let experiment = downcast_str(batch, "experiment")?;
    let run = downcast_i32(batch, "run")?;
    let indexed_at = downcast_str(batch, "indexed_at")?;
    let on_disk = downcast_bool(batch, "on_disk")?;
    let status = downcast_str(batch, "status")?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        out.push(MetadataRecord {
            path: path.value(i).to_string(),
            parent_path: parent_path.value(i).to_string(),
            filename: filename.value(i).to_string(),
            size: (!size.is_null(i)).then(|| size.value(i)),
            mtime: (!mtime.is_null(i)).then(|| mtime.value(i)),
            owner: owner.value(i).to_string(),
            group_name: group_name.value(i).to_string(),
            permissions: permissions.value(i),
            checksum: (!checksum.is_null(i)).then(|| checksum.value(i).to_string()),
            experiment: (!experiment.is_null(i)).then(|| experiment.value(i).to_string()),
            run: (!run.is_null(i)).then(|| run.value(i)),
            indexed_at: indexed_at.value(i).to_string(),
            on_disk: (!on_disk.is_null(i)).then(|| on_disk.value(i)),
            status: (!status.is_null(i))
                .then(|| RecordStatus::parse(status.value(i)))
                .flatten(),
        });
    }
    Ok(out)
}

fn downcast_str<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow::anyhow!("missing or malformed column {name}"))
}

fn downcast_i64<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| anyhow::anyhow!("missing or malformed column {name}"))
}

fn downcast_i32<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow::anyhow!("missing or malformed column {name}"))
}

fn downcast_bool<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a BooleanArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
        .ok_or_else(|| anyhow::anyhow!("missing or malformed column {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<MetadataRecord> {
        let mut base = MetadataRecord {
            path: "/exp/run0001/image_0001.h5".into(),
            parent_path: "/exp/run0001".into(),
            filename: "image_0001.h5".into(),
            size: Some(1024),
            mtime: Some(1_700_000_000),
            owner: "1000".into(),
            group_name: "1000".into(),
            permissions: 0o100644,
            checksum: Some("a".repeat(64)),
            experiment: Some("xpptest01".into()),
            run: Some(1),
            indexed_at: "2025-01-01T000000.000000".into(),
            on_disk: None,
            status: None,
        };
        base.mark_as_base(true);

        let mut removed = base.clone();
        removed.path = "/exp/run0001/gone.h5".into();
        removed.checksum = None;
        removed.experiment = None;
        removed.run = None;
        removed.mark_as_delta(RecordStatus::Removed);

        vec![base, removed]
    }

    #[test]
    fn round_trips_through_arrow_batch() {
        let records = sample_records();
        let batch = records_to_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().fields().len(), 14);

        let back = batch_to_records(&batch).unwrap();
        assert_eq!(back, records);
    }
}
