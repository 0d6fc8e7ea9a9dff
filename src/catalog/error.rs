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

use std::path::PathBuf;

/// Errors surfaced across the catalog boundary. Per-file and per-directory
/// scan errors never reach this type: they are swallowed at the point of
/// occurrence (see `scanner` and `walker`).
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to write snapshot file {path}: {source}")]
    SnapshotWriteIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot file {path} is corrupt: {source}")]
    SnapshotReadCorrupt {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
