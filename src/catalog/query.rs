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

//! Answers listing, searching and aggregation over the reconstructed view,
//! without folding anything in Rust: a DuckDB connection reads the Parquet
//! files directly and does the dedup ranking itself.
//!
//! Experiment directories split into two streams so dedup ranking is only
//! paid for where it's needed:
//!   - *base-only* directories (no `delta_*` file) are read straight, with
//!     `on_disk` defaulted to `true` where null.
//!   - *has-deltas* directories go through a `QUALIFY ROW_NUMBER() OVER
//!     (PARTITION BY ... ORDER BY indexed_at DESC) = 1` rank filter, with
//!     `on_disk` re-derived from the `status` column where the raw column
//!     is null.
//! The two streams are unioned into one `files` view. All predicates that
//! come from the caller are bound parameters, never interpolated.

use std::path::{Path, PathBuf};

use duckdb::{params, types::Value, Connection};

use super::record::MetadataRecord;
use super::writer::list_all_snapshot_files;

pub struct CatalogStats {
    pub total_files: i64,
    pub total_size: i64,
    pub total_files_on_disk: i64,
    pub total_size_on_disk: i64,
    pub experiment_count: i64,
}

pub struct DirSummary {
    pub dirname: String,
    pub file_count: i64,
    pub total_size: i64,
}

/// Grouped optional predicates for `find`, mirroring the teacher's pattern
/// of bundling many optional CLI knobs into one args struct rather than a
/// long positional parameter list.
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub pattern: String,
    pub size_gt: Option<i64>,
    pub size_lt: Option<i64>,
    pub experiment: Option<String>,
    pub exclude: Vec<String>,
    pub on_disk_only: bool,
    pub removed_only: bool,
    pub skip_symlinks: bool,
}

impl FindArgs {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }
}

/// One row returned by the ad-hoc `query(sql)` escape hatch: column names
/// alongside each value, in `SELECT` order.
pub struct QueryRow {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

const SELECT_COLUMNS: &str = "path, parent_path, filename, size, mtime, owner, group_name, \
     permissions, checksum, experiment, run, indexed_at, status, on_disk";

/// Opens a fresh in-memory DuckDB connection with the `files` view wired
/// up against `catalog_root`'s experiment directories. Returns `Ok(None)`
/// if the catalog holds no snapshot files at all — callers should treat
/// that as an empty result set without touching SQL.
pub fn open_connection(catalog_root: &Path) -> anyhow::Result<Option<Connection>> {
    let (base_only, has_deltas) = discover_experiments(catalog_root)?;
    if base_only.is_empty() && has_deltas.is_empty() {
        return Ok(None);
    }

    let conn = Connection::open_in_memory()?;
    let view_sql = build_files_view_sql(&base_only, &has_deltas);
    conn.execute_batch(&format!("CREATE OR REPLACE VIEW files AS {view_sql}"))?;
    Ok(Some(conn))
}

/// Partitions every experiment directory under `catalog_root` into
/// base-only (exactly one `base_*` file, no deltas) and has-deltas.
fn discover_experiments(catalog_root: &Path) -> anyhow::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut base_only = Vec::new();
    let mut has_deltas = Vec::new();

    let entries = match std::fs::read_dir(catalog_root) {
        Ok(entries) => entries,
        Err(_) => return Ok((base_only, has_deltas)),
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let files = list_all_snapshot_files(&path);
        if files.is_empty() {
            continue;
        }

        let has_delta = files
            .iter()
            .any(|f| f.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with("delta_")).unwrap_or(false));

        if has_delta {
            has_deltas.push(path);
        } else {
            base_only.push(path);
        }
    }

    Ok((base_only, has_deltas))
}

fn build_files_view_sql(base_only: &[PathBuf], has_deltas: &[PathBuf]) -> String {
    let mut branches = Vec::new();

    if !base_only.is_empty() {
        let globs = glob_literal_array(base_only, "base_*.parquet");
        branches.push(format!(
            "SELECT path, parent_path, filename, size, mtime, owner, group_name, permissions, \
             checksum, experiment, run, indexed_at, status, COALESCE(on_disk, true) AS on_disk \
             FROM read_parquet({globs})"
        ));
    }

    if !has_deltas.is_empty() {
        let globs = glob_literal_array(has_deltas, "*.parquet");
        branches.push(format!(
            "SELECT path, parent_path, filename, size, mtime, owner, group_name, permissions, \
             checksum, experiment, run, indexed_at, status, \
             CASE WHEN on_disk IS NOT NULL THEN on_disk \
                  WHEN status IS NOT NULL THEN status <> 'removed' \
                  ELSE true END AS on_disk \
             FROM read_parquet({globs}, filename='__source_file') \
             QUALIFY ROW_NUMBER() OVER ( \
               PARTITION BY regexp_extract(__source_file, '^(.*)/(?:base|delta)_[^/]+\\.parquet$', 1), path \
               ORDER BY indexed_at DESC \
             ) = 1"
        ));
    }

    if branches.is_empty() {
        // Unreachable in practice (open_connection short-circuits first),
        // kept so this function has a total result.
        return "SELECT NULL AS path, NULL AS parent_path, NULL AS filename, NULL AS size, \
                 NULL AS mtime, NULL AS owner, NULL AS group_name, NULL AS permissions, \
                 NULL AS checksum, NULL AS experiment, NULL AS run, NULL AS indexed_at, \
                 NULL AS status, NULL AS on_disk WHERE false"
            .to_string();
    }

    branches.join(" UNION ALL ")
}

fn glob_literal_array(dirs: &[PathBuf], suffix: &str) -> String {
    let quoted: Vec<String> = dirs
        .iter()
        .map(|d| format!("'{}'", sql_quote(&format!("{}/{}", d.display(), suffix))))
        .collect();
    format!("[{}]", quoted.join(", "))
}

fn sql_quote(s: &str) -> String {
    s.replace('\'', "''")
}

pub fn ls(conn: &Connection, path: &str, on_disk_only: bool) -> anyhow::Result<Vec<MetadataRecord>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM files WHERE parent_path = ?1 AND (?2 = FALSE OR on_disk) \
         ORDER BY filename"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![path, on_disk_only], row_to_record)?;
    collect(rows)
}

pub fn ls_dirs(conn: &Connection, path: &str, on_disk_only: bool) -> anyhow::Result<Vec<DirSummary>> {
    // Trailing slashes would otherwise double up in the "?1 || '/%'" prefix
    // pattern (e.g. "/" building "//%" , which matches nothing).
    let path = path.trim_end_matches('/');
    let sql = "SELECT split_part(substr(parent_path, length(?1) + 2), '/', 1) AS dirname, \
               COUNT(*) AS file_count, COALESCE(SUM(size), 0) AS total_size \
               FROM files \
               WHERE parent_path LIKE ?1 || '/%' AND parent_path <> ?1 \
                 AND (?2 = FALSE OR on_disk) \
               GROUP BY dirname \
               HAVING dirname <> '' \
               ORDER BY dirname";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![path, on_disk_only], |row| {
        Ok(DirSummary {
            dirname: row.get(0)?,
            file_count: row.get(1)?,
            total_size: row.get(2)?,
        })
    })?;
    collect(rows)
}

pub fn count(conn: &Connection, on_disk_only: bool) -> anyhow::Result<i64> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM files WHERE (?1 = FALSE OR on_disk)")?;
    Ok(stmt.query_row(params![on_disk_only], |row| row.get(0))?)
}

pub fn total_size(conn: &Connection, on_disk_only: bool) -> anyhow::Result<i64> {
    let mut stmt =
        conn.prepare("SELECT COALESCE(SUM(size), 0) FROM files WHERE (?1 = FALSE OR on_disk)")?;
    Ok(stmt.query_row(params![on_disk_only], |row| row.get(0))?)
}

pub fn get_stats(conn: &Connection) -> anyhow::Result<CatalogStats> {
    let sql = "SELECT COUNT(*), \
                      COALESCE(SUM(size), 0), \
                      COUNT(*) FILTER (WHERE on_disk), \
                      COALESCE(SUM(size) FILTER (WHERE on_disk), 0), \
                      COUNT(DISTINCT experiment) \
               FROM files";
    let mut stmt = conn.prepare(sql)?;
    Ok(stmt.query_row([], |row| {
        Ok(CatalogStats {
            total_files: row.get(0)?,
            total_size: row.get(1)?,
            total_files_on_disk: row.get(2)?,
            total_size_on_disk: row.get(3)?,
            experiment_count: row.get(4)?,
        })
    })?)
}

pub fn find(conn: &Connection, args: &FindArgs) -> anyhow::Result<Vec<MetadataRecord>> {
    let mut sql = format!(
        "SELECT {SELECT_COLUMNS} FROM files \
         WHERE path LIKE ?1 \
           AND (?2 IS NULL OR size > ?2) \
           AND (?3 IS NULL OR size < ?3) \
           AND (?4 IS NULL OR experiment = ?4) \
           AND (?5 = FALSE OR on_disk) \
           AND (?6 = FALSE OR status = 'removed') \
           AND (?7 = FALSE OR (permissions & 61440) <> 40960)"
    );

    let mut bound: Vec<Box<dyn duckdb::ToSql>> = vec![
        Box::new(args.pattern.clone()),
        Box::new(args.size_gt),
        Box::new(args.size_lt),
        Box::new(args.experiment.clone()),
        Box::new(args.on_disk_only),
        Box::new(args.removed_only),
        Box::new(args.skip_symlinks),
    ];

    for pattern in &args.exclude {
        bound.push(Box::new(pattern.clone()));
        sql.push_str(&format!(" AND path NOT LIKE ?{}", bound.len()));
    }

    sql.push_str(" ORDER BY path");

    let params: Vec<&dyn duckdb::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), row_to_record)?;
    collect(rows)
}

/// Renders an ASCII tree of `path` down to `depth` levels, always
/// `on_disk_only = true`: pure composition of `ls_dirs` + `ls`, with
/// box-drawing connectors (`├──`, `└──`, `│`, spaces).
pub fn tree(conn: &Connection, path: &str, depth: usize) -> anyhow::Result<String> {
    let mut out = String::new();
    out.push_str(path);
    out.push('\n');
    render_tree_level(conn, path, depth, "", &mut out)?;
    Ok(out)
}

fn render_tree_level(
    conn: &Connection,
    path: &str,
    depth: usize,
    prefix: &str,
    out: &mut String,
) -> anyhow::Result<()> {
    if depth == 0 {
        return Ok(());
    }

    let dirs = ls_dirs(conn, path, true)?;
    let files = ls(conn, path, true)?;

    let total_entries = dirs.len() + files.len();
    let mut index = 0;

    for dir in &dirs {
        index += 1;
        let is_last = index == total_entries;
        let connector = if is_last { "└── " } else { "├── " };
        out.push_str(&format!(
            "{prefix}{connector}{}/ ({} files, {} bytes)\n",
            dir.dirname, dir.file_count, dir.total_size
        ));

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        // Trim any trailing slash (the root path "/" in particular) before
        // appending, or the next level's "{path}/{name}" would double up.
        let trimmed = path.trim_end_matches('/');
        let child_path = format!("{trimmed}/{}", dir.dirname);
        render_tree_level(conn, &child_path, depth - 1, &child_prefix, out)?;
    }

    for file in &files {
        index += 1;
        let is_last = index == total_entries;
        let connector = if is_last { "└── " } else { "├── " };
        out.push_str(&format!("{prefix}{connector}{}\n", file.filename));
    }

    Ok(())
}

/// Runs arbitrary read-only SQL against the `files` view. This is the one
/// escape hatch that takes the caller's text verbatim — it's meant for
/// ad-hoc exploration, not a predicate builder, so there is nothing here
/// left to parameterize.
pub fn run_query(conn: &Connection, sql: &str) -> anyhow::Result<Vec<QueryRow>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names();
    let mut rows_iter = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(row.get::<usize, Value>(i)?);
        }
        out.push(QueryRow {
            columns: columns.clone(),
            values,
        });
    }
    Ok(out)
}

fn row_to_record(row: &duckdb::Row<'_>) -> duckdb::Result<MetadataRecord> {
    use super::record::RecordStatus;

    let status: Option<String> = row.get(12)?;
    Ok(MetadataRecord {
        path: row.get(0)?,
        parent_path: row.get(1)?,
        filename: row.get(2)?,
        size: row.get(3)?,
        mtime: row.get(4)?,
        owner: row.get(5)?,
        group_name: row.get(6)?,
        permissions: row.get(7)?,
        checksum: row.get(8)?,
        experiment: row.get(9)?,
        run: row.get(10)?,
        indexed_at: row.get(11)?,
        status: status.and_then(|s| RecordStatus::parse(&s)),
        on_disk: row.get(13)?,
    })
}

fn collect<T>(rows: impl Iterator<Item = duckdb::Result<T>>) -> anyhow::Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_has_no_branches() {
        let (base_only, has_deltas): (Vec<PathBuf>, Vec<PathBuf>) = (vec![], vec![]);
        let sql = build_files_view_sql(&base_only, &has_deltas);
        assert!(sql.contains("WHERE false"));
    }

    #[test]
    fn base_only_branch_skips_ranking() {
        let base_only = vec![PathBuf::from("/catalog/expA")];
        let sql = build_files_view_sql(&base_only, &[]);
        assert!(!sql.contains("QUALIFY"));
        assert!(sql.contains("expA/base_*.parquet"));
    }

    #[test]
    fn has_deltas_branch_includes_qualify_rank() {
        let has_deltas = vec![PathBuf::from("/catalog/expB")];
        let sql = build_files_view_sql(&[], &has_deltas);
        assert!(sql.contains("QUALIFY"));
        assert!(sql.contains("expB/*.parquet"));
    }

    #[test]
    fn mixed_catalog_unions_both_branches() {
        let base_only = vec![PathBuf::from("/catalog/expA")];
        let has_deltas = vec![PathBuf::from("/catalog/expB")];
        let sql = build_files_view_sql(&base_only, &has_deltas);
        assert!(sql.contains("UNION ALL"));
    }

    #[test]
    fn sql_quote_escapes_single_quotes() {
        assert_eq!(sql_quote("o'brien"), "o''brien");
    }
}
