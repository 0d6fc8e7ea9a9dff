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

use anyhow::Result;
use clap::Args;
use duckdb::types::Value;

use crate::catalog::Catalog;
use crate::ui;

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(
    about = "Run an ad-hoc read-only SQL query against the reconstructed `files` view",
    long_about = "Run an ad-hoc read-only SQL query against the reconstructed `files` view. \
                  The table name is always `files`; columns match the metadata schema plus \
                  the derived `on_disk` boolean."
)]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// SQL statement, e.g. "SELECT path FROM files WHERE run = 3"
    pub sql: String,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let catalog = Catalog::open(&args.catalog)?;
    let rows = catalog.query(&args.sql)?;

    if rows.is_empty() {
        ui::cli::log!("{}", "(no rows)");
        return Ok(());
    }

    ui::cli::log!("{}", rows[0].columns.join("\t"));
    for row in &rows {
        let rendered: Vec<String> = row.values.iter().map(render_value).collect();
        ui::cli::log!("{}", rendered.join("\t"));
    }

    Ok(())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!("{other:?}"),
    }
}
