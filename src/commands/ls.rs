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

use crate::catalog::Catalog;
use crate::ui;
use crate::utils::format_size;

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "List files (or per-directory summaries) under a path")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// Path prefix to list (use "/" for everything)
    pub path: String,

    /// Aggregate by immediate subdirectory instead of listing files
    #[clap(short = 'd', long = "dirs", default_value_t = false)]
    pub dirs: bool,

    /// Only show paths currently believed present on disk
    #[clap(long = "on-disk", default_value_t = false)]
    pub on_disk: bool,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let catalog = Catalog::open(&args.catalog)?;

    if args.dirs {
        let dirs = catalog.ls_dirs(&args.path, args.on_disk)?;
        for dir in dirs {
            ui::cli::log!("{:>8}  {:>12}  {}", dir.file_count, format_size(dir.total_size, 2), dir.dirname);
        }
        return Ok(());
    }

    let records = catalog.ls(&args.path, args.on_disk)?;
    for record in records {
        let marker = if record.effective_on_disk() { " " } else { "x" };
        ui::cli::log!("{} {:>12}  {}", marker, format_size(record.size.unwrap_or(0), 2), record.path);
    }

    Ok(())
}
