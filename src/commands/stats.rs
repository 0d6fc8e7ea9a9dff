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
use crate::ui::{self, table::Table};
use crate::utils::format_size;

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "Display aggregate stats about the catalog")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let catalog = Catalog::open(&args.catalog)?;
    let stats = catalog.get_stats()?;

    let table = Table::new()
        .row("Experiments", stats.experiment_count.to_string())
        .row("Total files", stats.total_files.to_string())
        .row("Total size", format_size(stats.total_size, 2))
        .row("Files on disk", stats.total_files_on_disk.to_string())
        .row("Size on disk", format_size(stats.total_size_on_disk, 2));

    ui::cli::log!("{}", table.render());

    Ok(())
}
