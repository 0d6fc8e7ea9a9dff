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
use colored::Colorize;

use crate::catalog::Catalog;
use crate::ui;

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "Rewrite each experiment's base + deltas into a single new base")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// Move superseded snapshot files here instead of deleting them
    #[clap(long)]
    pub archive: Option<PathBuf>,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let spinner = ui::progress::Spinner::new("consolidating");

    let catalog = Catalog::open(&args.catalog)?;
    let stats = catalog.consolidate(args.archive.as_deref())?;

    spinner.finish_with_message("done");

    ui::cli::log!(
        "{} {} {} {} {} {}",
        "experiments touched:".bold(),
        stats.experiments_touched,
        "files removed:".bold(),
        stats.files_removed,
        "files archived:".bold(),
        stats.files_archived,
    );

    Ok(())
}
