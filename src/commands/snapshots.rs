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
#[clap(about = "List experiment directories and their snapshot files")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// Restrict to a single experiment label
    #[clap(short = 'e', long)]
    pub experiment: Option<String>,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let catalog = Catalog::open(&args.catalog)?;
    let experiments = catalog.list_snapshots(args.experiment.as_deref())?;

    if experiments.is_empty() {
        ui::cli::log!("{}", "No experiments in this catalog".dimmed());
        return Ok(());
    }

    for exp in experiments {
        ui::cli::log!("{} ({} files)", exp.experiment.bold(), exp.files.len());
        for file in &exp.files {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("?");
            let marker = if name.starts_with("base_") { "base " } else { "delta" };
            ui::cli::log!("  {} {}", marker, name);
        }
    }

    Ok(())
}
