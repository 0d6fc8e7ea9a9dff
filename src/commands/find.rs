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

use anyhow::{bail, Result};
use clap::Args;

use crate::catalog::{Catalog, FindArgs};
use crate::ui;
use crate::utils::{format_size, parse_size};

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "Search for files by SQL-LIKE pattern and metadata predicates")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// SQL-LIKE pattern matched against the full path (e.g. "%image_%")
    pub pattern: String,

    /// Only paths with size strictly greater than this (accepts "1KB", "2.5MB", ...)
    #[clap(long = "size-gt")]
    pub size_gt: Option<String>,

    /// Only paths with size strictly less than this
    #[clap(long = "size-lt")]
    pub size_lt: Option<String>,

    /// Restrict to a single experiment label
    #[clap(short = 'e', long)]
    pub experiment: Option<String>,

    /// Exclude paths matching this SQL-LIKE pattern (repeatable)
    #[clap(long = "exclude")]
    pub exclude: Vec<String>,

    /// Only paths currently believed present on disk
    #[clap(long = "on-disk", conflicts_with = "removed")]
    pub on_disk: bool,

    /// Only paths whose latest delta row marks them removed
    #[clap(long = "removed", conflicts_with = "on_disk")]
    pub removed: bool,

    /// Skip symlinks (tests the file-type bits of `permissions`)
    #[clap(long = "skip-symlinks", default_value_t = false)]
    pub skip_symlinks: bool,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let size_gt = args.size_gt.as_deref().map(parse_size).transpose()?;
    let size_lt = args.size_lt.as_deref().map(parse_size).transpose()?;
    if let (Some(gt), Some(lt)) = (size_gt, size_lt) {
        if gt >= lt {
            bail!("--size-gt ({gt}) must be less than --size-lt ({lt})");
        }
    }

    let catalog = Catalog::open(&args.catalog)?;
    let find_args = FindArgs {
        pattern: args.pattern.clone(),
        size_gt,
        size_lt,
        experiment: args.experiment.clone(),
        exclude: args.exclude.clone(),
        on_disk_only: args.on_disk,
        removed_only: args.removed,
        skip_symlinks: args.skip_symlinks,
    };

    let records = catalog.find(&find_args)?;
    for record in &records {
        let marker = if record.effective_on_disk() { " " } else { "x" };
        ui::cli::log!("{} {:>12}  {}", marker, format_size(record.size.unwrap_or(0), 2), record.path);
    }
    ui::cli::log!("{} matched", records.len());

    Ok(())
}
