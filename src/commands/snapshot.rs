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

use crate::catalog::{Catalog, SnapshotObserver};
use crate::ui;

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "Walk a directory tree and record a new snapshot")]
pub struct CmdArgs {
    /// Root directory to walk
    pub path: PathBuf,

    /// Catalog root directory (created if absent)
    #[clap(short = 'o', long = "out", value_parser)]
    pub catalog: PathBuf,

    /// Experiment label (defaults to an MD5 prefix of the resolved path)
    #[clap(short = 'e', long)]
    pub experiment: Option<String>,

    /// Hash file contents with SHA-256
    #[clap(long, default_value_t = false)]
    pub checksum: bool,

    /// Number of walker/scanner worker threads (defaults to the machine's
    /// core count; pass 1 to force the deterministic sequential walk)
    #[clap(long, default_value_t = default_workers())]
    pub workers: usize,

    /// Directories pulled per round by the parallel walker (workers > 1 only)
    #[clap(long)]
    pub batch_size: Option<usize>,
}

fn default_workers() -> usize {
    num_cpus::get()
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let progress = ui::progress::SnapshotProgress::new();

    let catalog = Catalog::open(&args.catalog)?;
    let (added, modified, removed) = catalog.snapshot_with_observer(
        &args.path,
        args.experiment.as_deref(),
        args.checksum,
        args.workers,
        args.batch_size,
        Some(&progress as &dyn SnapshotObserver),
    )?;

    progress.finish();

    if added == 0 && modified == 0 && removed == 0 {
        ui::cli::log!("{}", "No changes detected".dimmed());
    } else {
        ui::cli::log!(
            "{} {} {} {} {} {}",
            "added:".bold().green(),
            added,
            "modified:".bold().yellow(),
            modified,
            "removed:".bold().red(),
            removed,
        );
    }

    Ok(())
}
