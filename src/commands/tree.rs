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

use super::GlobalArgs;

#[derive(Args, Debug)]
#[clap(about = "Render an ASCII tree of a path (always on-disk-only)")]
pub struct CmdArgs {
    /// Catalog root directory
    pub catalog: PathBuf,

    /// Path to root the tree at
    pub path: String,

    /// How many directory levels to descend
    #[clap(long, default_value_t = 2)]
    pub depth: usize,
}

pub fn run(_global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let catalog = Catalog::open(&args.catalog)?;
    let rendered = catalog.tree(&args.path, args.depth)?;
    ui::cli::log!("{}", rendered.trim_end());
    Ok(())
}
