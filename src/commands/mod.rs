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

//! One file per subcommand, each exporting `CmdArgs` and `run`. `main.rs`
//! owns the top-level `clap::Parser`/`Subcommand` enum and dispatches here.

pub mod consolidate;
pub mod find;
pub mod ls;
pub mod query;
pub mod snapshot;
pub mod snapshots;
pub mod stats;
pub mod tree;

use clap::Args;

/// Flags shared by every subcommand. The catalog root is deliberately not
/// here: its position in the argument list differs per subcommand (e.g.
/// `snapshot <path> -o <catalog>` vs `ls <catalog> <path>`), so each
/// `CmdArgs` carries it directly as a positional/`-o` field instead.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase log verbosity (can be passed multiple times).
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn tracing_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
