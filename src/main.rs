// lcls-catalog: persistent filesystem metadata catalog with incremental snapshots.
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

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use lcls_catalog::commands::{self, GlobalArgs};

#[derive(Parser, Debug)]
#[clap(name = "lcls-catalog", version, about = "Persistent filesystem metadata catalog")]
struct Cli {
    #[clap(flatten)]
    global: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Snapshot(commands::snapshot::CmdArgs),
    Ls(commands::ls::CmdArgs),
    Find(commands::find::CmdArgs),
    Tree(commands::tree::CmdArgs),
    Stats(commands::stats::CmdArgs),
    Query(commands::query::CmdArgs),
    Consolidate(commands::consolidate::CmdArgs),
    Snapshots(commands::snapshots::CmdArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.tracing_level().to_string())),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Snapshot(args) => commands::snapshot::run(&cli.global, args),
        Command::Ls(args) => commands::ls::run(&cli.global, args),
        Command::Find(args) => commands::find::run(&cli.global, args),
        Command::Tree(args) => commands::tree::run(&cli.global, args),
        Command::Stats(args) => commands::stats::run(&cli.global, args),
        Command::Query(args) => commands::query::run(&cli.global, args),
        Command::Consolidate(args) => commands::consolidate::run(&cli.global, args),
        Command::Snapshots(args) => commands::snapshots::run(&cli.global, args),
    };

    if let Err(err) = result {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
