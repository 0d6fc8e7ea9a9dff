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

//! Human-facing CLI output. Kept separate from `tracing`: these macros are
//! the program's actual reporting surface (summaries, progress, prompts),
//! while `tracing` carries diagnostic detail that's invisible by default.

/// Prints a normal status/summary line to stdout.
macro_rules! log {
    () => { println!() };
    ($($arg:tt)*) => { println!($($arg)*) };
}

/// Prints a yellow-prefixed warning line to stderr.
macro_rules! warning {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "warning:".yellow().bold(), format!($($arg)*));
    }};
}

/// Prints a red-prefixed error line to stderr.
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "error:".red().bold(), format!($($arg)*));
    }};
}

pub(crate) use error;
pub(crate) use log;
pub(crate) use warning;
