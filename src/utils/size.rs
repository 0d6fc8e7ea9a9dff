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

//! Human-readable size parsing/formatting for CLI flags like `--size-gt`.

use anyhow::{bail, Context};

const UNITS: &[(&str, i64)] = &[
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("B", 1),
];

/// Parses `"128"`, `"128B"`, `"2.5MB"`, `"4GB"`, etc. A bare integer with no
/// unit is bytes.
pub fn parse_size(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty size string");
    }

    for (suffix, multiplier) in UNITS {
        if let Some(number) = s.strip_suffix(suffix) {
            let number = number.trim();
            if number.is_empty() {
                bail!("size {s:?} is missing a numeric value before {suffix}");
            }
            let value: f64 = number
                .parse()
                .with_context(|| format!("invalid numeric size {number:?} in {s:?}"))?;
            return Ok((value * *multiplier as f64) as i64);
        }
    }

    s.parse::<i64>()
        .with_context(|| format!("size {s:?} has no recognized unit (B|KB|MB|GB|TB)"))
}

/// Inverse of `parse_size`, for human display: the largest unit that keeps
/// the mantissa `>= 1`, formatted with `decimals` fractional digits.
pub fn format_size(bytes: i64, decimals: usize) -> String {
    let abs = bytes.unsigned_abs() as f64;
    for (suffix, multiplier) in UNITS {
        if *suffix == "B" {
            continue;
        }
        let multiplier = *multiplier as f64;
        if abs >= multiplier {
            return format!("{:.*} {}", decimals, bytes as f64 / multiplier, suffix);
        }
    }
    format!("{bytes} B")
}
