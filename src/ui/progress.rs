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

//! Progress reporting for the `snapshot` and `consolidate` subcommands.
//!
//! There's no byte-level encode/decode split to track here (unlike a backup
//! tool moving data through a compressor): just a directory count that grows
//! as the walker discovers work, and a file count that grows as the scanner
//! catches up. Two bars share one `MultiProgress` so both move in the same
//! terminal region.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::{default_bar_draw_target, SPINNER_TICK_CHARS};

/// Shared counters plus the two bars that render them. Cloning is cheap
/// (`Arc` all the way down) so worker threads can each hold a copy.
#[derive(Clone)]
pub struct SnapshotProgress {
    dirs_seen: Arc<AtomicU64>,
    files_scanned: Arc<AtomicU64>,
    dirs_bar: ProgressBar,
    files_bar: ProgressBar,
}

impl SnapshotProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::with_draw_target(default_bar_draw_target());

        let dirs_bar = multi.add(ProgressBar::new_spinner());
        dirs_bar.set_style(
            ProgressStyle::with_template("{spinner} directories scanned: {msg}")
                .unwrap()
                .tick_chars(SPINNER_TICK_CHARS),
        );
        dirs_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        let files_bar = multi.add(ProgressBar::new_spinner());
        files_bar.set_style(
            ProgressStyle::with_template("{spinner} files indexed: {msg}")
                .unwrap()
                .tick_chars(SPINNER_TICK_CHARS),
        );
        files_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            dirs_seen: Arc::new(AtomicU64::new(0)),
            files_scanned: Arc::new(AtomicU64::new(0)),
            dirs_bar,
            files_bar,
        }
    }

    pub fn inc_dirs(&self, n: u64) {
        let total = self.dirs_seen.fetch_add(n, Ordering::Relaxed) + n;
        self.dirs_bar.set_message(total.to_string());
    }

    pub fn inc_files(&self, n: u64) {
        let total = self.files_scanned.fetch_add(n, Ordering::Relaxed) + n;
        self.files_bar.set_message(total.to_string());
    }

    pub fn finish(&self) {
        self.dirs_bar.finish_and_clear();
        self.files_bar.finish_and_clear();
    }
}

impl Default for SnapshotProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::catalog::SnapshotObserver for SnapshotProgress {
    fn on_dirs_walked(&self, n: u64) {
        self.inc_dirs(n);
    }

    fn on_files_scanned(&self, n: u64) {
        self.inc_files(n);
    }
}

/// A single spinner for coarse-grained one-shot operations (`consolidate`),
/// where there's only one number worth showing.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::with_draw_target(None, default_bar_draw_target());
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap()
                .tick_chars(SPINNER_TICK_CHARS),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish_with_message(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_calls() {
        let progress = SnapshotProgress::new();
        progress.inc_dirs(3);
        progress.inc_dirs(2);
        progress.inc_files(10);
        assert_eq!(progress.dirs_seen.load(Ordering::Relaxed), 5);
        assert_eq!(progress.files_scanned.load(Ordering::Relaxed), 10);
        progress.finish();
    }
}
