//! Target-set generation (§4.H): the one-blob and array-width-sweep
//! variants of building, and the scratch-directory lifetime policy each
//! one uses.
//!
//! Grounded in
//! `original_source/sputnik/crafter.py::TestHarness.build_targets`/
//! `build_targets_array`. `cleanup_all` has no counterpart here: the
//! scratch directory used for a non-`keep_folder` build is a
//! `toolchain::ScopedTempDir`, whose `Drop` impl already removes it.

use std::path::{Path, PathBuf};

use diagnostics::SputnikError;
use harness::{Harness, TestCase};
use toolchain::ScopedTempDir;

use crate::target::Assembler;

/// The array widths `build_targets_array` iterates, `2, 2+step, ...` up
/// to and including `max`, where `step = max(⌊max·0.2⌋, 1)`. Empty when
/// `max < 2` (no width in `[2, max]` exists).
pub fn array_widths(max: usize) -> Vec<i64> {
    if max < 2 {
        return Vec::new();
    }
    let step = ((max as f64 * 0.2) as i64).max(1);
    let mut widths = Vec::new();
    let mut w: i64 = 2;
    while w <= max as i64 {
        widths.push(w);
        w += step;
    }
    widths
}

impl Assembler {
    /// Build a scratch directory for one `build_target` call, honoring
    /// `keep_folder`: a `ScopedTempDir` (always removed) when `false`, a
    /// bare, unmanaged `tempfile::TempDir` leaked into a plain path when
    /// `true` (so the caller can inspect it afterwards).
    fn build_one(
        &self,
        harness: &mut Harness,
        test: &dyn TestCase,
        target_folder: &Path,
        test_harness: bool,
        keep_folder: bool,
    ) -> Result<PathBuf, SputnikError> {
        if keep_folder {
            let tmp = tempfile::Builder::new()
                .prefix("sputnik_")
                .tempdir()
                .map_err(SputnikError::from)?
                .into_path();
            self.build_target(harness, test, &tmp, target_folder, test_harness)
        } else {
            let tmp = ScopedTempDir::new()?;
            self.build_target(harness, test, tmp.path(), target_folder, test_harness)
        }
    }

    /// One target blob under the harness's current configuration.
    pub fn build_targets(
        &self,
        harness: &mut Harness,
        test: &dyn TestCase,
        folder_iter: &mut dyn Iterator<Item = PathBuf>,
        test_harness: bool,
        keep_folder: bool,
    ) -> Result<Vec<PathBuf>, SputnikError> {
        let target_folder = folder_iter
            .next()
            .expect("folder_iter must yield at least one target folder");
        let blob = self.build_one(harness, test, &target_folder, test_harness, keep_folder)?;
        Ok(vec![blob])
    }

    /// One target blob per array width in `array_widths(general_max_array_width)`,
    /// re-running `harness.prepare(test)` between widths to recover a clean
    /// argument cache and assumption set for each.
    pub fn build_targets_array(
        &self,
        harness: &mut Harness,
        test: &dyn TestCase,
        folder_iter: &mut dyn Iterator<Item = PathBuf>,
        test_harness: bool,
        keep_folder: bool,
    ) -> Result<Vec<PathBuf>, SputnikError> {
        let max = harness.ctx().general_max_array_width;
        let mut blobs = Vec::new();

        for width in array_widths(max) {
            harness.set_array_width(width);
            harness.prepare(test)?;

            let target_folder = folder_iter
                .next()
                .expect("folder_iter must yield a target folder for every array width");
            blobs.push(self.build_one(harness, test, &target_folder, test_harness, keep_folder)?);
        }

        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_widths_matches_the_twenty_percent_step_formula() {
        assert_eq!(array_widths(10), vec![2, 4, 6, 8, 10]);
        assert_eq!(array_widths(3), vec![2, 3]);
        assert_eq!(array_widths(1), Vec::<i64>::new());
        assert_eq!(array_widths(0), Vec::<i64>::new());
    }

    #[test]
    fn array_widths_step_never_drops_below_one() {
        // max=4 -> step = max(floor(4*0.2), 1) = max(0, 1) = 1
        assert_eq!(array_widths(4), vec![2, 3, 4]);
    }
}
