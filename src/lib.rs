//! Diff, match and patch for plain text.
//!
//! `driftpatch` computes minimal ordered edit scripts between two texts,
//! turns them into context-carrying patches, and applies those patches to
//! text that may have drifted since the patch was made, using a
//! bit-parallel fuzzy matcher to anchor each hunk.
//!
//! ```
//! use driftpatch::{DriftPatch, PatchInput};
//!
//! let dp = DriftPatch::new();
//! let patches = dp.patch_make(PatchInput::Texts(
//!     "The quick brown fox jumps over the lazy dog.",
//!     "That quick brown fox jumped over a lazy dog.",
//! ));
//!
//! // The base has drifted, the patches still land.
//! let (patched, ok) = dp.patch_apply(&patches, "The quick red rabbit jumps over the tired tiger.");
//! assert_eq!("That quick red rabbit jumped over a tired tiger.", patched);
//! assert_eq!(vec![true, true], ok);
//! ```

mod cleanup;
mod delta;
mod diff;
mod error;
mod html;
mod lines;
mod matcher;
mod patch;
mod percent;
mod text;

use chrono::{DateTime, TimeDelta, Utc};

pub use diff::{Diff, Op};
pub use error::Error;
pub use patch::{Patch, PatchInput, Patches};

/// The façade: owns the configuration and exposes the diff, match and
/// patch entry points. Cheap to create; independent instances can run on
/// separate threads with no coordination.
pub struct DriftPatch {
    /// Run a line-level pre-pass on large inputs to narrow the changed
    /// regions first. Faster, slightly less optimal.
    checklines: bool,
    /// Soft deadline for diffing, in milliseconds. `None` removes the
    /// limit and makes diffs deterministic and minimal.
    timeout: Option<u32>,
    /// Cost of an empty edit operation in terms of edit characters, used
    /// by the efficiency cleanup.
    edit_cost: usize,
    /// At what point is no match declared (0.0 = perfection, 1.0 = very
    /// loose).
    match_threshold: f32,
    /// How far to search for a match (0 = exact location only). A match
    /// this many units from the expected location adds 1.0 to its score.
    match_distance: usize,
    /// Pattern-length ceiling of the bit-parallel matcher.
    match_max_bits: usize,
    /// When deleting a large block (over `match_max_bits` units), how
    /// closely its content must match the expectation (0.0 = perfection,
    /// 1.0 = very loose). `match_threshold` governs the end points.
    delete_threshold: f32,
    /// Units of context kept on each side of a hunk.
    patch_margin: u8,
}

impl Default for DriftPatch {
    fn default() -> Self {
        Self {
            checklines: true,
            timeout: Some(1000),
            edit_cost: 4,
            match_threshold: 0.5,
            match_distance: 1000,
            match_max_bits: 32,
            delete_threshold: 0.5,
            patch_margin: 4,
        }
    }
}

impl DriftPatch {
    /// Creates an instance with the default settings.
    ///
    /// # Example
    /// ```
    /// use driftpatch::DriftPatch;
    ///
    /// let mut dp = DriftPatch::new();
    /// // e.g. disable the line-mode speedup for short inputs
    /// dp.set_checklines(false);
    /// let diffs = dp.diff_main("Fast enough", "Blazing fast");
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn checklines(&self) -> bool {
        self.checklines
    }

    /// Enables or disables the line-mode speedup for inputs over a hundred
    /// units a side. Defaults to `true`.
    pub fn set_checklines(&mut self, checklines: bool) {
        self.checklines = checklines;
    }

    pub(crate) fn timeout(&self) -> Option<u32> {
        self.timeout
    }

    /// Sets the diff deadline in milliseconds. `None` means unlimited
    /// time: diffs become minimal and deterministic, and the half-match
    /// speedup is disabled. Defaults to 1000 ms.
    pub fn set_timeout(&mut self, timeout: Option<u32>) {
        self.timeout = timeout;
    }

    // The instant the current diff has to finish by.
    pub(crate) fn deadline(&self) -> Option<DateTime<Utc>> {
        self.timeout
            .and_then(|ms| Utc::now().checked_add_signed(TimeDelta::milliseconds(ms as i64)))
    }

    pub(crate) fn edit_cost(&self) -> usize {
        self.edit_cost
    }

    /// Sets the cost of an edit operation for the efficiency cleanup:
    /// raising it trades larger edits for fewer boundaries. Defaults to 4.
    pub fn set_edit_cost(&mut self, edit_cost: usize) {
        self.edit_cost = edit_cost;
    }

    pub(crate) fn match_threshold(&self) -> f32 {
        self.match_threshold
    }

    /// Sets the cut-off score for a valid match: closer to 0 demands
    /// accuracy, closer to 1 accepts loose matches. Defaults to 0.5.
    pub fn set_match_threshold(&mut self, threshold: f32) {
        self.match_threshold = threshold;
    }

    pub(crate) fn match_distance(&self) -> usize {
        self.match_distance
    }

    /// Sets how far from the expected location a match may stray. 0
    /// requires the exact location. Defaults to 1000.
    pub fn set_match_distance(&mut self, distance: usize) {
        self.match_distance = distance;
    }

    pub(crate) fn match_max_bits(&self) -> usize {
        self.match_max_bits
    }

    pub(crate) fn delete_threshold(&self) -> f32 {
        self.delete_threshold
    }

    /// Sets how closely the content of a large deletion has to match the
    /// expected text during application (0.0 = perfection, 1.0 = very
    /// loose). Usually kept equal to `match_threshold`. Defaults to 0.5.
    pub fn set_delete_threshold(&mut self, threshold: f32) {
        self.delete_threshold = threshold;
    }

    pub(crate) fn patch_margin(&self) -> u8 {
        self.patch_margin
    }

    /// Sets the units of context carried on each side of a hunk.
    /// Defaults to 4.
    pub fn set_patch_margin(&mut self, margin: u8) {
        self.patch_margin = margin;
    }

    /// Runs the semantic cleanup: rewrites a machine-optimal script into a
    /// human-readable one by eliminating trivial equalities, e.g. the diff
    /// of `mouse` and `sofas` collapses to one delete + one insert.
    pub fn diff_cleanup_semantic(diffs: &mut Vec<Diff>) {
        cleanup::semantic(diffs);
    }

    /// Runs the lossless boundary shift: slides single edits between two
    /// equalities onto the most natural boundary.
    pub fn diff_cleanup_semantic_lossless(diffs: &mut Vec<Diff>) {
        cleanup::semantic_lossless(diffs);
    }

    /// Runs the efficiency cleanup: absorbs equalities shorter than the
    /// configured edit cost when that reduces the number of edits.
    pub fn diff_cleanup_efficiency(&self, diffs: &mut Vec<Diff>) {
        cleanup::efficiency(diffs, self.edit_cost);
    }

    /// Normalizes a script: merges adjacent same-op diffs, factors common
    /// affixes and drops empty entries.
    pub fn diff_cleanup_merge(diffs: &mut Vec<Diff>) {
        cleanup::merge(diffs);
    }
}
