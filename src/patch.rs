//! Hunks: construction, serialization, splitting, padding and
//! drift-tolerant application.

use std::fmt::Display;

use crate::diff::{self, Diff, Op};
use crate::{cleanup, percent, text, DriftPatch, Error};

/// A localized edit script with coordinates and surrounding context.
///
/// `start1`/`length1` address the source text, `start2`/`length2` the
/// destination text. Once context has been added the script begins and
/// ends with equality runs, except at document edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub(crate) diffs: Vec<Diff>,
    pub(crate) start1: usize,
    pub(crate) start2: usize,
    pub(crate) length1: usize,
    pub(crate) length2: usize,
}

pub type Patches = Vec<Patch>;

impl Patch {
    pub fn diffs(&self) -> &[Diff] {
        &self.diffs
    }

    pub fn start1(&self) -> usize {
        self.start1
    }

    pub fn start2(&self) -> usize {
        self.start2
    }

    pub fn length1(&self) -> usize {
        self.length1
    }

    pub fn length2(&self) -> usize {
        self.length2
    }
}

impl Display for Patch {
    /// Renders the hunk in the unified-diff-like wire format:
    /// `@@ -s1,l1 +s2,l2 @@` followed by sign-prefixed payload lines.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let coords1 = if self.length1 == 0 {
            format!("{},0", self.start1)
        } else if self.length1 == 1 {
            format!("{}", self.start1 + 1)
        } else {
            format!("{},{}", self.start1 + 1, self.length1)
        };

        let coords2 = if self.length2 == 0 {
            format!("{},0", self.start2)
        } else if self.length2 == 1 {
            format!("{}", self.start2 + 1)
        } else {
            format!("{},{}", self.start2 + 1, self.length2)
        };

        writeln!(f, "@@ -{coords1} +{coords2} @@")?;

        for diff in &self.diffs {
            let sign = match diff.op() {
                Op::Insert => '+',
                Op::Delete => '-',
                Op::Equal => ' ',
            };
            writeln!(f, "{sign}{}", percent::encode(diff.units()))?;
        }

        Ok(())
    }
}

/// The inputs `patch_make` accepts. Prefer [`PatchInput::TextDiffs`] when
/// both pieces are at hand; the other shapes compute the missing one.
pub enum PatchInput<'a> {
    Texts(&'a str, &'a str),
    Diffs(&'a [Diff]),
    TextDiffs(&'a str, &'a [Diff]),
}

impl DriftPatch {
    /// Builds a list of hunks that transform one text into another.
    ///
    /// # Example
    /// ```
    /// use driftpatch::{DriftPatch, PatchInput};
    ///
    /// let dp = DriftPatch::new();
    /// let patches = dp.patch_make(PatchInput::Texts(
    ///     "Apples are a fruit.",
    ///     "Bananas are also fruit.",
    /// ));
    /// let (patched, ok) = dp.patch_apply(&patches, "Apples are a fruit.");
    /// assert_eq!("Bananas are also fruit.", patched);
    /// assert!(ok.iter().all(|&flag| flag));
    /// ```
    pub fn patch_make(&self, input: PatchInput) -> Patches {
        match input {
            PatchInput::Texts(old, new) => {
                let mut diffs = self.diff_main(old, new);
                if diffs.len() > 2 {
                    cleanup::semantic(&mut diffs);
                    cleanup::efficiency(&mut diffs, self.edit_cost());
                }
                let old: Vec<char> = old.chars().collect();
                self.patch_make_internal(&old, &diffs)
            }
            PatchInput::Diffs(diffs) => {
                // No origin text provided, reconstruct it.
                let old = diff::text_old_units(diffs);
                self.patch_make_internal(&old, diffs)
            }
            PatchInput::TextDiffs(old, diffs) => {
                let old: Vec<char> = old.chars().collect();
                self.patch_make_internal(&old, diffs)
            }
        }
    }

    fn patch_make_internal(&self, text: &[char], diffs: &[Diff]) -> Patches {
        if diffs.is_empty() {
            return Vec::new();
        }

        let margin = self.patch_margin() as usize;

        let mut patches = Vec::new();
        let mut patch = Patch::default();

        // Cursors into the pre- and post-edit texts.
        let mut chars1 = 0;
        let mut chars2 = 0;

        // Unlike unidiff, hunk context is rolling: it reflects the text
        // with all earlier hunks already applied.
        let mut prepatch: Vec<char> = text.to_vec();
        let mut postpatch: Vec<char> = prepatch.clone();

        for (idx, diff) in diffs.iter().enumerate() {
            if patch.diffs.is_empty() && diff.op() != Op::Equal {
                // A new patch starts here.
                patch.start1 = chars1;
                patch.start2 = chars2;
            }

            match diff.op() {
                Op::Insert => {
                    patch.length2 += diff.len();
                    postpatch =
                        [&postpatch[..chars2], diff.units(), &postpatch[chars2..]].concat();
                    patch.diffs.push(diff.clone());
                }
                Op::Delete => {
                    patch.length1 += diff.len();
                    postpatch =
                        [&postpatch[..chars2], &postpatch[chars2 + diff.len()..]].concat();
                    patch.diffs.push(diff.clone());
                }
                Op::Equal => {
                    if diff.len() <= 2 * margin && !patch.diffs.is_empty() && idx + 1 != diffs.len()
                    {
                        // Small equality inside a patch.
                        patch.length1 += diff.len();
                        patch.length2 += diff.len();
                        patch.diffs.push(diff.clone());
                    } else if diff.len() >= 2 * margin && !patch.diffs.is_empty() {
                        // Time for a new patch.
                        self.patch_add_context(&mut patch, &prepatch);
                        patches.push(std::mem::take(&mut patch));
                        prepatch.clone_from(&postpatch);
                        chars1 = chars2;
                    }
                }
            }

            if diff.op() != Op::Insert {
                chars1 += diff.len();
            }
            if diff.op() != Op::Delete {
                chars2 += diff.len();
            }
        }

        // Pick up the leftover patch if not empty.
        if !patch.diffs.is_empty() {
            self.patch_add_context(&mut patch, &prepatch);
            patches.push(patch);
        }

        patches
    }

    // Grows the hunk's context until its pattern is unique in `text`, then
    // adds one margin of context on each side for good measure.
    fn patch_add_context(&self, patch: &mut Patch, text: &[char]) {
        if text.is_empty() {
            return;
        }

        let margin = self.patch_margin() as usize;
        let mut padding = 0;

        let clamp = |at: usize| at.min(text.len());
        let mut pattern =
            &text[clamp(patch.start2)..clamp(patch.start2 + patch.length1)];

        // An empty pattern is never unique, which forces at least one
        // round of growth.
        while text::index_of(text, pattern, 0) != text::last_index_of(text, pattern, text.len())
            && pattern.len() < self.match_max_bits() - 2 * margin
        {
            padding += margin;
            pattern = &text[patch.start2.saturating_sub(padding)
                ..clamp(patch.start2 + patch.length1 + padding)];
        }

        // One chunk for good luck.
        padding += margin;

        let prefix = &text[patch.start2.saturating_sub(padding)..clamp(patch.start2)];
        if !prefix.is_empty() {
            patch.diffs.insert(0, Diff::from_units(Op::Equal, prefix));
        }

        let suffix = &text
            [clamp(patch.start2 + patch.length1)..clamp(patch.start2 + patch.length1 + padding)];
        if !suffix.is_empty() {
            patch.diffs.push(Diff::from_units(Op::Equal, suffix));
        }

        // Roll back the start points and extend the lengths.
        patch.start1 -= prefix.len();
        patch.start2 -= prefix.len();
        patch.length1 += prefix.len() + suffix.len();
        patch.length2 += prefix.len() + suffix.len();
    }

    /// Serializes a patch list to its textual form.
    pub fn patch_to_text(&self, patches: &Patches) -> String {
        patches.iter().map(|patch| patch.to_string()).collect()
    }

    /// Parses a block of text produced by
    /// [`patch_to_text`](Self::patch_to_text) back into a patch list.
    pub fn patch_from_text(&self, input: &str) -> Result<Patches, Error> {
        let mut patches = Vec::new();
        if input.is_empty() {
            return Ok(patches);
        }

        let lines: Vec<&str> = input.split('\n').collect();
        let mut cursor = 0;

        while cursor < lines.len() {
            let line = lines[cursor];
            if line.is_empty() {
                cursor += 1;
                continue;
            }

            let bad_line = || Error::InvalidPatchText(line.to_string());

            let (start1, cols1, start2, cols2) = parse_header(line).ok_or_else(bad_line)?;
            let mut patch = Patch {
                start1,
                start2,
                ..Default::default()
            };

            match cols1 {
                None => {
                    patch.start1 = start1.checked_sub(1).ok_or_else(bad_line)?;
                    patch.length1 = 1;
                }
                Some(0) => patch.length1 = 0,
                Some(cols) => {
                    patch.start1 = start1.checked_sub(1).ok_or_else(bad_line)?;
                    patch.length1 = cols;
                }
            }

            match cols2 {
                None => {
                    patch.start2 = start2.checked_sub(1).ok_or_else(bad_line)?;
                    patch.length2 = 1;
                }
                Some(0) => patch.length2 = 0,
                Some(cols) => {
                    patch.start2 = start2.checked_sub(1).ok_or_else(bad_line)?;
                    patch.length2 = cols;
                }
            }

            cursor += 1;

            while cursor < lines.len() {
                let line = lines[cursor];
                if line.is_empty() {
                    cursor += 1;
                    continue;
                }

                let bad_line = || Error::InvalidPatchText(line.to_string());

                let mut chars = line.chars();
                let sign = chars.next().ok_or_else(bad_line)?;
                if sign == '@' {
                    // Start of the next patch.
                    break;
                }

                let units = percent::decode(chars.as_str()).ok_or_else(bad_line)?;
                match sign {
                    '-' => patch.diffs.push(Diff::from_units(Op::Delete, &units)),
                    '+' => patch.diffs.push(Diff::from_units(Op::Insert, &units)),
                    ' ' => patch.diffs.push(Diff::from_units(Op::Equal, &units)),
                    _ => return Err(bad_line()),
                }

                cursor += 1;
            }

            patches.push(patch);
        }

        Ok(patches)
    }

    /// Breaks up any hunk longer than the matcher's pattern limit into
    /// consecutive smaller hunks. Called by `patch_apply`.
    pub fn patch_split_max(&self, patches: &mut Patches) {
        let max_bits = self.match_max_bits();
        let margin = self.patch_margin() as usize;

        let mut idx = 0;
        while idx < patches.len() {
            if patches[idx].length1 <= max_bits {
                idx += 1;
                continue;
            }

            let mut bigpatch = patches.remove(idx);
            let mut start1 = bigpatch.start1;
            let mut start2 = bigpatch.start2;

            let mut precontext: Vec<char> = Vec::new();
            let mut subpatches: Vec<Patch> = Vec::new();

            while !bigpatch.diffs.is_empty() {
                let mut patch = Patch {
                    start1: start1 - precontext.len(),
                    start2: start2 - precontext.len(),
                    ..Default::default()
                };
                let mut empty = true;

                if !precontext.is_empty() {
                    patch.length1 = precontext.len();
                    patch.length2 = precontext.len();
                    patch.diffs.push(Diff::from_units(Op::Equal, &precontext));
                }

                while !bigpatch.diffs.is_empty() && patch.length1 < max_bits - margin {
                    let op = bigpatch.diffs[0].op();

                    if op == Op::Insert {
                        // Insertions are harmless.
                        patch.length2 += bigpatch.diffs[0].len();
                        start2 += bigpatch.diffs[0].len();
                        patch.diffs.push(bigpatch.diffs.remove(0));
                        empty = false;
                    } else if op == Op::Delete
                        && patch.diffs.len() == 1
                        && patch.diffs[0].op() == Op::Equal
                        && bigpatch.diffs[0].len() > 2 * max_bits
                    {
                        // A monster delete: pass it through in one chunk.
                        patch.length1 += bigpatch.diffs[0].len();
                        start1 += bigpatch.diffs[0].len();
                        patch.diffs.push(bigpatch.diffs.remove(0));
                        empty = false;
                    } else {
                        // Deletion or equality; take as much as fits.
                        let take = bigpatch.diffs[0]
                            .len()
                            .min(max_bits - patch.length1 - margin);
                        let taken = bigpatch.diffs[0].units()[..take].to_vec();

                        patch.length1 += taken.len();
                        start1 += taken.len();
                        if op == Op::Equal {
                            patch.length2 += taken.len();
                            start2 += taken.len();
                        } else {
                            empty = false;
                        }

                        patch.diffs.push(Diff::from_units(op, &taken));

                        if taken.len() == bigpatch.diffs[0].len() {
                            bigpatch.diffs.remove(0);
                        } else {
                            let rest = bigpatch.diffs[0].units()[taken.len()..].to_vec();
                            bigpatch.diffs[0] = Diff::from_units(op, &rest);
                        }
                    }
                }

                // The head context for the next patch.
                precontext = diff::text_new_units(&patch.diffs);
                if precontext.len() > margin {
                    precontext.drain(..precontext.len() - margin);
                }

                // The tail context for this patch.
                let mut postcontext = diff::text_old_units(&bigpatch.diffs);
                postcontext.truncate(margin);

                if !postcontext.is_empty() {
                    patch.length1 += postcontext.len();
                    patch.length2 += postcontext.len();

                    let grown = match patch.diffs.last_mut() {
                        Some(last) if last.op() == Op::Equal => {
                            last.1.extend_from_slice(&postcontext);
                            true
                        }
                        _ => false,
                    };
                    if !grown {
                        patch.diffs.push(Diff::from_units(Op::Equal, &postcontext));
                    }
                }

                if !empty {
                    subpatches.push(patch);
                }
            }

            let added = subpatches.len();
            patches.splice(idx..idx, subpatches);
            idx += added;
        }
    }

    // Pads the virtual text with sentinel units on both sides so edits at
    // the document edges have context to anchor on. Returns the padding.
    fn patch_add_padding(&self, patches: &mut Patches) -> Vec<char> {
        let pad_len = self.patch_margin() as usize;
        let null_pad: Vec<char> = (1..=self.patch_margin() as u32)
            .filter_map(char::from_u32)
            .collect();

        // Bump all the patches forward.
        for patch in patches.iter_mut() {
            patch.start1 += pad_len;
            patch.start2 += pad_len;
        }

        // Padding on the start of the first diff.
        if let Some(first) = patches.first_mut() {
            let (add_pad, grow) = match first.diffs.first() {
                Some(diff) => (diff.op() != Op::Equal, pad_len > diff.len()),
                None => (true, false),
            };

            if add_pad {
                first.diffs.insert(0, Diff::from_units(Op::Equal, &null_pad));
                first.start1 -= pad_len;
                first.start2 -= pad_len;
                first.length1 += pad_len;
                first.length2 += pad_len;
            } else if grow {
                // Grow the first equality backwards into the padding.
                if let Some(diff) = first.diffs.first_mut() {
                    let extra = pad_len - diff.len();
                    let mut grown = null_pad[diff.len()..].to_vec();
                    grown.extend_from_slice(diff.units());
                    *diff = Diff::from_units(Op::Equal, &grown);
                    first.start1 -= extra;
                    first.start2 -= extra;
                    first.length1 += extra;
                    first.length2 += extra;
                }
            }
        }

        // Padding on the end of the last diff.
        if let Some(last) = patches.last_mut() {
            let (add_pad, grow) = match last.diffs.last() {
                Some(diff) => (diff.op() != Op::Equal, pad_len > diff.len()),
                None => (true, false),
            };

            if add_pad {
                last.diffs.push(Diff::from_units(Op::Equal, &null_pad));
                last.length1 += pad_len;
                last.length2 += pad_len;
            } else if grow {
                // Grow the last equality forwards into the padding.
                if let Some(diff) = last.diffs.last_mut() {
                    let extra = pad_len - diff.len();
                    diff.1.extend_from_slice(&null_pad[..extra]);
                    last.length1 += extra;
                    last.length2 += extra;
                }
            }
        }

        null_pad
    }

    /// Applies a patch list to a text that may have drifted since the
    /// patches were made.
    ///
    /// Returns the patched text plus one success flag per (possibly
    /// split) hunk; a failed hunk leaves its region untouched. The
    /// caller's patch list is never mutated.
    pub fn patch_apply(&self, patches: &Patches, source: &str) -> (String, Vec<bool>) {
        let source: Vec<char> = source.chars().collect();
        let (patched, results) = self.patch_apply_internal(patches, &source);

        (patched.into_iter().collect(), results)
    }

    fn patch_apply_internal(
        &self,
        patches: &Patches,
        source: &[char],
    ) -> (Vec<char>, Vec<bool>) {
        if patches.is_empty() {
            return (source.to_vec(), Vec::new());
        }

        let deadline = self.deadline();
        let max_bits = self.match_max_bits();

        // Work on copies so the caller's patches stay pristine.
        let mut patches = patches.clone();
        let null_pad = self.patch_add_padding(&mut patches);
        let mut source: Vec<char> = [&null_pad[..], source, &null_pad[..]].concat();
        self.patch_split_max(&mut patches);

        // Running offset between expected and actual hunk locations. If
        // hunks were expected at 10 and 20 but the first lands at 12,
        // the second is looked for at 22.
        let mut delta: isize = 0;
        let mut results = vec![false; patches.len()];

        for (x, patch) in patches.iter().enumerate() {
            let expected = patch.start2 as isize + delta;
            // The matcher clamps its hint; the delta bookkeeping must not.
            let expected_loc = expected.max(0) as usize;
            let txt_old = diff::text_old_units(&patch.diffs);

            let (start_loc, end_loc) = if txt_old.len() > max_bits {
                // split_max only leaves an oversized pattern behind for a
                // monster delete; anchor its head and tail separately.
                match self.match_internal(&source, &txt_old[..max_bits], expected_loc) {
                    Some(head) => {
                        let tail = self.match_internal(
                            &source,
                            &txt_old[txt_old.len() - max_bits..],
                            expected_loc + txt_old.len() - max_bits,
                        );
                        match tail {
                            // The tail must land after the head.
                            Some(tail_loc) if head < tail_loc => (Some(head), tail),
                            _ => (None, tail),
                        }
                    }
                    None => (None, None),
                }
            } else {
                (self.match_internal(&source, &txt_old, expected_loc), None)
            };

            let start = match start_loc {
                Some(start) => start,
                None => {
                    // No match. Drop this hunk's delta from the ones ahead.
                    delta -= patch.length2 as isize - patch.length1 as isize;
                    continue;
                }
            };

            results[x] = true;
            delta = start as isize - expected;

            let found_end = match end_loc {
                Some(end) => (end + max_bits).min(source.len()),
                None => (start + txt_old.len()).min(source.len()),
            };
            let txt_new = source[start..found_end].to_vec();

            if txt_old == txt_new {
                // Perfect match, shove the replacement text in.
                source = [
                    &source[..start],
                    &diff::text_new_units(&patch.diffs)[..],
                    &source[start + txt_old.len()..],
                ]
                .concat();
                continue;
            }

            // Imperfect match: diff what was expected against what was
            // found, then splice the hunk's edits through that mapping.
            let mut diffs = self.diff_internal(&txt_old, &txt_new, false, deadline);
            if txt_old.len() > max_bits
                && Self::diff_levenshtein(&diffs) as f32 / txt_old.len() as f32
                    > self.delete_threshold()
            {
                // The end points match but the content is unacceptably bad.
                results[x] = false;
                continue;
            }

            cleanup::semantic_lossless(&mut diffs);

            let mut idx1 = 0;
            for diff in &patch.diffs {
                if diff.op() != Op::Equal {
                    let idx2 = Self::diff_x_index(&diffs, idx1);
                    match diff.op() {
                        Op::Insert => {
                            source = [
                                &source[..start + idx2],
                                diff.units(),
                                &source[start + idx2..],
                            ]
                            .concat();
                        }
                        Op::Delete => {
                            let del_end = start + Self::diff_x_index(&diffs, idx1 + diff.len());
                            source = [&source[..start + idx2], &source[del_end..]].concat();
                        }
                        Op::Equal => {}
                    }
                }
                if diff.op() != Op::Delete {
                    idx1 += diff.len();
                }
            }
        }

        // Strip the padding off.
        let trimmed = source[null_pad.len()..source.len() - null_pad.len()].to_vec();

        (trimmed, results)
    }
}

// `@@ -<s1>[,<l1>] +<s2>[,<l2>] @@`
fn parse_header(line: &str) -> Option<(usize, Option<usize>, usize, Option<usize>)> {
    let body = line.strip_prefix("@@ -")?.strip_suffix(" @@")?;
    let (old, new) = body.split_once(" +")?;

    let parse_coords = |coords: &str| -> Option<(usize, Option<usize>)> {
        match coords.split_once(',') {
            Some((start, len)) => Some((start.parse().ok()?, Some(len.parse().ok()?))),
            None => Some((coords.parse().ok()?, None)),
        }
    };

    let (start1, cols1) = parse_coords(old)?;
    let (start2, cols2) = parse_coords(new)?;

    Some((start1, cols1, start2, cols2))
}
