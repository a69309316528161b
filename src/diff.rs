//! The diff engine: edit-script types and the Myers bisect pipeline.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{cleanup, lines, text, DriftPatch};

/// The three edit operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum Op {
    Delete = -1,
    Equal = 0,
    Insert = 1,
}

/// One edit: an operation and the code units it covers.
/// `(Delete, "Hello")` removes `Hello`, `(Insert, "Goodbye")` adds
/// `Goodbye`, `(Equal, "World")` keeps `World`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff(pub(crate) Op, pub(crate) Vec<char>);

impl Diff {
    pub(crate) fn from_units(op: Op, units: &[char]) -> Self {
        Self(op, units.to_vec())
    }

    pub fn equal(text: &str) -> Self {
        Self(Op::Equal, text.chars().collect())
    }

    pub fn insert(text: &str) -> Self {
        Self(Op::Insert, text.chars().collect())
    }

    pub fn delete(text: &str) -> Self {
        Self(Op::Delete, text.chars().collect())
    }

    pub fn op(&self) -> Op {
        self.0
    }

    pub(crate) fn units(&self) -> &[char] {
        &self.1
    }

    /// The covered text.
    pub fn text(&self) -> String {
        self.1.iter().collect()
    }

    /// Length in code units.
    pub fn len(&self) -> usize {
        self.1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.1.is_empty()
    }
}

impl Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {})", self.op(), self.text())
    }
}

/// Concatenation of the units a script keeps or deletes: the source text.
pub(crate) fn text_old_units(diffs: &[Diff]) -> Vec<char> {
    diffs
        .iter()
        .filter(|diff| diff.op() != Op::Insert)
        .flat_map(|diff| diff.units().iter().copied())
        .collect()
}

/// Concatenation of the units a script keeps or inserts: the new text.
pub(crate) fn text_new_units(diffs: &[Diff]) -> Vec<char> {
    diffs
        .iter()
        .filter(|diff| diff.op() != Op::Delete)
        .flat_map(|diff| diff.units().iter().copied())
        .collect()
}

/// A half-match split: both inputs partitioned around a shared middle that
/// covers at least half of the longer input.
#[derive(Debug, PartialEq, Eq)]
struct HalfMatch<'a> {
    old_head: &'a [char],
    old_tail: &'a [char],
    new_head: &'a [char],
    new_tail: &'a [char],
    common: &'a [char],
}

impl DriftPatch {
    /// Finds the differences between two texts.
    ///
    /// # Example
    /// ```
    /// use driftpatch::DriftPatch;
    ///
    /// let dp = DriftPatch::new();
    /// let diffs = dp.diff_main("abc", "ab123c");
    /// assert_eq!(
    ///     "(Equal, ab)(Insert, 123)(Equal, c)",
    ///     diffs.iter().map(|d| d.to_string()).collect::<String>()
    /// );
    /// ```
    pub fn diff_main(&self, old: &str, new: &str) -> Vec<Diff> {
        let old: Vec<char> = old.chars().collect();
        let new: Vec<char> = new.chars().collect();

        self.diff_internal(&old, &new, self.checklines(), self.deadline())
    }

    pub(crate) fn diff_internal(
        &self,
        old: &[char],
        new: &[char],
        linemode: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> Vec<Diff> {
        if old == new {
            if old.is_empty() {
                return Vec::new();
            }
            return vec![Diff::from_units(Op::Equal, old)];
        }

        if old.is_empty() {
            return vec![Diff::from_units(Op::Insert, new)];
        }
        if new.is_empty() {
            return vec![Diff::from_units(Op::Delete, old)];
        }

        // Trim the common affixes, diff the middle, then restore them.
        let prefix = text::common_prefix(old, new);
        let suffix = text::common_suffix(&old[prefix..], &new[prefix..]);

        let mut diffs = self.compute(
            &old[prefix..old.len() - suffix],
            &new[prefix..new.len() - suffix],
            linemode,
            deadline,
        );

        if prefix > 0 {
            diffs.insert(0, Diff::from_units(Op::Equal, &old[..prefix]));
        }
        if suffix > 0 {
            diffs.push(Diff::from_units(Op::Equal, &new[new.len() - suffix..]));
        }

        cleanup::merge(&mut diffs);

        diffs
    }

    fn compute(
        &self,
        old: &[char],
        new: &[char],
        linemode: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> Vec<Diff> {
        if old.is_empty() {
            return vec![Diff::from_units(Op::Insert, new)];
        }
        if new.is_empty() {
            return vec![Diff::from_units(Op::Delete, old)];
        }

        let (long, short, old_is_long) = if old.len() > new.len() {
            (old, new, true)
        } else {
            (new, old, false)
        };

        // Shorter text inside the longer one (speedup).
        if let Some(idx) = text::index_of(long, short, 0) {
            let op = if old_is_long { Op::Delete } else { Op::Insert };
            return vec![
                Diff::from_units(op, &long[..idx]),
                Diff::from_units(Op::Equal, short),
                Diff::from_units(op, &long[idx + short.len()..]),
            ];
        }

        if short.len() == 1 {
            // Single unit with no containment above: no equality possible.
            return vec![
                Diff::from_units(Op::Delete, old),
                Diff::from_units(Op::Insert, new),
            ];
        }

        // A large shared middle lets the problem split in two.
        if let Some(hm) = self.half_match(old, new) {
            let mut diffs = self.diff_internal(hm.old_head, hm.new_head, linemode, deadline);
            diffs.push(Diff::from_units(Op::Equal, hm.common));
            diffs.extend(self.diff_internal(hm.old_tail, hm.new_tail, linemode, deadline));
            return diffs;
        }

        if linemode && old.len() > 100 && new.len() > 100 {
            return self.line_mode(old, new, deadline);
        }

        self.bisect(old, new, deadline)
    }

    fn half_match<'a>(&self, old: &'a [char], new: &'a [char]) -> Option<HalfMatch<'a>> {
        // Unbounded time means the caller wants an optimal diff.
        self.timeout()?;

        let (long, short) = if old.len() > new.len() {
            (old, new)
        } else {
            (new, old)
        };

        if long.len() < 4 || short.len() * 2 < long.len() {
            return None;
        }

        // Seed with the second quarter, then the third.
        let hm1 = Self::half_match_seed(long, short, long.len() / 4);
        let hm2 = Self::half_match_seed(long, short, long.len() / 2);

        let hm = match (hm1, hm2) {
            (None, None) => return None,
            (Some(hm), None) | (None, Some(hm)) => hm,
            (Some(hm1), Some(hm2)) => {
                // Longest middle wins; the earlier seed on ties.
                if hm1.common.len() >= hm2.common.len() {
                    hm1
                } else {
                    hm2
                }
            }
        };

        Some(if old.len() > new.len() {
            hm
        } else {
            HalfMatch {
                old_head: hm.new_head,
                old_tail: hm.new_tail,
                new_head: hm.old_head,
                new_tail: hm.old_tail,
                common: hm.common,
            }
        })
    }

    // Does a substring of `short` exist within `long` such that the
    // substring is at least half the length of `long`? `idx` seeds the
    // probe with a quarter-length substring of `long`.
    fn half_match_seed<'a>(
        long: &'a [char],
        short: &'a [char],
        idx: usize,
    ) -> Option<HalfMatch<'a>> {
        let seed = &long[idx..idx + long.len() / 4];

        let mut best: Option<HalfMatch> = None;
        let mut best_common = 0;

        let mut j = 0;
        while let Some(pos) = text::index_of(short, seed, j) {
            j = pos;

            let prefix_len = text::common_prefix(&long[idx..], &short[j..]);
            let suffix_len = text::common_suffix(&long[..idx], &short[..j]);

            if best_common < suffix_len + prefix_len {
                best_common = suffix_len + prefix_len;
                best = Some(HalfMatch {
                    old_head: &long[..idx - suffix_len],
                    old_tail: &long[idx + prefix_len..],
                    new_head: &short[..j - suffix_len],
                    new_tail: &short[j + prefix_len..],
                    common: &short[j - suffix_len..j + prefix_len],
                });
            }

            j += 1;
        }

        best.filter(|hm| hm.common.len() * 2 >= long.len())
    }

    // Quick line-level diff, then rediff the replacement blocks for
    // accuracy. Can produce non-minimal diffs.
    fn line_mode(&self, old: &[char], new: &[char], deadline: Option<DateTime<Utc>>) -> Vec<Diff> {
        let mut diffs = {
            let coding = lines::to_codes(old, new);
            let encoded = self.diff_internal(&coding.old_codes, &coding.new_codes, false, deadline);
            lines::from_codes(&encoded, &coding.lines)
        };

        // Eliminate freak matches between unrelated lines.
        cleanup::semantic(&mut diffs);

        // Rediff each run of deletions + insertions, unit by unit. The
        // trailing dummy equality flushes the final run.
        diffs.push(Diff::from_units(Op::Equal, &[]));

        let mut pointer = 0;
        let mut insert_n = 0;
        let mut delete_n = 0;
        let mut insert_data: Vec<char> = Vec::new();
        let mut delete_data: Vec<char> = Vec::new();

        while pointer < diffs.len() {
            match diffs[pointer].op() {
                Op::Insert => {
                    insert_n += 1;
                    insert_data.extend_from_slice(diffs[pointer].units());
                }
                Op::Delete => {
                    delete_n += 1;
                    delete_data.extend_from_slice(diffs[pointer].units());
                }
                Op::Equal => {
                    if delete_n >= 1 && insert_n >= 1 {
                        let start = pointer - delete_n - insert_n;
                        diffs.drain(start..pointer);
                        pointer = start;

                        let sub = self.diff_internal(&delete_data, &insert_data, false, deadline);
                        let sublen = sub.len();
                        diffs.splice(pointer..pointer, sub);
                        pointer += sublen;
                    }

                    insert_n = 0;
                    delete_n = 0;
                    insert_data.clear();
                    delete_data.clear();
                }
            }
            pointer += 1;
        }

        diffs.pop();

        diffs
    }

    // Find the middle snake, split the problem in two and recurse.
    // See Myers 1986: An O(ND) Difference Algorithm and Its Variations.
    pub(crate) fn bisect(
        &self,
        old: &[char],
        new: &[char],
        deadline: Option<DateTime<Utc>>,
    ) -> Vec<Diff> {
        let old_len = old.len() as isize;
        let new_len = new.len() as isize;

        let max_d = (old_len + new_len + 1) / 2;
        let v_offset = max_d;
        let v_len = (2 * max_d) as usize;

        let mut v1 = vec![-1_isize; v_len];
        let mut v2 = vec![-1_isize; v_len];
        v1[v_offset as usize + 1] = 0;
        v2[v_offset as usize + 1] = 0;

        let delta = old_len - new_len;
        // With an odd delta the forward path collides with the reverse one.
        let front = delta % 2 != 0;

        // Trim the k ranges once a path runs off the grid.
        let mut k1start: isize = 0;
        let mut k1end: isize = 0;
        let mut k2start: isize = 0;
        let mut k2end: isize = 0;

        for d in 0..max_d {
            // The clock is polled once per d-step, not in the inner loops.
            if let Some(deadline) = deadline {
                if Utc::now() > deadline {
                    break;
                }
            }

            // Walk the front path one step.
            let mut k1 = -d + k1start;
            while k1 <= d - k1end {
                let k1_offset = (v_offset + k1) as usize;
                let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                    v1[k1_offset + 1]
                } else {
                    v1[k1_offset - 1] + 1
                };
                let mut y1 = x1 - k1;

                while x1 < old_len && y1 < new_len && old[x1 as usize] == new[y1 as usize] {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset] = x1;

                if x1 > old_len {
                    // Ran off the right of the graph.
                    k1end += 2;
                } else if y1 > new_len {
                    // Ran off the bottom of the graph.
                    k1start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if k2_offset >= 0 && (k2_offset as usize) < v_len && v2[k2_offset as usize] != -1
                    {
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = old_len - v2[k2_offset as usize];
                        if x1 >= x2 {
                            return self.bisect_split(old, new, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }

                k1 += 2;
            }

            // Walk the reverse path one step.
            let mut k2 = -d + k2start;
            while k2 <= d - k2end {
                let k2_offset = (v_offset + k2) as usize;
                let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                    v2[k2_offset + 1]
                } else {
                    v2[k2_offset - 1] + 1
                };
                let mut y2 = x2 - k2;

                while x2 < old_len
                    && y2 < new_len
                    && old[(old_len - x2 - 1) as usize] == new[(new_len - y2 - 1) as usize]
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset] = x2;

                if x2 > old_len {
                    // Ran off the left of the graph.
                    k2end += 2;
                } else if y2 > new_len {
                    // Ran off the top of the graph.
                    k2start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if k1_offset >= 0 && (k1_offset as usize) < v_len && v1[k1_offset as usize] != -1
                    {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        let x2 = old_len - x2;
                        if x1 >= x2 {
                            return self.bisect_split(old, new, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }

                k2 += 2;
            }
        }

        // Ran out of time, or no commonality at all.
        vec![
            Diff::from_units(Op::Delete, old),
            Diff::from_units(Op::Insert, new),
        ]
    }

    fn bisect_split(
        &self,
        old: &[char],
        new: &[char],
        x: usize,
        y: usize,
        deadline: Option<DateTime<Utc>>,
    ) -> Vec<Diff> {
        let mut diffs = self.diff_internal(&old[..x], &new[..y], false, deadline);
        diffs.extend(self.diff_internal(&old[x..], &new[y..], false, deadline));
        diffs
    }

    /// Source text of a script: everything kept or deleted.
    pub fn diff_text_old(diffs: &[Diff]) -> String {
        text_old_units(diffs).into_iter().collect()
    }

    /// Destination text of a script: everything kept or inserted.
    pub fn diff_text_new(diffs: &[Diff]) -> String {
        text_new_units(diffs).into_iter().collect()
    }

    /// Edit distance of a script: insertions and deletions, with a paired
    /// delete+insert counting as one substitution.
    pub fn diff_levenshtein(diffs: &[Diff]) -> usize {
        let mut levenshtein = 0;
        let mut inserts = 0;
        let mut deletes = 0;

        for diff in diffs {
            match diff.op() {
                Op::Insert => inserts += diff.len(),
                Op::Delete => deletes += diff.len(),
                Op::Equal => {
                    levenshtein += inserts.max(deletes);
                    inserts = 0;
                    deletes = 0;
                }
            }
        }

        levenshtein + inserts.max(deletes)
    }

    /// Translates a source-text position through a script into the
    /// destination text. Positions inside a deletion land at its left edge.
    pub fn diff_x_index(diffs: &[Diff], loc: usize) -> usize {
        let mut chars1 = 0;
        let mut chars2 = 0;
        let mut last_chars1 = 0;
        let mut last_chars2 = 0;
        let mut hit: Option<&Diff> = None;

        for diff in diffs {
            if diff.op() != Op::Insert {
                chars1 += diff.len();
            }
            if diff.op() != Op::Delete {
                chars2 += diff.len();
            }
            if chars1 > loc {
                hit = Some(diff);
                break;
            }
            last_chars1 = chars1;
            last_chars2 = chars2;
        }

        if let Some(diff) = hit {
            if diff.op() == Op::Delete {
                // The location was deleted.
                return last_chars2;
            }
        }

        last_chars2 + (loc - last_chars1)
    }
}
