//! Bit-parallel approximate substring search (Bitap), scored by a blend of
//! edit errors and distance from the expected location.

use std::collections::HashMap;

use crate::{text, DriftPatch};

impl DriftPatch {
    /// Locates `pattern` in `text` near `loc`, tolerating errors.
    ///
    /// Returns the best-scoring position, or `None` when nothing scores
    /// within `match_threshold`. Patterns longer than `match_max_bits`
    /// never match.
    ///
    /// # Example
    /// ```
    /// use driftpatch::DriftPatch;
    ///
    /// let dp = DriftPatch::new();
    /// assert_eq!(Some(5), dp.match_main("abcdefghijk", "fgh", 5));
    /// ```
    pub fn match_main(&self, text: &str, pattern: &str, loc: usize) -> Option<usize> {
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();

        self.match_internal(&text, &pattern, loc)
    }

    pub(crate) fn match_internal(
        &self,
        text: &[char],
        pattern: &[char],
        loc: usize,
    ) -> Option<usize> {
        if text == pattern {
            // Shortcut, also covers two empty inputs.
            return Some(0);
        }

        if text.is_empty() {
            return None;
        }

        let loc = loc.min(text.len());
        if text[loc..(loc + pattern.len()).min(text.len())] == *pattern {
            // Perfect match at the perfect spot (includes an empty pattern).
            return Some(loc);
        }

        self.match_bitap(text, pattern, loc)
    }

    fn match_bitap(&self, text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
        if pattern.is_empty() || pattern.len() > self.match_max_bits() {
            return None;
        }

        let alphabet = Self::match_alphabet(pattern);

        // Highest score beyond which we give up.
        let mut score_threshold = self.match_threshold();

        // Is there a nearby exact match? (speedup)
        if let Some(best_loc) = text::index_of(text, pattern, loc) {
            score_threshold = self
                .bitap_score(0, best_loc, loc, pattern.len())
                .min(score_threshold);

            // What about in the other direction? (speedup)
            if let Some(best_loc) = text::last_index_of(text, pattern, loc + pattern.len()) {
                score_threshold = self
                    .bitap_score(0, best_loc, loc, pattern.len())
                    .min(score_threshold);
            }
        }

        let match_mask: u64 = 1 << (pattern.len() - 1);
        let mut best_loc: Option<usize> = None;

        let mut bin_max = pattern.len() + text.len();
        let mut last_rd: Vec<u64> = Vec::new();

        for d in 0..pattern.len() {
            // How far from `loc` can a match at this error level stray and
            // still beat the threshold? Binary search for the radius.
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                if self.bitap_score(d, loc + bin_mid, loc, pattern.len()) <= score_threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            // This radius caps the next error level too.
            bin_max = bin_mid;

            let mut start = 1.max(loc as isize - bin_mid as isize + 1) as usize;
            let finish = (loc + bin_mid).min(text.len()) + pattern.len();

            let mut rd = vec![0_u64; finish + 2];
            rd[finish + 1] = (1 << d) - 1;

            let mut j = finish;
            while j >= start {
                let char_match = if text.len() < j {
                    // Out of range.
                    0
                } else {
                    alphabet.get(&text[j - 1]).copied().unwrap_or(0)
                };

                rd[j] = if d == 0 {
                    // First pass: exact match only.
                    ((rd[j + 1] << 1) | 1) & char_match
                } else {
                    // Subsequent passes: fuzzy match.
                    (((rd[j + 1] << 1) | 1) & char_match)
                        | (((last_rd[j + 1] | last_rd[j]) << 1) | 1)
                        | last_rd[j + 1]
                };

                if rd[j] & match_mask != 0 {
                    let score = self.bitap_score(d, j - 1, loc, pattern.len());
                    // This match will almost certainly be better than any
                    // existing one, but check anyway.
                    if score <= score_threshold {
                        score_threshold = score;
                        best_loc = Some(j - 1);
                        if j - 1 > loc {
                            // When passing loc, don't exceed the current
                            // distance from it.
                            start = 1.max(2 * loc as isize - (j as isize - 1)) as usize;
                        } else {
                            // Already passed loc: downhill from here.
                            break;
                        }
                    }
                }

                j -= 1;
            }

            // No hope for a better match at greater error levels.
            if self.bitap_score(d + 1, loc, loc, pattern.len()) > score_threshold {
                break;
            }

            last_rd = rd;
        }

        best_loc
    }

    // One bit per pattern position, indexed by unit.
    fn match_alphabet(pattern: &[char]) -> HashMap<char, u64> {
        let mut masks = HashMap::with_capacity(pattern.len());

        for (i, &unit) in pattern.iter().enumerate() {
            let mask = masks.entry(unit).or_insert(0_u64);
            *mask |= 1 << (pattern.len() - i - 1);
        }

        masks
    }

    // Score for a match with `errors` errors at position `x`: 0.0 is a
    // perfect match, 1.0 a complete mismatch.
    fn bitap_score(&self, errors: usize, x: usize, loc: usize, pattern_len: usize) -> f32 {
        let accuracy = errors as f32 / pattern_len as f32;
        let proximity = (loc as isize - x as isize).unsigned_abs();

        if self.match_distance() == 0 {
            // Any displacement is fatal.
            return if proximity == 0 { accuracy } else { 1.0 };
        }

        accuracy + proximity as f32 / self.match_distance() as f32
    }
}
