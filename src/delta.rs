//! Compact single-line form of an edit script relative to a known source:
//! tab-separated `=n` (keep), `-n` (delete) and `+text` (insert) tokens.

use crate::diff::{Diff, Op};
use crate::{percent, DriftPatch, Error};

impl DriftPatch {
    /// Crushes a script into a delta string, e.g. `=3\t-2\t+ing` for keep 3,
    /// delete 2, insert `ing`. Inserted text is `%xx`-escaped.
    ///
    /// # Example
    /// ```
    /// use driftpatch::DriftPatch;
    ///
    /// let dp = DriftPatch::new();
    /// let diffs = dp.diff_main("The old dog", "The lazy dog");
    /// let delta = DriftPatch::diff_to_delta(&diffs);
    /// assert_eq!(diffs, DriftPatch::diff_from_delta("The old dog", &delta).unwrap());
    /// ```
    pub fn diff_to_delta(diffs: &[Diff]) -> String {
        diffs
            .iter()
            .map(|diff| match diff.op() {
                Op::Insert => format!("+{}", percent::encode(diff.units())),
                Op::Delete => format!("-{}", diff.len()),
                Op::Equal => format!("={}", diff.len()),
            })
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Rebuilds the full script from the source text and a delta produced
    /// by [`diff_to_delta`](Self::diff_to_delta).
    pub fn diff_from_delta(old: &str, delta: &str) -> Result<Vec<Diff>, Error> {
        let old: Vec<char> = old.chars().collect();

        let mut diffs = Vec::new();
        // Cursor into `old`.
        let mut pointer = 0;

        for (index, token) in delta.split('\t').enumerate() {
            if token.is_empty() {
                // Blank tokens are ok (from a blank delta).
                continue;
            }

            let invalid = || Error::InvalidDelta {
                token: token.to_string(),
                index,
            };

            // Each token leads with the operation character.
            let mut chars = token.chars();
            let opcode = chars.next();
            let param = chars.as_str();

            match opcode {
                Some('+') => {
                    let units = percent::decode(param).ok_or_else(invalid)?;
                    diffs.push(Diff::from_units(Op::Insert, &units));
                }
                Some('-') | Some('=') => {
                    let n: usize = param.parse().map_err(|_| invalid())?;

                    let end = pointer + n;
                    if end > old.len() {
                        return Err(Error::DeltaLengthMismatch {
                            consumed: end,
                            expected: old.len(),
                        });
                    }

                    let units = &old[pointer..end];
                    pointer = end;

                    if opcode == Some('=') {
                        diffs.push(Diff::from_units(Op::Equal, units));
                    } else {
                        diffs.push(Diff::from_units(Op::Delete, units));
                    }
                }
                _ => return Err(invalid()),
            }
        }

        if pointer != old.len() {
            return Err(Error::DeltaLengthMismatch {
                consumed: pointer,
                expected: old.len(),
            });
        }

        Ok(diffs)
    }
}
