//! Post-processing passes that turn a raw edit script into a good one.

use crate::diff::{Diff, Op};
use crate::text;

/// Reorders and merges like edit sections, merges equalities and drops
/// empty diffs. Any edit section can move as long as it does not cross an
/// equality. Repeats until a full pass changes nothing.
pub(crate) fn merge(diffs: &mut Vec<Diff>) {
    // A dummy equality at the end flushes the trailing run.
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
                pointer += 1;
            }
            Op::Delete => {
                delete_n += 1;
                delete_data.extend_from_slice(diffs[pointer].units());
                pointer += 1;
            }
            Op::Equal => {
                // Upon reaching an equality, resolve the run before it.
                if delete_n + insert_n > 1 {
                    if delete_n != 0 && insert_n != 0 {
                        // Factor out a common prefix into the prior equality.
                        let commonlen = text::common_prefix(&insert_data, &delete_data);
                        if commonlen != 0 {
                            let anchor = pointer - delete_n - insert_n;
                            if anchor > 0 && diffs[anchor - 1].op() == Op::Equal {
                                let mut grown = diffs[anchor - 1].units().to_vec();
                                grown.extend_from_slice(&insert_data[..commonlen]);
                                diffs[anchor - 1] = Diff::from_units(Op::Equal, &grown);
                            } else {
                                diffs.insert(
                                    0,
                                    Diff::from_units(Op::Equal, &insert_data[..commonlen]),
                                );
                                pointer += 1;
                            }
                            insert_data.drain(..commonlen);
                            delete_data.drain(..commonlen);
                        }

                        // Factor out a common suffix into the current one.
                        let commonlen = text::common_suffix(&insert_data, &delete_data);
                        if commonlen > 0 {
                            let mut grown =
                                insert_data[insert_data.len() - commonlen..].to_vec();
                            grown.extend_from_slice(diffs[pointer].units());
                            diffs[pointer] = Diff::from_units(Op::Equal, &grown);
                            insert_data.truncate(insert_data.len() - commonlen);
                            delete_data.truncate(delete_data.len() - commonlen);
                        }
                    }

                    // Replace the run with the merged edits.
                    let start = pointer - delete_n - insert_n;
                    diffs.drain(start..pointer);
                    pointer = start;
                    if !delete_data.is_empty() {
                        diffs.insert(pointer, Diff::from_units(Op::Delete, &delete_data));
                        pointer += 1;
                    }
                    if !insert_data.is_empty() {
                        diffs.insert(pointer, Diff::from_units(Op::Insert, &insert_data));
                        pointer += 1;
                    }
                    pointer += 1;
                } else if pointer != 0 && diffs[pointer - 1].op() == Op::Equal {
                    // Merge this equality into the previous one.
                    let mut grown = diffs[pointer - 1].units().to_vec();
                    grown.extend_from_slice(diffs[pointer].units());
                    diffs[pointer - 1] = Diff::from_units(Op::Equal, &grown);
                    diffs.remove(pointer);
                } else {
                    pointer += 1;
                }

                insert_n = 0;
                delete_n = 0;
                insert_data.clear();
                delete_data.clear();
            }
        }
    }

    if diffs.last().is_some_and(|diff| diff.is_empty()) {
        diffs.pop();
    }

    // Second pass: single edits surrounded by equalities can shift
    // sideways to eliminate one of them, e.g. A<ins>BA</ins>C -> <ins>AB</ins>AC.
    let mut changes = false;
    let mut pointer = 1;
    while !diffs.is_empty() && pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op() == Op::Equal && diffs[pointer + 1].op() == Op::Equal {
            let prev = diffs[pointer - 1].units().to_vec();
            let edit = diffs[pointer].units().to_vec();
            let next = diffs[pointer + 1].units().to_vec();

            if edit.ends_with(&prev) {
                // Shift the edit over the previous equality.
                let mut shifted = prev.clone();
                shifted.extend_from_slice(&edit[..edit.len() - prev.len()]);
                let mut grown = prev.clone();
                grown.extend_from_slice(&next);

                diffs[pointer] = Diff::from_units(diffs[pointer].op(), &shifted);
                diffs[pointer + 1] = Diff::from_units(Op::Equal, &grown);
                diffs.remove(pointer - 1);
                changes = true;
            } else if edit.starts_with(&next) {
                // Shift the edit over the next equality.
                let mut grown = prev.clone();
                grown.extend_from_slice(&next);
                let mut shifted = edit[next.len()..].to_vec();
                shifted.extend_from_slice(&next);

                diffs[pointer - 1] = Diff::from_units(Op::Equal, &grown);
                diffs[pointer] = Diff::from_units(diffs[pointer].op(), &shifted);
                diffs.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }

    // A shift can expose further merges.
    if changes {
        merge(diffs);
    }
}

/// Reduces the number of edits by eliminating semantically trivial
/// equalities, making the script easier for a human to read.
pub(crate) fn semantic(diffs: &mut Vec<Diff>) {
    let mut changes = false;

    // Indices of prior equalities, plus the edit weight before and after
    // the most recent one.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut insert_len_pre = 0;
    let mut delete_len_pre = 0;
    let mut insert_len_post = 0;
    let mut delete_len_post = 0;

    let mut pointer = 0;
    while pointer < diffs.len() {
        let mut reset = false;

        if diffs[pointer].op() == Op::Equal {
            equalities.push(pointer);
            insert_len_pre = insert_len_post;
            delete_len_pre = delete_len_post;
            insert_len_post = 0;
            delete_len_post = 0;
            last_equality = Some(diffs[pointer].units().to_vec());
        } else {
            if diffs[pointer].op() == Op::Insert {
                insert_len_post += diffs[pointer].len();
            } else {
                delete_len_post += diffs[pointer].len();
            }

            // An equality no longer than the edits on both sides of it is
            // not worth keeping.
            let candidate = match &last_equality {
                Some(eq)
                    if eq.len() <= insert_len_pre.max(delete_len_pre)
                        && eq.len() <= insert_len_post.max(delete_len_post) =>
                {
                    Some(eq.clone())
                }
                _ => None,
            };

            if let Some(eq) = candidate {
                if let Some(&last) = equalities.last() {
                    // Replace the equality with a delete + insert pair.
                    diffs.insert(last, Diff::from_units(Op::Delete, &eq));
                    diffs[last + 1] = Diff::from_units(Op::Insert, &eq);

                    // Throw away the equality just deleted, and the one
                    // before it, which now needs re-evaluation.
                    equalities.pop();
                    equalities.pop();

                    match equalities.last() {
                        Some(&e) => pointer = e,
                        None => {
                            pointer = 0;
                            reset = true;
                        }
                    }

                    insert_len_pre = 0;
                    delete_len_pre = 0;
                    insert_len_post = 0;
                    delete_len_post = 0;
                    last_equality = None;
                    changes = true;
                }
            }
        }

        if !reset {
            pointer += 1;
        }
    }

    if changes {
        merge(diffs);
    }

    semantic_lossless(diffs);

    // Find overlaps between deletions and insertions, e.g.
    // <del>abcxxx</del><ins>xxxdef</ins> -> <del>abc</del>xxx<ins>def</ins>
    // <del>xxxabc</del><ins>defxxx</ins> -> <ins>def</ins>xxx<del>abc</del>
    // Only extract an overlap at least as big as half the edit.
    let mut pointer = 1;
    while pointer < diffs.len() {
        if diffs[pointer - 1].op() == Op::Delete && diffs[pointer].op() == Op::Insert {
            let deletion = diffs[pointer - 1].units().to_vec();
            let insertion = diffs[pointer].units().to_vec();

            let delete_half = deletion.len() / 2 + deletion.len() % 2;
            let insert_half = insertion.len() / 2 + insertion.len() % 2;

            let overlap1 = text::common_overlap(&deletion, &insertion);
            let overlap2 = text::common_overlap(&insertion, &deletion);

            if overlap1 >= overlap2 {
                if overlap1 >= delete_half || overlap1 >= insert_half {
                    // Promote the overlap to an equality, trim the edits.
                    diffs.insert(
                        pointer,
                        Diff::from_units(Op::Equal, &insertion[..overlap1]),
                    );
                    diffs[pointer - 1] = Diff::from_units(
                        Op::Delete,
                        &deletion[..deletion.len() - overlap1],
                    );
                    diffs[pointer + 1] =
                        Diff::from_units(Op::Insert, &insertion[overlap1..]);
                    pointer += 1;
                }
            } else if overlap2 >= delete_half || overlap2 >= insert_half {
                // Reverse overlap: the edits swap sides.
                diffs.insert(pointer, Diff::from_units(Op::Equal, &deletion[..overlap2]));
                diffs[pointer - 1] = Diff::from_units(
                    Op::Insert,
                    &insertion[..insertion.len() - overlap2],
                );
                diffs[pointer + 1] = Diff::from_units(Op::Delete, &deletion[overlap2..]);
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
}

/// Slides single edits that sit between two equalities onto the most
/// natural boundary, e.g. `The c<ins>at c</ins>ame.` -> `The <ins>cat </ins>came.`
pub(crate) fn semantic_lossless(diffs: &mut Vec<Diff>) {
    // The first and last element never move.
    let mut pointer = 1;
    while !diffs.is_empty() && pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op() == Op::Equal && diffs[pointer + 1].op() == Op::Equal {
            let mut prev = diffs[pointer - 1].units().to_vec();
            let mut edit = diffs[pointer].units().to_vec();
            let mut next = diffs[pointer + 1].units().to_vec();

            // First shift the edit as far left as possible.
            let commonlen = text::common_suffix(&prev, &edit);
            if commonlen > 0 {
                let common = edit[edit.len() - commonlen..].to_vec();
                prev.truncate(prev.len() - commonlen);

                let mut shifted = common.clone();
                shifted.extend_from_slice(&edit[..edit.len() - commonlen]);
                edit = shifted;

                let mut shifted = common;
                shifted.extend_from_slice(&next);
                next = shifted;
            }

            // Then step right one unit at a time, keeping the best boundary.
            let mut best_prev = prev.clone();
            let mut best_edit = edit.clone();
            let mut best_next = next.clone();
            let mut best_score =
                semantic_score(&prev, &edit) + semantic_score(&edit, &next);

            while !edit.is_empty() && !next.is_empty() && edit[0] == next[0] {
                prev.push(edit[0]);
                edit.remove(0);
                edit.push(next[0]);
                next.remove(0);

                let score = semantic_score(&prev, &edit) + semantic_score(&edit, &next);
                // The >= encourages trailing rather than leading
                // whitespace on edits.
                if score >= best_score {
                    best_score = score;
                    best_prev.clone_from(&prev);
                    best_edit.clone_from(&edit);
                    best_next.clone_from(&next);
                }
            }

            if diffs[pointer - 1].units() != best_prev {
                // An improvement was found, save it back.
                if !best_prev.is_empty() {
                    diffs[pointer - 1] = Diff::from_units(Op::Equal, &best_prev);
                } else {
                    diffs.remove(pointer - 1);
                    pointer -= 1;
                }

                diffs[pointer] = Diff::from_units(diffs[pointer].op(), &best_edit);

                if !best_next.is_empty() {
                    diffs[pointer + 1] = Diff::from_units(Op::Equal, &best_next);
                } else {
                    diffs.remove(pointer + 1);
                    pointer -= 1;
                }
            }
        }
        pointer += 1;
    }
}

// Scores how well the boundary between `one` and `two` falls on logical
// edges. 6 (best) for an edge of the text down to 0 (worst) for a split
// inside a word.
fn semantic_score(one: &[char], two: &[char]) -> u8 {
    let (char1, char2) = match (one.last(), two.first()) {
        (Some(&char1), Some(&char2)) => (char1, char2),
        _ => return 6,
    };

    let non_alphanumeric1 = !char1.is_alphanumeric();
    let non_alphanumeric2 = !char2.is_alphanumeric();
    let whitespace1 = non_alphanumeric1 && char1.is_whitespace();
    let whitespace2 = non_alphanumeric2 && char2.is_whitespace();
    let linebreak1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let linebreak2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blankline1 = linebreak1 && ends_with_blank_line(one);
    let blankline2 = linebreak2 && starts_with_blank_line(two);

    if blankline1 || blankline2 {
        5
    } else if linebreak1 || linebreak2 {
        4
    } else if non_alphanumeric1 && !whitespace1 && whitespace2 {
        // End of sentences.
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alphanumeric1 || non_alphanumeric2 {
        1
    } else {
        0
    }
}

fn ends_with_blank_line(units: &[char]) -> bool {
    units.ends_with(&['\n', '\n']) || units.ends_with(&['\n', '\r', '\n'])
}

fn starts_with_blank_line(units: &[char]) -> bool {
    units.starts_with(&['\r', '\n', '\r', '\n'])
        || units.starts_with(&['\r', '\n', '\n'])
        || units.starts_with(&['\n', '\r', '\n'])
        || units.starts_with(&['\n', '\n'])
}

/// Reduces the number of edits by eliminating operationally trivial
/// equalities, trading boundary count against total edit size.
pub(crate) fn efficiency(diffs: &mut Vec<Diff>, edit_cost: usize) {
    if diffs.is_empty() {
        return;
    }

    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;

    // Whether edits exist before/after the candidate equality.
    let mut pre_ins = false;
    let mut pre_del = false;
    let mut post_ins = false;
    let mut post_del = false;

    let mut pointer = 0;
    while pointer < diffs.len() {
        let mut reset = false;

        if diffs[pointer].op() == Op::Equal {
            if diffs[pointer].len() < edit_cost && (post_ins || post_del) {
                // Candidate found.
                equalities.push(pointer);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[pointer].units().to_vec());
            } else {
                // Not a candidate, and can never become one.
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[pointer].op() == Op::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            // Five shapes get split:
            // <ins>A</ins><del>B</del>XY<ins>C</ins><del>D</del>
            // <ins>A</ins>X<ins>C</ins><del>D</del>
            // <ins>A</ins><del>B</del>X<ins>C</ins>
            // <ins>A</del>X<ins>C</ins><del>D</del>
            // <ins>A</ins><del>B</del>X<del>C</del>
            let split = match &last_equality {
                Some(eq) => {
                    (pre_ins && pre_del && post_ins && post_del)
                        || (eq.len() < edit_cost / 2
                            && pre_ins as u8 + pre_del as u8 + post_ins as u8 + post_del as u8
                                == 3)
                }
                None => false,
            };

            if split {
                if let (Some(eq), Some(item)) = (last_equality.take(), equalities.pop()) {
                    // Replace the equality with a delete + insert pair.
                    diffs.insert(item, Diff::from_units(Op::Delete, &eq));
                    diffs[item + 1] = Diff::from_units(Op::Insert, &eq);
                    changes = true;

                    if pre_ins && pre_del {
                        // No earlier entry is affected, keep going.
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        // The previous equality needs re-evaluation.
                        equalities.pop();
                        match equalities.last() {
                            Some(&e) => pointer = e,
                            None => {
                                pointer = 0;
                                reset = true;
                            }
                        }
                        post_ins = false;
                        post_del = false;
                    }
                }
            }
        }

        if !reset {
            pointer += 1;
        }
    }

    if changes {
        merge(diffs);
    }
}
