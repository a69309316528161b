//! Code-unit primitives shared by the diff, match and patch layers.

/// Number of leading units common to both slices.
pub(crate) fn common_prefix(lhs: &[char], rhs: &[char]) -> usize {
    lhs.iter().zip(rhs).take_while(|(l, r)| l == r).count()
}

/// Number of trailing units common to both slices.
pub(crate) fn common_suffix(lhs: &[char], rhs: &[char]) -> usize {
    lhs.iter()
        .rev()
        .zip(rhs.iter().rev())
        .take_while(|(l, r)| l == r)
        .count()
}

/// Length of the longest suffix of `lhs` that is also a prefix of `rhs`.
/// Ties favor the longer overlap.
pub(crate) fn common_overlap(lhs: &[char], rhs: &[char]) -> usize {
    if lhs.is_empty() || rhs.is_empty() {
        return 0;
    }

    // Truncate to the comparable window.
    let l = if lhs.len() > rhs.len() {
        &lhs[lhs.len() - rhs.len()..]
    } else {
        lhs
    };
    let r = if rhs.len() > lhs.len() {
        &rhs[..lhs.len()]
    } else {
        rhs
    };
    let minlen = l.len();

    if l == r {
        return minlen;
    }

    // Grow a candidate suffix one unit at a time, hopping over misses.
    // Performance analysis: https://neil.fraser.name/news/2010/11/04/
    let mut best = 0;
    let mut length = 1;
    loop {
        if length > minlen {
            return best;
        }
        let pattern = &l[minlen - length..];
        let found = match index_of(r, pattern, 0) {
            Some(found) => found,
            None => return best,
        };

        length += found;
        if found == 0 || l[minlen - length..] == r[..length] {
            best = length;
            length += 1;
        }
    }
}

/// First position at or after `from` where `pattern` occurs in `text`.
pub(crate) fn index_of(text: &[char], pattern: &[char], from: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(from.min(text.len()));
    }

    text.windows(pattern.len())
        .skip(from)
        .position(|w| w == pattern)
        .map(|pos| pos + from)
}

/// Last position at or before `until` where `pattern` occurs in `text`.
pub(crate) fn last_index_of(text: &[char], pattern: &[char], until: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(until.min(text.len()));
    }

    text.windows(pattern.len())
        .enumerate()
        .take(until.saturating_add(1))
        .filter(|(_, w)| *w == pattern)
        .map(|(pos, _)| pos)
        .last()
}
