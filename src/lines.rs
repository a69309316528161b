//! Line-granularity coder: maps each distinct line (trailing newline
//! included) to a single code unit so a line-level diff can run through the
//! ordinary character pipeline.

use std::collections::HashMap;

use crate::diff::Diff;

/// Both texts encoded one unit per line, plus the table to reverse it.
/// `lines[0]` is the reserved empty entry; real codes start at 1.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LineCoding<'a> {
    pub old_codes: Vec<char>,
    pub new_codes: Vec<char>,
    pub lines: Vec<&'a [char]>,
}

// Scalar values minus the surrogate block; one code per distinct line.
const MAX_LINES: usize = 0x10FFFF - 0x800;

fn code_unit(code: u32) -> char {
    let scalar = if code >= 0xD800 { code + 0x800 } else { code };
    char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn code_index(unit: char) -> usize {
    let scalar = unit as u32;
    (if scalar >= 0xE000 { scalar - 0x800 } else { scalar }) as usize
}

pub(crate) fn to_codes<'a>(old: &'a [char], new: &'a [char]) -> LineCoding<'a> {
    let mut lines: Vec<&[char]> = vec![&[]];
    let mut codes: HashMap<&[char], u32> = HashMap::new();

    let old_codes = encode(old, &mut lines, &mut codes);
    let new_codes = encode(new, &mut lines, &mut codes);

    LineCoding {
        old_codes,
        new_codes,
        lines,
    }
}

fn encode<'a>(
    text: &'a [char],
    lines: &mut Vec<&'a [char]>,
    codes: &mut HashMap<&'a [char], u32>,
) -> Vec<char> {
    let mut units = Vec::new();
    let mut cursor = 0;

    for line in text.split_inclusive(|&u| u == '\n') {
        if let Some(&code) = codes.get(line) {
            units.push(code_unit(code));
            cursor += line.len();
            continue;
        }

        if lines.len() >= MAX_LINES {
            // Alphabet exhausted.
            break;
        }

        let code = lines.len() as u32;
        codes.insert(line, code);
        lines.push(line);
        units.push(code_unit(code));
        cursor += line.len();
    }

    // Whatever did not fit becomes one final jumbo line.
    if cursor < text.len() {
        let line = &text[cursor..];
        let next = lines.len() as u32;
        let code = *codes.entry(line).or_insert(next);
        if code == next {
            lines.push(line);
        }
        units.push(code_unit(code));
    }

    units
}

/// Rehydrates encoded diffs by concatenating the line behind each unit.
pub(crate) fn from_codes(diffs: &[Diff], lines: &[&[char]]) -> Vec<Diff> {
    diffs
        .iter()
        .map(|diff| {
            let text = diff
                .units()
                .iter()
                .flat_map(|&unit| {
                    lines
                        .get(code_index(unit))
                        .copied()
                        .unwrap_or_default()
                        .iter()
                        .copied()
                })
                .collect::<Vec<_>>();

            Diff::from_units(diff.op(), &text)
        })
        .collect()
}
