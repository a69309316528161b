use std::time::Instant;

use driftpatch::{Diff, DriftPatch, Op, PatchInput};

// Helper to reconstruct the two texts a diff was built from.
fn rebuild_texts(diffs: &[Diff]) -> (String, String) {
    let mut old = String::new();
    let mut new = String::new();

    for diff in diffs {
        if diff.op() != Op::Insert {
            old.push_str(&diff.text());
        }
        if diff.op() != Op::Delete {
            new.push_str(&diff.text());
        }
    }

    (old, new)
}

#[test]
fn test_diff_main() {
    let mut dp = DriftPatch::new();

    // Null case.
    assert!(dp.diff_main("", "").is_empty());

    // Equality.
    assert_eq!(vec![Diff::equal("abc")], dp.diff_main("abc", "abc"));

    // Simple insertion.
    assert_eq!(
        vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")],
        dp.diff_main("abc", "ab123c")
    );

    // Simple deletion.
    assert_eq!(
        vec![Diff::equal("a"), Diff::delete("123"), Diff::equal("bc")],
        dp.diff_main("a123bc", "abc")
    );

    // Two insertions.
    assert_eq!(
        vec![
            Diff::equal("a"),
            Diff::insert("123"),
            Diff::equal("b"),
            Diff::insert("456"),
            Diff::equal("c"),
        ],
        dp.diff_main("abc", "a123b456c")
    );

    // Two deletions.
    assert_eq!(
        vec![
            Diff::equal("a"),
            Diff::delete("123"),
            Diff::equal("b"),
            Diff::delete("456"),
            Diff::equal("c"),
        ],
        dp.diff_main("a123b456c", "abc")
    );

    // Perform a real diff: switch off the timeout for minimal results.
    dp.set_timeout(None);

    assert_eq!(
        vec![Diff::delete("a"), Diff::insert("b")],
        dp.diff_main("a", "b")
    );

    assert_eq!(
        vec![
            Diff::delete("Apple"),
            Diff::insert("Banana"),
            Diff::equal("s are a"),
            Diff::insert("lso"),
            Diff::equal(" fruit."),
        ],
        dp.diff_main("Apples are a fruit.", "Bananas are also fruit.")
    );

    assert_eq!(
        vec![
            Diff::delete("a"),
            Diff::insert("\u{0680}"),
            Diff::equal("x"),
            Diff::delete("\t"),
            Diff::insert("\0"),
        ],
        dp.diff_main("ax\t", "\u{0680}x\0")
    );

    // Overlaps.
    assert_eq!(
        vec![
            Diff::delete("1"),
            Diff::equal("a"),
            Diff::delete("y"),
            Diff::equal("b"),
            Diff::delete("2"),
            Diff::insert("xab"),
        ],
        dp.diff_main("1ayb2", "abxab")
    );

    assert_eq!(
        vec![Diff::insert("xaxcx"), Diff::equal("abc"), Diff::delete("y")],
        dp.diff_main("abcy", "xaxcxabc")
    );

    assert_eq!(
        vec![
            Diff::delete("ABCD"),
            Diff::equal("a"),
            Diff::delete("="),
            Diff::insert("-"),
            Diff::equal("bcd"),
            Diff::delete("="),
            Diff::insert("-"),
            Diff::equal("efghijklmnopqrs"),
            Diff::delete("EFGHIJKLMNOefg"),
        ],
        dp.diff_main("ABCDa=bcd=efghijklmnopqrsEFGHIJKLMNOefg", "a-bcd-efghijklmnopqrs")
    );

    // Large equality.
    assert_eq!(
        vec![
            Diff::insert(" "),
            Diff::equal("a"),
            Diff::insert("nd"),
            Diff::equal(" [[Hepatopancreatic]]"),
            Diff::delete(" and [[New"),
        ],
        dp.diff_main("a [[Hepatopancreatic]] and [[New", " and [[Hepatopancreatic]]")
    );
}

#[test]
fn test_diff_round_trip() {
    // Concatenating the kept/deleted and kept/inserted sides must rebuild
    // the inputs exactly, whatever the configuration.
    let cases = [
        ("The quick brown fox.", "The quick red fox!"),
        ("", "whole cloth"),
        ("left\nonly\n", "right\nonly\n"),
        ("mouse", "sofas"),
        ("\u{1F98A} fox", "\u{1F43A} wolf"),
    ];

    for checklines in [false, true] {
        let mut dp = DriftPatch::new();
        dp.set_checklines(checklines);

        for (old, new) in cases {
            let diffs = dp.diff_main(old, new);
            let (rebuilt_old, rebuilt_new) = rebuild_texts(&diffs);
            assert_eq!(old, rebuilt_old);
            assert_eq!(new, rebuilt_new);

            assert_eq!(old, DriftPatch::diff_text_old(&diffs));
            assert_eq!(new, DriftPatch::diff_text_new(&diffs));
        }
    }
}

#[test]
fn test_diff_levenshtein_bound() {
    let dp = DriftPatch::new();

    let cases = [
        ("kitten", "sitting"),
        ("", "abc"),
        ("abc", ""),
        ("same", "same"),
        ("ABCDa=bcd=efghijklmnopqrs", "a-bcd-efghijklmnopqrs"),
    ];

    for (old, new) in cases {
        let diffs = dp.diff_main(old, new);
        let distance = DriftPatch::diff_levenshtein(&diffs);
        assert!(distance <= old.chars().count().max(new.chars().count()));
    }
}

#[test]
fn test_diff_line_mode() {
    let mut dp = DriftPatch::new();
    dp.set_timeout(Some(1000));

    // Must be long enough to pass the 100-unit cutoff.
    let old = "1234567890\n".repeat(13);
    let new = "abcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n";

    dp.set_checklines(false);
    let without = dp.diff_main(&old, new);
    dp.set_checklines(true);
    let with = dp.diff_main(&old, new);

    // Either way the scripts must reproduce both texts.
    assert_eq!(rebuild_texts(&without), rebuild_texts(&with));
    assert_eq!((old.clone(), new.to_string()), rebuild_texts(&with));

    // Single-line inputs never take the line-mode path; results agree.
    let old = "1234567890".repeat(13);
    let new = "abcdefghij".repeat(13);
    dp.set_checklines(false);
    let without = dp.diff_main(&old, &new);
    dp.set_checklines(true);
    let with = dp.diff_main(&old, &new);
    assert_eq!(without, with);
}

#[test]
fn test_diff_timeout() {
    let mut dp = DriftPatch::new();

    const TIMEOUT_MS: u32 = 100;
    dp.set_timeout(Some(TIMEOUT_MS));

    let old = "`Twas brillig, and the slithy toves\nDid gyre and gimble in the wabe:\nAll mimsy were the borogoves,\nAnd the mome raths outgrabe.\n".repeat(1024);
    let new = "I am the very model of a modern major general,\nI've information vegetable, animal, and mineral,\nI know the kings of England, and I quote the fights historical,\nFrom Marathon to Waterloo, in order categorical.\n".repeat(1024);

    let start = Instant::now();
    let diffs = dp.diff_main(&old, &new);
    let elapsed = start.elapsed();

    // The result still reproduces the inputs.
    assert_eq!((old, new), rebuild_texts(&diffs));

    // And the deadline is honored within a generous constant factor.
    assert!(elapsed.as_millis() <= (TIMEOUT_MS as u128) * 20);
}

#[test]
fn test_cleanup_idempotence() {
    let dp = DriftPatch::new();

    let base = vec![
        Diff::delete("abcxxx"),
        Diff::insert("xxxdef"),
        Diff::equal("XY"),
        Diff::delete("x"),
        Diff::insert("y"),
    ];

    let mut merged = base.clone();
    DriftPatch::diff_cleanup_merge(&mut merged);
    let mut twice = merged.clone();
    DriftPatch::diff_cleanup_merge(&mut twice);
    assert_eq!(merged, twice);

    let mut semantic = base.clone();
    DriftPatch::diff_cleanup_semantic(&mut semantic);
    let mut twice = semantic.clone();
    DriftPatch::diff_cleanup_semantic(&mut twice);
    assert_eq!(semantic, twice);

    let mut efficient = base;
    dp.diff_cleanup_efficiency(&mut efficient);
    let mut twice = efficient.clone();
    dp.diff_cleanup_efficiency(&mut twice);
    assert_eq!(efficient, twice);
}

#[test]
fn test_delta_round_trip() {
    let mut dp = DriftPatch::new();
    dp.set_timeout(None);

    let cases = [
        ("jumps over the lazy", "jumped over a lazy old dog"),
        ("", "fresh text"),
        ("stale text", ""),
        ("percent % and\nnewline", "percent %25 and\r\nnewline"),
    ];

    for (old, new) in cases {
        let diffs = dp.diff_main(old, new);
        let delta = DriftPatch::diff_to_delta(&diffs);
        assert_eq!(diffs, DriftPatch::diff_from_delta(old, &delta).unwrap());
    }

    // A delta against the wrong source must fail.
    assert!(DriftPatch::diff_from_delta("too short", "=100").is_err());
    assert!(DriftPatch::diff_from_delta("x", "=1\t=1").is_err());
    assert!(DriftPatch::diff_from_delta("xy", "=1").is_err());
}

#[test]
fn test_patch_make() {
    let dp = DriftPatch::new();

    let patches = dp.patch_make(PatchInput::Texts("", ""));
    assert!(patches.is_empty());

    let txt1 = "The quick brown fox jumps over the lazy dog.";
    let txt2 = "That quick brown fox jumped over a lazy dog.";

    // The second patch must be "-21,17 +21,18", not "-22,17 +21,18", due
    // to the rolling context.
    let patches = dp.patch_make(PatchInput::Texts(txt2, txt1));
    assert_eq!(
        "@@ -1,8 +1,7 @@\n Th\n-at\n+e\n  qui\n@@ -21,17 +21,18 @@\n jump\n-ed\n+s\n  over \n-a\n+the\n  laz\n",
        dp.patch_to_text(&patches)
    );

    // Text1 + Text2 inputs.
    let patches = dp.patch_make(PatchInput::Texts(txt1, txt2));
    let expected = "@@ -1,11 +1,12 @@\n Th\n-e\n+at\n  quick b\n@@ -22,18 +22,17 @@\n jump\n-s\n+ed\n  over \n-the\n+a\n  laz\n";
    assert_eq!(expected, dp.patch_to_text(&patches));

    // Diff input.
    let diffs = dp.diff_main(txt1, txt2);
    let patches = dp.patch_make(PatchInput::Diffs(&diffs));
    assert_eq!(expected, dp.patch_to_text(&patches));

    // Text1 + diff input.
    let patches = dp.patch_make(PatchInput::TextDiffs(txt1, &diffs));
    assert_eq!(expected, dp.patch_to_text(&patches));

    // Character encoding.
    let patches = dp.patch_make(PatchInput::Texts(
        "`1234567890-=[]\\;',./",
        "~!@#$%^&*()_+{}|:\"<>?",
    ));
    assert_eq!(
        "@@ -1,21 +1,21 @@\n-%601234567890-=%5B%5D%5C;',./\n+~!@#$%25%5E&*()_+%7B%7D%7C:%22%3C%3E?\n",
        dp.patch_to_text(&patches)
    );

    // Character decoding.
    let diffs = vec![
        Diff::delete("`1234567890-=[]\\;',./"),
        Diff::insert("~!@#$%^&*()_+{}|:\"<>?"),
    ];
    assert_eq!(
        diffs,
        dp.patch_from_text(
            "@@ -1,21 +1,21 @@\n-%601234567890-=%5B%5D%5C;',./\n+~!@#$%25%5E&*()_+%7B%7D%7C:%22%3C%3E?\n"
        )
        .unwrap()[0]
            .diffs()
    );

    // Long string with repeats.
    let txt1 = "abcdef".repeat(100);
    let txt2 = format!("{txt1}123");
    let patches = dp.patch_make(PatchInput::Texts(&txt1, &txt2));
    assert_eq!(
        "@@ -573,28 +573,31 @@\n cdefabcdefabcdefabcdefabcdef\n+123\n",
        dp.patch_to_text(&patches)
    );
}

#[test]
fn test_patch_text_round_trip() {
    let dp = DriftPatch::new();

    let patches = dp.patch_make(PatchInput::Texts(
        "The quick brown fox jumps over the lazy dog.",
        "That quick brown fox jumped over a lazy dog.",
    ));
    let serialized = dp.patch_to_text(&patches);
    assert_eq!(patches, dp.patch_from_text(&serialized).unwrap());
}

#[test]
fn test_patch_apply() {
    let mut dp = DriftPatch::new();

    let patches = dp.patch_make(PatchInput::Texts("", ""));
    let (patched, results) = dp.patch_apply(&patches, "Hello world.");
    assert_eq!("Hello world.", patched);
    assert!(results.is_empty());

    let patches = dp.patch_make(PatchInput::Texts(
        "The quick brown fox jumps over the lazy dog.",
        "That quick brown fox jumped over a lazy dog.",
    ));

    // Exact match.
    assert_eq!(
        (
            "That quick brown fox jumped over a lazy dog.".to_string(),
            vec![true, true]
        ),
        dp.patch_apply(&patches, "The quick brown fox jumps over the lazy dog.")
    );

    // Partial match.
    assert_eq!(
        (
            "That quick red rabbit jumped over a tired tiger.".to_string(),
            vec![true, true]
        ),
        dp.patch_apply(&patches, "The quick red rabbit jumps over the tired tiger.")
    );

    // Failed match.
    assert_eq!(
        (
            "I am the very model of a modern major general.".to_string(),
            vec![false, false]
        ),
        dp.patch_apply(&patches, "I am the very model of a modern major general.")
    );

    // Big delete, small change.
    let patches = dp.patch_make(PatchInput::Texts(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    ));
    assert_eq!(
        ("xabcy".to_string(), vec![true, true]),
        dp.patch_apply(
            &patches,
            "x123456789012345678901234567890-----++++++++++-----123456789012345678901234567890y"
        )
    );

    // Big delete, large change.
    let patches = dp.patch_make(PatchInput::Texts(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    ));
    assert_eq!(
        (
            "xabc12345678901234567890---------------++++++++++---------------12345678901234567890y"
                .to_string(),
            vec![false, true]
        ),
        dp.patch_apply(
            &patches,
            "x12345678901234567890---------------++++++++++---------------12345678901234567890y"
        )
    );

    // A looser delete threshold lets the same patch land.
    dp.set_delete_threshold(0.6);
    let patches = dp.patch_make(PatchInput::Texts(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    ));
    assert_eq!(
        ("xabcy".to_string(), vec![true, true]),
        dp.patch_apply(
            &patches,
            "x12345678901234567890---------------++++++++++---------------12345678901234567890y"
        )
    );
    dp.set_delete_threshold(0.5);

    // Compensate for a failed patch.
    dp.set_match_threshold(0.0);
    dp.set_match_distance(0);
    let patches = dp.patch_make(PatchInput::Texts(
        "abcdefghijklmnopqrstuvwxyz--------------------1234567890",
        "abcXXXXXXXXXXdefghijklmnopqrstuvwxyz--------------------1234567YYYYYYYYYY890",
    ));
    assert_eq!(
        (
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ--------------------1234567YYYYYYYYYY890".to_string(),
            vec![false, true]
        ),
        dp.patch_apply(
            &patches,
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ--------------------1234567890"
        )
    );
    dp.set_match_threshold(0.5);
    dp.set_match_distance(1000);

    // No side effects on the caller's patch list.
    let patches = dp.patch_make(PatchInput::Texts("", "test"));
    let before = dp.patch_to_text(&patches);
    dp.patch_apply(&patches, "");
    assert_eq!(before, dp.patch_to_text(&patches));

    let patches = dp.patch_make(PatchInput::Texts(
        "The quick brown fox jumps over the lazy dog.",
        "Woof",
    ));
    let before = dp.patch_to_text(&patches);
    dp.patch_apply(&patches, "The quick brown fox jumps over the lazy dog.");
    assert_eq!(before, dp.patch_to_text(&patches));

    // Edge exact match.
    let patches = dp.patch_make(PatchInput::Texts("", "test"));
    assert_eq!(("test".to_string(), vec![true]), dp.patch_apply(&patches, ""));

    // Near edge exact match.
    let patches = dp.patch_make(PatchInput::Texts("XY", "XtestY"));
    assert_eq!(
        ("XtestY".to_string(), vec![true]),
        dp.patch_apply(&patches, "XY")
    );

    // Edge partial match.
    let patches = dp.patch_make(PatchInput::Texts("y", "y123"));
    assert_eq!(
        ("x123".to_string(), vec![true]),
        dp.patch_apply(&patches, "x")
    );
}

#[test]
fn test_patch_round_trip() {
    let dp = DriftPatch::new();

    let cases = [
        ("The quick brown fox.", "The sneaky brown fox!"),
        ("", "made from nothing"),
        ("erased entirely", ""),
        ("line one\nline two\nline three\n", "line one\nline 2\nline three\nline four\n"),
    ];

    for (old, new) in cases {
        let patches = dp.patch_make(PatchInput::Texts(old, new));
        let (patched, results) = dp.patch_apply(&patches, old);
        assert_eq!(new, patched);
        assert!(results.iter().all(|&flag| flag));
    }
}
