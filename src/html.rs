//! A minimal HTML rendering of an edit script, mainly useful as a starting
//! point for writing custom display functions.

use crate::diff::{Diff, Op};
use crate::DriftPatch;

impl DriftPatch {
    /// Renders a script as `<ins>`/`<del>`/`<span>` runs with HTML escapes
    /// applied and newlines shown as pilcrows.
    ///
    /// # Example
    /// ```
    /// use driftpatch::{Diff, DriftPatch};
    ///
    /// let diffs = vec![Diff::equal("a\n"), Diff::delete("<B>b</B>"), Diff::insert("c&d")];
    /// assert_eq!(
    ///     "<span>a&para;<br></span><del style=\"background:#ffe6e6;\">&lt;B&gt;b&lt;/B&gt;</del><ins style=\"background:#e6ffe6;\">c&amp;d</ins>",
    ///     DriftPatch::diff_pretty_html(&diffs)
    /// );
    /// ```
    pub fn diff_pretty_html(diffs: &[Diff]) -> String {
        let mut html = String::new();

        for diff in diffs {
            let body = diff
                .text()
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('\n', "&para;<br>");

            match diff.op() {
                Op::Insert => {
                    html.push_str("<ins style=\"background:#e6ffe6;\">");
                    html.push_str(&body);
                    html.push_str("</ins>");
                }
                Op::Delete => {
                    html.push_str("<del style=\"background:#ffe6e6;\">");
                    html.push_str(&body);
                    html.push_str("</del>");
                }
                Op::Equal => {
                    html.push_str("<span>");
                    html.push_str(&body);
                    html.push_str("</span>");
                }
            }
        }

        html
    }
}
