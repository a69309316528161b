use thiserror::Error;

/// Failures surfaced by the two text parsers.
///
/// Everything else in the crate degrades instead of failing: the matcher
/// answers `None`, the patch applier reports per-hunk booleans and a diff
/// deadline silently coarsens the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A delta token was not one of `=n`, `-n`, `+text`, carried a bad
    /// number, or its payload failed to percent-decode.
    #[error("invalid delta token `{token}` (token #{index})")]
    InvalidDelta { token: String, index: usize },

    /// The delta walked past the end of the source text, or stopped short
    /// of it.
    #[error("delta consumed {consumed} source units, source has {expected}")]
    DeltaLengthMismatch { consumed: usize, expected: usize },

    /// A patch header or payload line did not parse.
    #[error("invalid patch line `{0}`")]
    InvalidPatchText(String),
}
