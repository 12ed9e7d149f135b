//! Filename sanitization for fragment file names.
//!
//! Mirrors the rules of the `sanitize-filename` npm package so fragment
//! names stay identical to the ones written by existing changesets tooling.
use regex::Regex;
use std::sync::LazyLock;

/// Maximum fragment name length in bytes.
const MAX_FILENAME_BYTES: usize = 255;

static ILLEGAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/?<>\\:*|"]"#).unwrap());

static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f\x{80}-\x{9f}]").unwrap());

static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.+$").unwrap());

static WINDOWS_RESERVED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap()
});

static WINDOWS_TRAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[. ]+$").unwrap());

fn sanitize_pass(input: &str, replacement: &str) -> String {
    let output = ILLEGAL_RE.replace_all(input, replacement);
    let output = CONTROL_RE.replace_all(&output, replacement);
    let output = RESERVED_RE.replace(&output, replacement);
    let output = WINDOWS_RESERVED_RE.replace(&output, replacement);
    let output = WINDOWS_TRAILING_RE.replace(&output, replacement);

    truncate_bytes(&output, MAX_FILENAME_BYTES).to_string()
}

fn truncate_bytes(input: &str, max: usize) -> &str {
    if input.len() <= max {
        return input;
    }

    let mut end = max;
    while !input.is_char_boundary(end) {
        end -= 1;
    }

    &input[..end]
}

/// Replaces characters and names that are not valid in a file name with
/// `replacement`.
///
/// A second pass with an empty replacement removes anything the replacement
/// itself may have introduced.
pub fn sanitize_filename(input: &str, replacement: &str) -> String {
    let output = sanitize_pass(input, replacement);

    if replacement.is_empty() {
        return output;
    }

    sanitize_pass(&output, "")
}
