//! Version specifier resolution for registry links.
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

static COERCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^\d])(\d{1,16})(?:\.(\d{1,16}))?(?:\.(\d{1,16}))?(?:$|[^\d])",
    )
    .unwrap()
});

/// Extracts the first `major[.minor[.patch]]` run from a specifier,
/// filling missing components with zero.
///
/// Range operators, `v` prefixes, prerelease tags and surrounding text are
/// ignored, so `^4.1.0`, `~4.1` and `npm:lodash@4.1.0` all coerce.
pub fn coerce(specifier: &str) -> Option<Version> {
    let caps = COERCE_RE.captures(specifier)?;

    let component = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    Some(Version::new(component(1)?, component(2)?, component(3)?))
}

/// Version shown in a registry link: the coerced version when one can be
/// found, the raw specifier otherwise.
pub fn resolve_display_version(specifier: &str) -> String {
    coerce(specifier)
        .map(|v| v.to_string())
        .unwrap_or_else(|| specifier.to_string())
}
