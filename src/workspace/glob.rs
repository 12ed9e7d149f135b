//! Workspace glob patterns as declared in `package.json` or
//! `pnpm-workspace.yaml`.
use regex::Regex;

use crate::error::Result;

/// A compiled set of include/exclude directory patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PatternSet {
    /// Compiles patterns, treating entries starting with `!` as exclusions.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut include = vec![];
        let mut exclude = vec![];

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();

            if let Some(negated) = pattern.strip_prefix('!') {
                exclude.push(to_regex(negated)?);
            } else if !pattern.is_empty() {
                include.push(to_regex(pattern)?);
            }
        }

        Ok(Self { include, exclude })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Whether a `/`-separated directory path relative to the workspace root
    /// is selected.
    pub fn matches(&self, dir: &str) -> bool {
        self.include.iter().any(|r| r.is_match(dir))
            && !self.exclude.iter().any(|r| r.is_match(dir))
    }
}

fn normalize(pattern: &str) -> &str {
    let mut pattern = pattern;

    while let Some(stripped) = pattern.strip_prefix("./") {
        pattern = stripped;
    }

    pattern.trim_end_matches('/')
}

fn to_regex(pattern: &str) -> Result<Regex> {
    let pattern = normalize(pattern);
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    out.push('$');

    Ok(Regex::new(&out)?)
}
