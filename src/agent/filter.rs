//! Denylist for commands an accept click would execute.
//!
//! A pattern is either `/body/flags` (a regular expression, case-insensitive
//! unless flags say otherwise) or a plain literal matched as a
//! case-insensitive substring. This is a heuristic, not a sandbox.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// One compiled denylist entry
#[derive(Debug, Clone)]
pub enum BannedPattern {
    Regex { source: String, regex: Regex },
    Literal { source: String, needle: String },
}

impl BannedPattern {
    /// Compile a pattern. An invalid expression degrades to a literal.
    pub fn compile(pattern: &str) -> Self {
        if let Some((body, flags)) = split_delimited(pattern) {
            match build_regex(body, flags) {
                Ok(regex) => {
                    return BannedPattern::Regex {
                        source: pattern.to_string(),
                        regex,
                    };
                }
                Err(e) => {
                    warn!(
                        "Invalid banned pattern {:?}, matching it literally: {}",
                        pattern, e
                    );
                }
            }
        }

        BannedPattern::Literal {
            source: pattern.to_string(),
            needle: pattern.to_lowercase(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            BannedPattern::Regex { source, .. } | BannedPattern::Literal { source, .. } => source,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            BannedPattern::Regex { regex, .. } => regex.is_match(text),
            BannedPattern::Literal { needle, .. } => {
                !needle.is_empty() && text.to_lowercase().contains(needle.as_str())
            }
        }
    }
}

/// Flags accepted after the closing delimiter
const REGEX_FLAGS: &str = "dgimsuvxy";

/// `/body/flags` → (body, flags)
fn split_delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);
    if body.is_empty() || !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
        return None;
    }
    Some((body, flags))
}

fn build_regex(body: &str, flags: &str) -> Result<Regex, regex::Error> {
    let mut builder = RegexBuilder::new(body);
    // No flags means case-insensitive; explicit flags are taken as written
    builder.case_insensitive(flags.is_empty() || flags.contains('i'));
    builder.multi_line(flags.contains('m'));
    builder.dot_matches_new_line(flags.contains('s'));
    builder.ignore_whitespace(flags.contains('x'));
    builder.unicode(true);
    builder.build()
}

/// Compile a whole list, preserving order
pub fn compile_all(patterns: &[String]) -> Vec<BannedPattern> {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| BannedPattern::compile(p))
        .collect()
}

/// First pattern matching `text`, if any
pub fn first_match<'a>(text: &str, patterns: &'a [BannedPattern]) -> Option<&'a BannedPattern> {
    patterns.iter().find(|p| p.matches(text))
}

/// Convenience check over raw pattern strings
pub fn is_banned(text: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    first_match(text, &compile_all(patterns)).is_some()
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
