use anyhow::Result;
use serde::Serialize;

use autoaccept::agent::filter::{compile_all, first_match};
use autoaccept::settings::Settings;
use autoaccept::types::OutputFormat;

use super::utils::{GlobalOptions, print_output};

#[derive(Debug, Serialize, PartialEq)]
pub struct CheckResult {
    pub text: String,
    pub banned: bool,
    /// Denylist entry that matched
    pub pattern: Option<String>,
    pub patterns_checked: usize,
}

pub fn evaluate(text: &str, patterns: &[String]) -> CheckResult {
    let compiled = compile_all(patterns);
    let hit = first_match(text, &compiled).map(|p| p.source().to_string());
    CheckResult {
        text: text.to_string(),
        banned: hit.is_some(),
        pattern: hit,
        patterns_checked: compiled.len(),
    }
}

/// Run `text` through the denylist; explicit patterns replace the stored list
pub fn handle_check(
    options: &GlobalOptions,
    text: String,
    patterns: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let patterns = if patterns.is_empty() {
        Settings::load(options.open_store()?.as_ref()).banned_commands
    } else {
        patterns
    };

    let result = evaluate(&text, &patterns);
    print_output(&result, format, |r: &CheckResult| match &r.pattern {
        Some(pattern) => println!("BLOCKED by {}", pattern),
        None => println!("allowed ({} pattern(s) checked)", r.patterns_checked),
    })
}
