use crate::types::IdeMode;

/// Controls the simple poll looks at in any IDE
pub const SIMPLE_CONTROL_SELECTORS: &[&str] = &[
    "button",
    "[role='button']",
    "a.monaco-button",
    ".monaco-button",
];

/// How a focused conversation is judged finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionRule {
    /// Done once any element matches the selector
    SelectorPresent(&'static str),
    /// Done once no element matches the selector
    SelectorAbsent(&'static str),
}

pub trait ConversationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Selectors whose matches are click candidates
    fn control_selectors(&self) -> &'static [&'static str];

    /// Selector matching one element per conversation tab, in display order
    fn tab_selector(&self) -> &'static str;

    fn completion_rule(&self) -> CompletionRule;
}

pub struct SimpleStrategy;

impl ConversationStrategy for SimpleStrategy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn control_selectors(&self) -> &'static [&'static str] {
        SIMPLE_CONTROL_SELECTORS
    }

    fn tab_selector(&self) -> &'static str {
        // Simple mode never cycles tabs
        ""
    }

    fn completion_rule(&self) -> CompletionRule {
        CompletionRule::SelectorPresent("")
    }
}

pub struct CursorStrategy;

impl ConversationStrategy for CursorStrategy {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn control_selectors(&self) -> &'static [&'static str] {
        &[
            "button",
            "[class*='button']",
            "[class*='anysphere']",
            "[role='button']",
        ]
    }

    fn tab_selector(&self) -> &'static str {
        "#workbench\\.parts\\.auxiliarybar ul[role='tablist'] li[role='tab']"
    }

    fn completion_rule(&self) -> CompletionRule {
        // The composer shows a stop control only while generating
        CompletionRule::SelectorAbsent("[data-click-ready='true'] .codicon-debug-stop")
    }
}

pub struct AntigravityStrategy;

impl ConversationStrategy for AntigravityStrategy {
    fn name(&self) -> &'static str {
        "antigravity"
    }

    fn control_selectors(&self) -> &'static [&'static str] {
        &[".bg-ide-button-background", "button", "[role='button']"]
    }

    fn tab_selector(&self) -> &'static str {
        "button.grow"
    }

    fn completion_rule(&self) -> CompletionRule {
        CompletionRule::SelectorPresent("[data-testid='conversation-feedback'], .codicon-thumbsup")
    }
}

pub fn strategy_for(mode: IdeMode) -> &'static dyn ConversationStrategy {
    match mode {
        IdeMode::Simple => &SimpleStrategy,
        IdeMode::Cursor => &CursorStrategy,
        IdeMode::Antigravity => &AntigravityStrategy,
    }
}

/// Whether `mode` with `background` runs the multi-conversation loop
pub fn cycles_conversations(mode: IdeMode, background: bool) -> bool {
    background && matches!(mode, IdeMode::Cursor | IdeMode::Antigravity)
}

/// Disambiguate repeated tab labels: "Chat", "Chat (2)", "Chat (3)"
pub fn dedupe_labels(labels: &[String]) -> Vec<String> {
    let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    labels
        .iter()
        .map(|label| {
            let count = seen.entry(label.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                label.clone()
            } else {
                format!("{} ({})", label, count)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod strategy_test;
