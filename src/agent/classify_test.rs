// Unit tests for control classification

use super::*;
use crate::agent::filter::compile_all;

fn button(id: &str, text: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        text: text.to_string(),
        visible: true,
        interactable: true,
        ..Default::default()
    }
}

fn banned(list: &[&str]) -> Vec<BannedPattern> {
    compile_all(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
}

#[test]
fn test_normalize_strips_hints_and_noise() {
    assert_eq!(normalize_text("Run Ctrl+Enter"), "run");
    assert_eq!(normalize_text("Accept ⌘⏎"), "accept");
    assert_eq!(normalize_text("  Accept\u{200B}   All  "), "accept all");
    assert_eq!(normalize_text("Run Ctrl+Enter Alt+R"), "run");
    assert_eq!(normalize_text("Retry"), "retry");
}

#[test]
fn test_normalize_keeps_words_that_contain_modifier_letters() {
    assert_eq!(normalize_text("Allow Metadata"), "allow metadata");
    assert_eq!(normalize_text("Accept Alternative"), "accept alternative");
}

#[test]
fn test_accept_button_is_clicked() {
    let decision = is_actionable(&button("a1", "Accept"), &[]);
    assert_eq!(
        decision,
        Decision::Click {
            text: "accept".to_string()
        }
    );
}

#[test]
fn test_empty_and_long_labels_are_skipped() {
    assert_eq!(
        is_actionable(&button("a1", "   "), &[]),
        Decision::Skip(SkipReason::Empty)
    );

    let long = format!("Accept {}", "x".repeat(MAX_LABEL_LEN));
    assert_eq!(
        is_actionable(&button("a1", &long), &[]),
        Decision::Skip(SkipReason::TooLong)
    );

    let exactly = format!("accept{}", "x".repeat(MAX_LABEL_LEN - "accept".len()));
    assert!(matches!(
        is_actionable(&button("a1", &exactly), &[]),
        Decision::Click { .. }
    ));
}

#[test]
fn test_reject_keyword_wins() {
    assert_eq!(
        is_actionable(&button("a1", "Cancel and Run"), &[]),
        Decision::Skip(SkipReason::RejectKeyword)
    );
    assert_eq!(
        is_actionable(&button("a1", "Stop"), &[]),
        Decision::Skip(SkipReason::RejectKeyword)
    );
}

#[test]
fn test_unrelated_label_is_skipped() {
    assert_eq!(
        is_actionable(&button("a1", "Settings"), &[]),
        Decision::Skip(SkipReason::NoAcceptKeyword)
    );
}

#[test]
fn test_run_with_banned_nearby_command_is_blocked() {
    let mut candidate = button("r1", "Run");
    candidate.nearby_text = Some("sudo rm -rf / --no-preserve-root".to_string());

    let decision = is_actionable(&candidate, &banned(&["rm -rf /"]));
    assert_eq!(
        decision,
        Decision::Blocked {
            text: "run".to_string(),
            pattern: "rm -rf /".to_string()
        }
    );
}

#[test]
fn test_denylist_only_applies_to_command_labels() {
    let mut candidate = button("a1", "Accept");
    candidate.nearby_text = Some("rm -rf /".to_string());
    assert!(matches!(
        is_actionable(&candidate, &banned(&["rm -rf /"])),
        Decision::Click { .. }
    ));
}

#[test]
fn test_denylist_checks_aria_label_and_title() {
    let mut candidate = button("r1", "Run");
    candidate.title = Some("Run: git push --force".to_string());
    assert!(matches!(
        is_actionable(&candidate, &banned(&["git push --force"])),
        Decision::Blocked { .. }
    ));
}

#[test]
fn test_state_checks() {
    let mut hidden = button("a1", "Accept");
    hidden.visible = false;
    assert_eq!(
        is_actionable(&hidden, &[]),
        Decision::Skip(SkipReason::Hidden)
    );

    let mut covered = button("a1", "Accept");
    covered.interactable = false;
    assert_eq!(
        is_actionable(&covered, &[]),
        Decision::Skip(SkipReason::NotInteractable)
    );

    let mut disabled = button("a1", "Accept");
    disabled.disabled = true;
    assert_eq!(
        is_actionable(&disabled, &[]),
        Decision::Skip(SkipReason::Disabled)
    );
}

#[test]
fn test_command_text_joins_sources() {
    let candidate = Candidate {
        nearby_text: Some(" npm test ".to_string()),
        aria_label: Some("".to_string()),
        title: Some("Run command".to_string()),
        ..Default::default()
    };
    assert_eq!(candidate.command_text(), "npm test Run command");
}

#[test]
fn test_cooldown_window() {
    let mut cooldown = ClickCooldown::default();
    let t0 = Instant::now();

    assert!(cooldown.try_acquire("a1", t0));
    assert!(!cooldown.try_acquire("a1", t0 + Duration::from_millis(4999)));
    assert!(cooldown.try_acquire("a1", t0 + Duration::from_millis(5000)));
}

#[test]
fn test_cooldown_is_per_element() {
    let mut cooldown = ClickCooldown::default();
    let t0 = Instant::now();

    assert!(cooldown.try_acquire("a1", t0));
    assert!(cooldown.try_acquire("a2", t0));
    assert!(cooldown.is_cooling("a1", t0 + Duration::from_millis(10)));
    assert_eq!(cooldown.len(), 2);
}

#[test]
fn test_cooldown_prunes_expired_entries() {
    let mut cooldown = ClickCooldown::new(Duration::from_millis(100));
    let t0 = Instant::now();

    cooldown.try_acquire("a1", t0);
    cooldown.try_acquire("a2", t0 + Duration::from_millis(200));
    assert_eq!(cooldown.len(), 1);
    assert!(!cooldown.is_cooling("a1", t0 + Duration::from_millis(200)));
}
