#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_helper_source_has_no_placeholders() {
        let source = helper_source();
        for placeholder in [
            "__VERSION__",
            "__ID_ATTR__",
            "__MAX_DEPTH__",
            "__MAX_SIBLINGS__",
            "__MIN_TEXT__",
        ] {
            assert!(
                !source.contains(placeholder),
                "{} left in helper",
                placeholder
            );
        }
        assert!(source.contains("depth < 10"));
        assert!(source.contains("n < 5"));
        assert!(source.contains("length > 10"));
        assert!(source.contains(ID_ATTRIBUTE));
    }

    #[test]
    fn test_stamped_ids_carry_install_epoch() {
        let source = helper_source();
        assert!(source.contains("epoch: Date.now().toString(36)"));
        assert!(source.contains("'aa-' + state.epoch + '-' + state.nextId++"));
    }

    #[test]
    fn test_call_renders_json_arguments() {
        let expr = call("focusTab", &[json!("li[role='tab']"), json!(2)]);
        assert_eq!(expr, "window.__autoAccept.focusTab(\"li[role='tab']\", 2)");

        assert_eq!(call("hasFocus", &[]), "window.__autoAccept.hasFocus()");
    }

    #[test]
    fn test_completion_arg_shape() {
        let arg = completion_arg(&CompletionRule::SelectorAbsent(".stop"));
        assert_eq!(arg["kind"], "absent");
        assert_eq!(arg["selector"], ".stop");
    }

    #[test]
    fn test_presence_check_names_version() {
        assert!(presence_check().contains(&HELPER_VERSION.to_string()));
    }
}
