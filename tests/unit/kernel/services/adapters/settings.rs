use super::*;

#[test]
fn settings_and_logs_live_under_the_app_cache_dir() {
    let Some(settings) = get_settings_path() else {
        return;
    };
    assert!(settings.ends_with(".playground/settings.json"));

    let logs = get_log_dir().unwrap();
    assert_eq!(logs.parent(), settings.parent());
    assert!(logs.ends_with(".playground/logs"));
}

#[test]
fn parse_settings_merges_partial_files_with_defaults() {
    let settings = parse_settings(r#"{"completion": {"enabled": false}}"#).unwrap();

    assert!(!settings.completion.enabled);
    assert_eq!(
        settings.completion.endpoint,
        "http://localhost:3000/api/code-completion"
    );
    assert_eq!(settings.chat.max_tokens, 1000);
}

#[test]
fn parse_settings_rejects_malformed_json() {
    assert!(parse_settings("{ not json").is_none());
}
