use rc_domain::config::Config;

#[test]
fn default_host_is_wildcard() {
    let config = Config::default();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn explicit_port_parses() {
    let toml_str = r#"
[server]
host = "127.0.0.1"
port = 9090
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9090);
}

#[test]
fn stt_defaults_match_spec_bounds() {
    let config = Config::default();
    assert_eq!(config.stt.utterance_end_ms, 2_000);
    assert_eq!(config.stt.endpointing_ms, 2_500);
    assert_eq!(config.stt.reconnect.initial_delay_ms, 250);
    assert_eq!(config.stt.reconnect.max_delay_ms, 10_000);
}

#[test]
fn session_defaults_match_spec_bounds() {
    let config = Config::default();
    assert_eq!(config.session.debounce_ms, 500);
    assert_eq!(config.session.barge_in_min_chars, 5);
    assert_eq!(config.session.idle_guard_secs, 30);
    assert_eq!(config.session.farewell_timeout_secs, 8);
    assert!(config
        .session
        .farewell_phrases
        .iter()
        .any(|p| p == "bye"));
    assert!(!config
        .session
        .farewell_phrases
        .iter()
        .any(|p| p == "thanks"));
}
