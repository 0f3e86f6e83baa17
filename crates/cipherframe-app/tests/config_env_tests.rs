//! Integration tests for environment configuration and the evaluation toggle.

use std::time::Duration;

use cipherframe_app::{
    AppConfig, ConfigError, DEFAULT_ENGINE_URL, ENV_ENGINE_URL, ENV_EVALUATE, ENV_LOG,
    ENV_STREAM_IDLE_TIMEOUT,
};

fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |name| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

fn lookup_one(key: &'static str, value: &'static str) -> impl Fn(&str) -> Option<String> {
    move |name| (name == key).then(|| value.to_string())
}

#[test]
fn config_env_tests_defaults_when_unset() {
    let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");
    assert_eq!(config.engine_url.as_str(), format!("{DEFAULT_ENGINE_URL}/"));
    assert_eq!(config.stream_idle_timeout, None);
    assert_eq!(config.log_directive, "info");
    assert!(config.evaluate);
}

#[test]
fn config_env_tests_reads_every_variable() {
    let config = AppConfig::from_lookup(lookup(&[
        (ENV_ENGINE_URL, "https://engine.example.test/v1/"),
        (ENV_STREAM_IDLE_TIMEOUT, "30"),
        (ENV_LOG, "cipherframe_engine=debug"),
        (ENV_EVALUATE, "off"),
    ]))
    .expect("valid config");

    assert_eq!(config.engine_url.host_str(), Some("engine.example.test"));
    assert_eq!(config.stream_idle_timeout, Some(Duration::from_secs(30)));
    assert_eq!(
        config.orchestrator().stream_idle_timeout,
        Some(Duration::from_secs(30))
    );
    assert_eq!(config.log_directive, "cipherframe_engine=debug");
    assert!(!config.evaluate);
}

#[test]
fn config_env_tests_zero_timeout_disables_it() {
    let config = AppConfig::from_lookup(lookup(&[(ENV_STREAM_IDLE_TIMEOUT, "0")]))
        .expect("valid config");
    assert_eq!(config.stream_idle_timeout, None);
}

#[test]
fn config_env_tests_rejects_bad_values() {
    assert!(matches!(
        AppConfig::from_lookup(lookup(&[(ENV_STREAM_IDLE_TIMEOUT, "soon")])),
        Err(ConfigError::InvalidTimeout(_))
    ));
    assert!(matches!(
        AppConfig::from_lookup(lookup(&[(ENV_ENGINE_URL, "not a url")])),
        Err(ConfigError::InvalidEngineUrl(_))
    ));
}

#[test]
fn config_env_tests_evaluation_toggle_values() {
    for disabled in ["0", "false", " OFF "] {
        let config = AppConfig::from_lookup(lookup_one(ENV_EVALUATE, disabled))
            .expect("valid config");
        assert!(!config.evaluate, "{disabled:?} disables evaluation");
    }
    for enabled in ["1", "true", "yes", ""] {
        let config = AppConfig::from_lookup(lookup_one(ENV_EVALUATE, enabled))
            .expect("valid config");
        assert!(config.evaluate, "{enabled:?} keeps evaluation on");
    }
}

#[test]
fn config_env_tests_evaluation_toggle_reads_process_env() {
    // Safety:
    // - This is the only test in this binary that touches process env.
    // - We reset the variable before returning.
    unsafe { std::env::set_var(ENV_EVALUATE, "false") };
    assert!(!AppConfig::from_env().expect("valid config").evaluate);

    // Safety: see rationale above.
    unsafe { std::env::set_var(ENV_EVALUATE, "true") };
    assert!(AppConfig::from_env().expect("valid config").evaluate);

    // Safety: see rationale above.
    unsafe { std::env::remove_var(ENV_EVALUATE) };
    assert!(AppConfig::from_env().expect("valid config").evaluate);
}
