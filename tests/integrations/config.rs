//! Integration test for configuration loading and registry construction.

use alertrelay::cli::Cli;
use alertrelay::config::Config;
use alertrelay::registry::Registry;
use std::io::Write;
use tempfile::NamedTempFile;

fn cli_for(file: &NamedTempFile) -> Cli {
    Cli {
        config: Some(file.path().to_path_buf()),
        listen: None,
        log_level: None,
    }
}

#[test]
fn loads_receivers_from_a_toml_file_and_builds_the_registry() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
log_level = "debug"

[server]
listen = "127.0.0.1:9095"

[metrics]
enabled = false

[[receivers]]
name = "ops"
handler = "http"

[receivers.params]
url = "https://example.test/hook"
template = "{{{{ status }}}}"
method = "PUT"
timeout = 3.5
max_attempt_number = 5
wait_multiplier = 0.5

[receivers.params.headers]
Authorization = "Bearer token"
"#
    )
    .unwrap();

    let config = Config::load(&cli_for(&file)).unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.server.listen, "127.0.0.1:9095".parse().unwrap());
    assert!(!config.metrics.enabled);
    assert_eq!(config.receivers.len(), 1);
    assert_eq!(config.receivers[0].name, "ops");
    assert_eq!(config.receivers[0].handler, "http");
    assert_eq!(config.receivers[0].params["method"], "PUT");
    assert_eq!(
        config.receivers[0].params["headers"]["Authorization"],
        "Bearer token"
    );

    let registry = Registry::build(&config.receivers).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.lookup("ops").is_some());
    assert!(registry.lookup("other").is_none());
}

#[test]
fn a_missing_config_file_yields_the_defaults() {
    let cli = Cli {
        config: Some("/nonexistent/alertrelay.toml".into()),
        listen: None,
        log_level: None,
    };
    let config = Config::load(&cli).unwrap();
    assert_eq!(config.log_level, "info");
    assert!(config.receivers.is_empty());

    let registry = Registry::build(&config.receivers).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn cli_arguments_override_the_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
log_level = "debug"

[server]
listen = "127.0.0.1:9095"
"#
    )
    .unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        listen: Some("127.0.0.1:7777".parse().unwrap()),
        log_level: Some("trace".to_string()),
    };
    let config = Config::load(&cli).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:7777".parse().unwrap());
    assert_eq!(config.log_level, "trace");
}

#[test]
fn a_bad_receiver_fails_the_registry_build() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[receivers]]
name = "ops"
handler = "http"

[receivers.params]
template = "{{{{ status }}}}"
"#
    )
    .unwrap();

    let config = Config::load(&cli_for(&file)).unwrap();
    let err = Registry::build(&config.receivers).unwrap_err();
    assert!(err.to_string().contains("ops"));
}
