//! 配置分层加载集成测试

use std::fs;
use std::path::PathBuf;

use traffic_shared::config::{AppConfig, SinkKind};
use traffic_shared::events::EventKind;

/// 每个测试使用独立的临时配置目录
fn config_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "traffic-shared-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (file, content) in files {
        fs::write(dir.join(file), content).unwrap();
    }
    dir
}

#[test]
fn missing_directory_uses_defaults() {
    let dir = config_dir("empty", &[]);
    let config = AppConfig::load("traffic-sim", dir.to_str()).unwrap();

    assert_eq!(config.service_name, "traffic-sim");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.simulation.weights.len(), 6);
    assert_eq!(config.sink.kind, SinkKind::Tracing);
}

#[test]
fn service_file_overrides_default_file() {
    let dir = config_dir(
        "layered",
        &[
            (
                "default.toml",
                r#"
                [server]
                port = 3100

                [simulation]
                tick_delay_ms = 500
                actor_count = 20
                "#,
            ),
            (
                "traffic-sim.toml",
                r#"
                [simulation]
                tick_delay_ms = 50
                weights = [{ event = "SHIPPING", weight = 1.0 }]
                "#,
            ),
        ],
    );

    let config = AppConfig::load("traffic-sim", dir.to_str()).unwrap();

    assert_eq!(config.server.port, 3100);
    assert_eq!(config.simulation.actor_count, 20);
    assert_eq!(config.simulation.tick_delay_ms, 50);
    assert_eq!(config.simulation.weights.len(), 1);
    assert_eq!(config.simulation.weights[0].event, EventKind::Shipping);
}

#[test]
fn invalid_values_fail_at_load() {
    let dir = config_dir(
        "invalid",
        &[(
            "default.toml",
            r#"
            [simulation]
            payment_failure_rate = 2.0
            "#,
        )],
    );

    let err = AppConfig::load("traffic-sim", dir.to_str()).unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[test]
fn http_sink_section() {
    let dir = config_dir(
        "http-sink",
        &[(
            "default.toml",
            r#"
            [sink]
            kind = "http"
            endpoint = "https://in.logs.example.com"
            source_token = "abc"
            max_retries = 1
            "#,
        )],
    );

    let config = AppConfig::load("traffic-sim", dir.to_str()).unwrap();
    assert_eq!(config.sink.kind, SinkKind::Http);
    assert_eq!(config.sink.source_token.as_deref(), Some("abc"));
    assert_eq!(config.sink.max_retries, 1);
    assert_eq!(config.sink.timeout_ms, 5000);
}

#[test]
fn metrics_helpers_are_noops_without_recorder() {
    use traffic_shared::observability::metrics::{record_event, record_fault, record_skip, set_running};

    record_event("USER_LOGIN", "info");
    record_event("PAYMENT", "error");
    record_skip("no_session");
    record_skip("empty_cart");
    record_fault();
    set_running(false);
}
