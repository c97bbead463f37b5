use valpulse_metrics_service::config::ServiceConfig;

// Lives in its own test binary: environment variables are process-wide
#[test]
fn test_environment_overrides_defaults() {
    std::env::set_var("VALPULSE__UPSTREAM__TIMEOUT_SECS", "20");
    std::env::set_var("VALPULSE__API__PORT", "9300");
    std::env::set_var("VALPULSE__UPSTREAM__URL", "http://10.0.0.5/validator");

    let config = ServiceConfig::load(None).unwrap();

    assert_eq!(config.upstream.timeout_secs, 20);
    assert_eq!(config.api.port, 9300);
    assert_eq!(config.upstream.url, "http://10.0.0.5/validator");
    assert_eq!(config.upstream.max_retries, 0);
    assert!(config.validate().is_ok());
}
