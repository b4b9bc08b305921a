use std::time::Duration;

use clap::Parser;
use video_relay::cli::Cli;
use video_relay::config::ServerConfig;

#[test]
fn test_cli_defaults_match_config_defaults() {
    let config = ServerConfig::from(Cli::parse_from(["vrelay"]));
    let defaults = ServerConfig::default();

    assert_eq!(config.port, defaults.port);
    assert_eq!(config.impersonate, "chrome-120");
    assert_eq!(config.default_referer, "https://megacloud.blog/");
    assert_eq!(config.concurrent_fragments, 10);
    assert!(config.browser_headers);
    assert_eq!(config.max_concurrent_downloads, 4);
    assert_eq!(config.max_pending_tasks, 32);
    assert_eq!(config.retention, Duration::from_secs(300));
    assert_eq!(config.formats_timeout, Duration::from_secs(30));
    assert_eq!(config.title_timeout, Duration::from_secs(10));
    assert_eq!(config.cleanup_delay, Duration::from_secs(2));
}

#[test]
fn test_cli_overrides() {
    let args = Cli::parse_from([
        "vrelay",
        "--port",
        "8080",
        "--host",
        "127.0.0.1",
        "--no-browser-headers",
        "--max-concurrent-downloads",
        "0",
        "--retention-secs",
        "60",
    ]);
    let config = ServerConfig::from(args);

    assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    assert_eq!(config.local_url(), "http://127.0.0.1:8080");
    assert!(!config.browser_headers);
    assert_eq!(config.max_concurrent_downloads, 1);
    assert_eq!(config.retention, Duration::from_secs(60));
}

#[test]
fn test_local_url_for_wildcard_host() {
    let config = ServerConfig::default();
    assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    assert_eq!(config.local_url(), "http://localhost:5000");
}
