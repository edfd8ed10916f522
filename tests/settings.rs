use std::env;
use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use spectral::prelude::*;

use iterdns::settings::{self, Settings};

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
pub fn default_settings() {
    let s = Settings::default();

    assert_eq!(s.root_server, SocketAddr::from((settings::ROOT_SERVER, 53)));
    assert_eq!(s.max_referrals, 30);
    assert_eq!(s.query_timeout(), Duration::from_secs(2));
    assert_that(&s.recursion_desired).is_false();
}

#[test]
fn load_partial_settings_from_file() {
    let file = config_file(
        r#"
        root_server = "199.7.83.42:53"
        max_referrals = 12
        "#,
    );

    let s = Settings::from_file(file.path()).unwrap();

    assert_eq!(s.root_server, "199.7.83.42:53".parse::<SocketAddr>().unwrap());
    assert_eq!(s.max_referrals, 12);
    assert_eq!(s.retries, Settings::default().retries);
}

#[test]
fn load_timeouts_from_file() {
    let file = config_file(
        r#"
        query_timeout_ms = 750
        retry_backoff_ms = 20
        retries = 5
        "#,
    );

    let s = Settings::from_file(file.path()).unwrap();

    assert_eq!(s.query_timeout(), Duration::from_millis(750));
    assert_eq!(s.retry_backoff(), Duration::from_millis(20));
    assert_eq!(s.retries, 5);
}

#[test]
fn reject_invalid_root_server() {
    let file = config_file(r#"root_server = "not an address""#);

    assert_that(&Settings::from_file(file.path())).is_err();
}

#[test]
fn load_overrides_from_env() {
    env::remove_var("RUN_MODE");
    env::set_var("ITERDNS_MAX_REFERRALS", "7");
    env::set_var("ITERDNS_RECURSION_DESIRED", "true");

    let s = Settings::load().unwrap();

    env::remove_var("ITERDNS_MAX_REFERRALS");
    env::remove_var("ITERDNS_RECURSION_DESIRED");

    assert_eq!(s.max_referrals, 7);
    assert!(s.recursion_desired);
    assert_eq!(s.root_server, Settings::default().root_server);
}
