use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use lookout::config::LookoutConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LOOKOUT_CONFIG",
        "LOOKOUT_ENDPOINT",
        "LOOKOUT_CAPTURE_INTERVAL_SECS",
        "LOOKOUT_CONFIDENCE_THRESHOLD",
        "LOOKOUT_ANNOUNCEMENT_COOLDOWN_SECS",
        "LOOKOUT_OUTPUT_DIR",
        "LOOKOUT_MODEL",
        "LOOKOUT_HEADLESS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "endpoint": "http://192.168.0.161",
        "capture_interval_secs": 5,
        "confidence_threshold": 0.6,
        "announcement_cooldown_secs": 45,
        "output_directory": "archive",
        "model_reference": "stub",
        "headless": true
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("LOOKOUT_CONFIG", file.path());
    std::env::set_var("LOOKOUT_CAPTURE_INTERVAL_SECS", "7");
    std::env::set_var("LOOKOUT_OUTPUT_DIR", "elsewhere");

    let cfg = LookoutConfig::load().expect("load config");
    assert_eq!(cfg.endpoint, "http://192.168.0.161");
    assert_eq!(cfg.capture_interval, Duration::from_secs(7));
    assert_eq!(cfg.confidence_threshold, 0.6);
    assert_eq!(cfg.announcement_cooldown, Duration::from_secs(45));
    assert_eq!(cfg.output_directory.to_str(), Some("elsewhere"));
    assert!(cfg.headless);

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = LookoutConfig::load().expect("load defaults");
    assert_eq!(cfg.endpoint, "stub://camera");
    assert_eq!(cfg.capture_interval, Duration::from_secs(2));
    assert_eq!(cfg.confidence_threshold, 0.5);
    assert_eq!(cfg.model_reference, "stub");
    assert!(!cfg.headless);
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LOOKOUT_CAPTURE_INTERVAL_SECS", "soon");
    assert!(LookoutConfig::load().is_err());
    clear_env();

    std::env::set_var("LOOKOUT_CONFIDENCE_THRESHOLD", "2.0");
    assert!(LookoutConfig::load().is_err());
    clear_env();

    std::env::set_var("LOOKOUT_ENDPOINT", "rtsp://camera");
    assert!(LookoutConfig::load().is_err());
    clear_env();
}

#[test]
fn malformed_config_file_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"not json").expect("write config");
    std::env::set_var("LOOKOUT_CONFIG", file.path());

    assert!(LookoutConfig::load().is_err());
    clear_env();
}
