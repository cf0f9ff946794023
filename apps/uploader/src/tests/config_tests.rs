use super::{load_settings, settings_from_sources, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use shared::protocol::{ResponseMode, SubmitPolicy};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_target_local_upload_endpoint() {
    let settings = settings_from_sources(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_url, "http://127.0.0.1:5000");
    assert_eq!(settings.controller.endpoint, "/upload");
    assert_eq!(settings.controller.download_filename, "discrepancy_report.pdf");
    assert_eq!(settings.controller.response_mode, ResponseMode::Negotiate);
    assert_eq!(
        settings.controller.submit_policy,
        SubmitPolicy::RejectWhileInFlight
    );
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
        server_url = "https://reports.example.com"
        response_mode = "download"
        submit_policy = "supersede"
        download_filename = "q3.pdf"
        output_dir = "out"
        request_timeout_secs = 30
        status_id = "status"
    "#;

    let settings = settings_from_sources(Some(raw), env_from(&[]));

    assert_eq!(settings.server_url, "https://reports.example.com");
    assert_eq!(settings.controller.response_mode, ResponseMode::Download);
    assert_eq!(settings.controller.submit_policy, SubmitPolicy::Supersede);
    assert_eq!(settings.controller.download_filename, "q3.pdf");
    assert_eq!(settings.output_dir, std::path::PathBuf::from("out"));
    assert_eq!(settings.request_timeout_secs, Some(30));
    assert_eq!(settings.controller.status_id, "status");
    assert_eq!(settings.controller.form_id, "uploadForm");
}

#[test]
fn environment_overrides_file() {
    let raw = r#"server_url = "https://from-file.example.com""#;
    let settings = settings_from_sources(
        Some(raw),
        env_from(&[
            ("UPLOADER_SERVER_URL", "https://legacy.example.com"),
            ("APP__SERVER_URL", "https://from-env.example.com"),
            ("APP__RESPONSE_MODE", "page"),
            ("APP__REQUEST_TIMEOUT_SECS", "5"),
        ]),
    );

    assert_eq!(settings.server_url, "https://from-env.example.com");
    assert_eq!(settings.controller.response_mode, ResponseMode::Page);
    assert_eq!(settings.request_timeout_secs, Some(5));
}

#[test]
fn invalid_values_keep_previous_setting() {
    let raw = r#"response_mode = "sideways""#;
    let settings = settings_from_sources(
        Some(raw),
        env_from(&[
            ("APP__SUBMIT_POLICY", "eventually"),
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
        ]),
    );

    assert_eq!(settings.controller.response_mode, ResponseMode::Negotiate);
    assert_eq!(
        settings.controller.submit_policy,
        SubmitPolicy::RejectWhileInFlight
    );
    assert_eq!(settings.request_timeout_secs, None);
}

#[test]
fn unparseable_file_is_ignored() {
    let settings = settings_from_sources(Some("server_url = [unterminated"), env_from(&[]));
    assert_eq!(settings.server_url, Settings::default().server_url);
}

#[test]
fn loads_settings_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("uploader_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("uploader.toml");
    fs::write(&path, "endpoint = \"/reports/upload\"\n").expect("write config");

    let settings = load_settings(&path);
    assert_eq!(settings.controller.endpoint, "/reports/upload");

    fs::remove_dir_all(temp_root).expect("cleanup");
}
